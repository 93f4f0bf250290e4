use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::ResumePoint;

use super::ResumeUpdate;

pub(crate) const MAX_HISTORY: usize = 10;

pub(crate) fn apply_update(
    list: &[ResumePoint],
    update: &ResumeUpdate,
    now_ms: u64,
) -> Vec<ResumePoint> {
    let entry = resume_point_from(update, now_ms);
    let mut next = list.to_vec();

    if let Some(idx) = next
        .iter()
        .position(|existing| existing.title_id == entry.title_id)
    {
        // An update keeps its slot in the sequence; only the data moves.
        next[idx] = entry;
        return next;
    }

    if next.len() >= MAX_HISTORY {
        // At capacity the first report for a new title is dropped; existing
        // entries are never evicted to make room.
        return next;
    }

    next.insert(0, entry);
    next
}

pub(crate) fn apply_delete(list: &[ResumePoint], title_id: &str) -> Vec<ResumePoint> {
    list.iter()
        .filter(|entry| entry.title_id != title_id)
        .cloned()
        .collect()
}

fn resume_point_from(update: &ResumeUpdate, now_ms: u64) -> ResumePoint {
    ResumePoint {
        title_id: update.title_id.clone(),
        episode_number: update.episode_number,
        position_seconds: update.position_seconds,
        episode_ref: update.episode_ref.clone(),
        episode_label: update.episode_label.clone(),
        updated_at: now_ms,
    }
}

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
