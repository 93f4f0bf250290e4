use std::sync::mpsc;

use ratatui::widgets::TableState;

use crate::store::ResumePoint;

use super::super::format::format_position;
use super::super::tracking::{
    HttpRemote, NOT_AUTHENTICATED, ProgressTracker, ResumeUpdate, SYNC_WAIT_TIMEOUT,
    StoredProfileAuth, SyncGate,
};

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(super) fn drain_history_updates(
    rx: &mpsc::Receiver<Vec<ResumePoint>>,
    items: &mut Vec<ResumePoint>,
    table_state: &mut TableState,
) {
    let mut refreshed = false;
    while let Ok(latest) = rx.try_recv() {
        *items = latest;
        refreshed = true;
    }
    if !refreshed {
        return;
    }

    if items.is_empty() {
        table_state.select(None);
        return;
    }
    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
}

pub(super) fn run_sync_selected(tracker: &ProgressTracker, item: &ResumePoint) -> String {
    let update = ResumeUpdate::new(
        item.title_id.clone(),
        item.episode_number,
        item.position_seconds,
        item.episode_ref.clone(),
        item.episode_label.clone(),
    );
    let gate = SyncGate::new(StoredProfileAuth::new(tracker.store()), HttpRemote::from_env());
    let outcome = gate.save_now_bounded(&update, SYNC_WAIT_TIMEOUT);

    if outcome.success {
        return status_info(&format!(
            "Synced {} episode {} at {} to account.",
            item.title_id,
            item.episode_number,
            format_position(item.position_seconds)
        ));
    }
    match outcome.error.as_deref() {
        Some(err) if err == NOT_AUTHENTICATED => {
            status_error("Sync failed: not signed in. Sign in from the companion app.")
        }
        Some(err) => status_error(&format!("Sync failed: {err}")),
        None => status_error("Sync failed."),
    }
}
