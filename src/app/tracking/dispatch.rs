use std::sync::Arc;

use anyhow::Result;

use crate::store::{ResumePoint, Store};

use super::ResumeUpdate;
use super::cache::HistoryState;
use super::history::{apply_update, unix_now_ms};

pub(crate) const MIN_DISPATCH_INTERVAL_MS: u64 = 5_000;

#[derive(Debug)]
pub(crate) struct Throttle {
    min_interval_ms: u64,
    last_fire_ms: Option<u64>,
}

impl Throttle {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_fire_ms: None,
        }
    }

    // Leading edge: the first call in a window fires, later calls inside the
    // window are dropped rather than queued.
    pub(crate) fn should_fire(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_fire_ms
            && now_ms.saturating_sub(last) < self.min_interval_ms
        {
            return false;
        }
        self.last_fire_ms = Some(now_ms);
        true
    }
}

pub(crate) struct ProgressTracker {
    store: Store,
    state: Arc<HistoryState>,
    throttle: Throttle,
}

impl ProgressTracker {
    pub(crate) fn new(store: Store, state: Arc<HistoryState>) -> Self {
        Self {
            store,
            state,
            throttle: Throttle::new(MIN_DISPATCH_INTERVAL_MS),
        }
    }

    pub(crate) fn report(&mut self, update: &ResumeUpdate) -> Result<bool> {
        self.report_at(unix_now_ms(), update)
    }

    pub(crate) fn report_at(&mut self, now_ms: u64, update: &ResumeUpdate) -> Result<bool> {
        if !self.throttle.should_fire(now_ms) {
            return Ok(false);
        }
        self.commit(now_ms, update)?;
        Ok(true)
    }

    pub(crate) fn save_final(&mut self, update: &ResumeUpdate) -> Result<()> {
        self.commit(unix_now_ms(), update)
    }

    pub(crate) fn delete(&mut self, title_id: &str) -> Result<bool> {
        let removed = self.store.delete_entry(title_id)?;
        if removed {
            self.state.publish(self.store.load_history());
        }
        Ok(removed)
    }

    pub(crate) fn history(&self) -> Vec<ResumePoint> {
        self.state.snapshot()
    }

    pub(crate) fn state(&self) -> &Arc<HistoryState> {
        &self.state
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    // Full read-modify-write through the reducer, then the cache refresh,
    // strictly after the durable write.
    fn commit(&mut self, now_ms: u64, update: &ResumeUpdate) -> Result<()> {
        let current = self.store.load_history();
        let next = apply_update(&current, update, now_ms);
        self.store.save_history(&next)?;
        self.state.publish(next);
        Ok(())
    }
}

pub(crate) fn parse_position_line(line: &str) -> Option<f64> {
    let value = line.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
