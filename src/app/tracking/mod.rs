mod cache;
mod dispatch;
mod history;
mod sync;

pub(crate) use cache::HistoryState;
pub(crate) use dispatch::{ProgressTracker, parse_position_line};
pub(crate) use sync::{
    HttpRemote, NOT_AUTHENTICATED, SYNC_WAIT_TIMEOUT, StoredProfileAuth, SyncGate,
};

#[cfg(test)]
pub(crate) use dispatch::{MIN_DISPATCH_INTERVAL_MS, Throttle};
#[cfg(test)]
pub(crate) use history::{MAX_HISTORY, apply_delete, apply_update};
#[cfg(test)]
pub(crate) use sync::{AuthSession, RemoteSync};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResumeUpdate {
    pub(crate) title_id: String,
    pub(crate) episode_number: u32,
    pub(crate) position_seconds: f64,
    pub(crate) episode_ref: String,
    pub(crate) episode_label: Option<String>,
}

impl ResumeUpdate {
    pub(crate) fn new(
        title_id: String,
        episode_number: u32,
        position_seconds: f64,
        episode_ref: String,
        episode_label: Option<String>,
    ) -> Self {
        Self {
            title_id,
            episode_number,
            position_seconds: sanitize_position(position_seconds),
            episode_ref,
            episode_label,
        }
    }

    pub(crate) fn with_position(&self, position_seconds: f64) -> Self {
        Self {
            position_seconds: sanitize_position(position_seconds),
            ..self.clone()
        }
    }
}

// Positions must be finite and non-negative before they reach the store.
fn sanitize_position(position_seconds: f64) -> f64 {
    if position_seconds.is_finite() {
        position_seconds.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyncOutcome {
    pub(crate) success: bool,
    pub(crate) error: Option<String>,
}

impl SyncOutcome {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(reason: &str) -> Self {
        Self {
            success: false,
            error: Some(reason.to_string()),
        }
    }
}
