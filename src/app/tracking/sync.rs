use std::env;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::http::post_json_with_retries;
use crate::store::Store;

use super::{ResumeUpdate, SyncOutcome};

pub(crate) const NOT_AUTHENTICATED: &str = "Not authenticated";
pub(crate) const SYNC_WAIT_TIMEOUT: Duration = Duration::from_secs(3);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(6);
const RETRY_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub(crate) trait AuthSession {
    fn user_id(&self) -> Option<String>;
}

pub(crate) struct StoredProfileAuth<'a> {
    store: &'a Store,
}

impl<'a> StoredProfileAuth<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl AuthSession for StoredProfileAuth<'_> {
    fn user_id(&self) -> Option<String> {
        self.store
            .load_user_profile()
            .map(|profile| profile.id)
            .filter(|id| !id.trim().is_empty())
    }
}

pub(crate) trait RemoteSync {
    fn upsert_progress(&self, user_id: &str, update: &ResumeUpdate) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpRemote {
    base_url: String,
}

impl HttpRemote {
    pub(crate) fn from_env() -> Option<Self> {
        let base_url = env::var("ANIRESUME_SYNC_URL").ok()?;
        let trimmed = base_url.trim().trim_end_matches('/');
        (!trimmed.is_empty()).then(|| Self {
            base_url: trimmed.to_string(),
        })
    }
}

impl RemoteSync for HttpRemote {
    fn upsert_progress(&self, user_id: &str, update: &ResumeUpdate) -> Result<(), String> {
        let url = format!("{}/v1/progress", self.base_url);
        let body = serde_json::json!({
            "userId": user_id,
            "titleId": update.title_id,
            "episodeNumber": update.episode_number,
            "positionSeconds": update.position_seconds,
            "episodeRef": update.episode_ref,
        })
        .to_string();

        post_json_with_retries(
            &url,
            &[("X-User-Id".to_string(), user_id.to_string())],
            &body,
            CONNECT_TIMEOUT,
            READ_TIMEOUT,
            RETRY_ATTEMPTS,
            RETRY_DELAY,
        )
        .map(|_| ())
    }
}

pub(crate) struct SyncGate<A, R> {
    auth: A,
    remote: Option<R>,
}

impl<A, R> SyncGate<A, R>
where
    A: AuthSession,
    R: RemoteSync + Clone + Send + 'static,
{
    pub(crate) fn new(auth: A, remote: Option<R>) -> Self {
        Self { auth, remote }
    }

    // The unauthenticated answer is a normal outcome, not an error: anonymous
    // sessions hit this constantly and must cost zero network traffic.
    pub(crate) fn save_now(&self, update: &ResumeUpdate) -> SyncOutcome {
        let Some(user_id) = self.auth.user_id() else {
            return SyncOutcome::failed(NOT_AUTHENTICATED);
        };
        let Some(remote) = self.remote.as_ref() else {
            return SyncOutcome::failed("remote sync is not configured");
        };
        match remote.upsert_progress(&user_id, update) {
            Ok(()) => SyncOutcome::ok(),
            Err(err) => SyncOutcome::failed(&err),
        }
    }

    // Teardown variant: the remote call runs on a worker thread and the
    // caller waits at most `timeout` before abandoning it.
    pub(crate) fn save_now_bounded(&self, update: &ResumeUpdate, timeout: Duration) -> SyncOutcome {
        let Some(user_id) = self.auth.user_id() else {
            return SyncOutcome::failed(NOT_AUTHENTICATED);
        };
        let Some(remote) = self.remote.clone() else {
            return SyncOutcome::failed("remote sync is not configured");
        };

        let update = update.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(remote.upsert_progress(&user_id, &update));
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(())) => SyncOutcome::ok(),
            Ok(Err(err)) => SyncOutcome::failed(&err),
            Err(_) => SyncOutcome::failed("remote sync timed out"),
        }
    }
}
