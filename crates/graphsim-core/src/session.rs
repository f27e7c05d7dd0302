//! Per-iteration session registry.
//!
//! Sessions are opened lazily by key on first use within an iteration,
//! shared by every agent that addresses the same key, and all closed
//! together once the iteration's agents have returned. The map is guarded by
//! an async mutex held across the open, so two concurrent callers for the
//! same key always get the same session.

use std::collections::BTreeMap;
use std::sync::Arc;

use graphsim_agents::{Driver, DriverError, Session};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Open sessions keyed by session key.
#[derive(Debug)]
pub struct SessionRegistry<S> {
    sessions: Mutex<BTreeMap<String, Arc<S>>>,
}

impl<S: Session> SessionRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the open session for `key`, opening one through `driver` if
    /// there is none yet.
    pub async fn get_or_open<D>(&self, driver: &D, key: &str) -> Result<Arc<S>, DriverError>
    where
        D: Driver<Session = S>,
    {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(key) {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(driver.open_session(key).await?);
        sessions.insert(key.to_owned(), Arc::clone(&session));
        debug!(key, "Session opened");
        Ok(session)
    }

    /// Close and evict every session. Returns how many were closed.
    ///
    /// The map is drained before any session is closed, so no caller can
    /// obtain a session that is being closed. Every session is closed even
    /// if an earlier one fails; the first failure is returned.
    pub async fn close_all(&self) -> Result<usize, DriverError> {
        let drained = std::mem::take(&mut *self.sessions.lock().await);
        let count = drained.len();
        let mut first_error = None;
        for (key, session) in drained {
            if let Err(err) = session.close().await {
                warn!(key = %key, error = %err, "Failed to close session");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no session is open.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Keys of the open sessions, ascending.
    pub async fn keys(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }
}

impl<S: Session> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
