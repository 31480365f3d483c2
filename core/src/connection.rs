use crate::error::ExecuteError;
use crate::status::StatusSink;
use graphex_backend_client::BackendError;
use graphex_backend_client::BackendSession;
use graphex_backend_client::GraphBackend;
use graphex_backend_client::QueryResponse;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Owns at most one live backend session, bound to one collection path.
/// Opening a session for a new target invalidates the previous one; the
/// close of the previous session is best effort and never blocks the
/// transition (documented policy, not an oversight).
pub struct ConnectionManager {
    backend: Arc<dyn GraphBackend>,
    status: Arc<dyn StatusSink>,
    session: Mutex<Option<Box<dyn BackendSession>>>,
}

impl ConnectionManager {
    pub fn new(backend: Arc<dyn GraphBackend>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            backend,
            status,
            session: Mutex::new(None),
        }
    }

    /// Open a session bound to `target`, closing any prior session first.
    /// On failure the manager is left disconnected; no half-open session is
    /// retained.
    pub async fn connect(&self, target: &str) -> Result<(), BackendError> {
        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.take()
            && let Err(err) = previous.close().await
        {
            warn!(
                "failed to close session for {}: {err}",
                previous.target()
            );
        }
        match self.backend.open_session(target).await {
            Ok(session) => {
                *slot = Some(session);
                Ok(())
            }
            Err(err) => {
                self.status
                    .error(&format!("failed to open session for {target}: {err}"));
                Err(err)
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Path of the collection the current session is bound to.
    pub async fn current_target(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.target().to_string())
    }

    pub async fn submit(&self, query: &str) -> Result<QueryResponse, ExecuteError> {
        let slot = self.session.lock().await;
        let Some(session) = slot.as_ref() else {
            return Err(ExecuteError::NotConnected);
        };
        Ok(session.submit(query).await?)
    }

    /// Close the current session unconditionally. Idempotent.
    pub async fn dispose(&self) {
        if let Some(session) = self.session.lock().await.take()
            && let Err(err) = session.close().await
        {
            warn!("failed to close session for {}: {err}", session.target());
        }
    }
}
