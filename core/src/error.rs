use graphex_backend_client::BackendError;
use thiserror::Error;

/// Failure of one query submission.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("no open session; select a query target first")]
    NotConnected,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failure of a history log operation against durable storage.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage unavailable: {0}")]
    Storage(#[from] std::io::Error),

    #[error("failed to encode history record: {0}")]
    Encode(serde_json::Error),
}
