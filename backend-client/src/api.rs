use crate::error::BackendError;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Response attribute keys carried alongside query results. Per-call and
/// cumulative variants of the cost metrics are both reported by the store.
pub mod attributes {
    pub const ACTIVITY_ID: &str = "x-ms-activity-id";
    pub const STATUS_CODE: &str = "x-ms-status-code";
    pub const REQUEST_CHARGE: &str = "x-ms-request-charge";
    pub const TOTAL_REQUEST_CHARGE: &str = "x-ms-total-request-charge";
    pub const SERVER_TIME_MS: &str = "x-ms-server-time-ms";
    pub const TOTAL_SERVER_TIME_MS: &str = "x-ms-total-server-time-ms";
}

/// Raw response to one submitted traversal: the result rows plus the
/// store's metadata attributes.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl QueryResponse {
    /// Attribute value as a string, regardless of how the store encoded it.
    /// Missing attributes come back empty.
    pub fn attribute(&self, key: &str) -> String {
        match self.attributes.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }
}

/// Catalog and session operations of the remote graph store.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Names of all databases in the store.
    async fn list_databases(&self) -> Result<Vec<String>, BackendError>;

    /// Names of the collections under one database.
    async fn list_collections(&self, database: &str) -> Result<Vec<String>, BackendError>;

    /// Open an authenticated session bound to a collection path.
    async fn open_session(&self, target: &str)
    -> Result<Box<dyn BackendSession>, BackendError>;
}

/// A live session bound to one collection. Dropped sessions are reclaimed by
/// the store eventually; callers that care close explicitly.
#[async_trait]
pub trait BackendSession: Send + Sync {
    fn target(&self) -> &str;

    async fn submit(&self, query: &str) -> Result<QueryResponse, BackendError>;

    async fn close(&self) -> Result<(), BackendError>;
}
