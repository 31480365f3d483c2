use crate::status::StatusSink;
use crate::viewer::ResultViewer;
use anyhow::Result;
use async_trait::async_trait;
use graphex_backend_client::BackendError;
use graphex_backend_client::BackendSession;
use graphex_backend_client::GraphBackend;
use graphex_backend_client::QueryResponse;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

#[derive(Default)]
pub struct FakeBackendState {
    pub databases: Mutex<BTreeMap<String, Vec<String>>>,
    pub fail_list_databases: AtomicBool,
    pub fail_list_collections: AtomicBool,
    pub fail_open: AtomicBool,
    pub fail_close: AtomicBool,
    pub fail_submit: AtomicBool,
    pub response: Mutex<QueryResponse>,
    pub opened: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
    pub submitted: Mutex<Vec<(String, String)>>,
}

/// In-memory stand-in for the remote graph store.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<FakeBackendState>,
}

impl FakeBackend {
    pub fn with_catalog(entries: &[(&str, &[&str])]) -> Self {
        let backend = Self::default();
        {
            let mut databases = backend.state.databases.lock().unwrap();
            for (database, collections) in entries {
                databases.insert(
                    database.to_string(),
                    collections.iter().map(|name| name.to_string()).collect(),
                );
            }
        }
        *backend.state.response.lock().unwrap() = sample_response();
        backend
    }
}

pub fn sample_response() -> QueryResponse {
    serde_json::from_value(json!({
        "items": [6],
        "attributes": {
            "x-ms-activity-id": "a-1",
            "x-ms-status-code": 200,
            "x-ms-request-charge": 2.79,
            "x-ms-total-request-charge": 5.58,
            "x-ms-server-time-ms": 1.2,
            "x-ms-total-server-time-ms": 2.4,
        },
    }))
    .expect("sample response")
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "store offline".to_string(),
    }
}

#[async_trait]
impl GraphBackend for FakeBackend {
    async fn list_databases(&self) -> Result<Vec<String>, BackendError> {
        if self.state.fail_list_databases.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.state.databases.lock().unwrap().keys().cloned().collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, BackendError> {
        if self.state.fail_list_collections.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self
            .state
            .databases
            .lock()
            .unwrap()
            .get(database)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_session(
        &self,
        target: &str,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.state.opened.lock().unwrap().push(target.to_string());
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            target: target.to_string(),
        }))
    }
}

struct FakeSession {
    state: Arc<FakeBackendState>,
    target: String,
}

#[async_trait]
impl BackendSession for FakeSession {
    fn target(&self) -> &str {
        &self.target
    }

    async fn submit(&self, query: &str) -> Result<QueryResponse, BackendError> {
        if self.state.fail_submit.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.state
            .submitted
            .lock()
            .unwrap()
            .push((self.target.clone(), query.to_string()));
        Ok(self.state.response.lock().unwrap().clone())
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl StatusSink for RecordingStatus {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingViewer {
    pub opened: Mutex<Vec<String>>,
}

impl ResultViewer for RecordingViewer {
    fn open(&self, file_name: &str) -> Result<()> {
        self.opened.lock().unwrap().push(file_name.to_string());
        Ok(())
    }
}
