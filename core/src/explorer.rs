use crate::catalog::ResourceCatalog;
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::executor::QueryExecutor;
use crate::history::HistoryLog;
use crate::settings::SettingsStore;
use crate::status::StatusSink;
use crate::viewer::ResultDocumentStore;
use crate::viewer::ResultViewer;
use graphex_backend_client::GraphBackend;
use graphex_protocol::CatalogElement;
use graphex_protocol::HistoryMessage;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Composition root: wires the catalog, the connection manager, the query
/// executor, and the history log together, and dispatches messages arriving
/// from the presentation surface.
pub struct Explorer {
    catalog: ResourceCatalog,
    connection: Arc<ConnectionManager>,
    executor: QueryExecutor,
    history: Arc<HistoryLog>,
    documents: ResultDocumentStore,
    viewer: Arc<dyn ResultViewer>,
    status: Arc<dyn StatusSink>,
}

impl Explorer {
    /// Returns the explorer plus the receiving end of the surface channel.
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        config: &Config,
        viewer: Arc<dyn ResultViewer>,
        status: Arc<dyn StatusSink>,
    ) -> (Self, UnboundedReceiver<HistoryMessage>) {
        let settings = SettingsStore::new(config.settings_path());
        let catalog = ResourceCatalog::new(backend.clone(), settings, status.clone());
        let connection = Arc::new(ConnectionManager::new(backend, status.clone()));
        let (history, receiver) = HistoryLog::new(
            config.results_dir(),
            viewer.clone(),
            status.clone(),
        );
        let history = Arc::new(history);
        let executor = QueryExecutor::new(connection.clone(), history.clone(), status.clone());
        let documents = ResultDocumentStore::new(config.results_dir());
        (
            Self {
                catalog,
                connection,
                executor,
                history,
                documents,
                viewer,
                status,
            },
            receiver,
        )
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn documents(&self) -> &ResultDocumentStore {
        &self.documents
    }

    /// Startup: rebuild the surface view from disk, then reconnect to the
    /// collection that was active in the previous run, if any.
    pub async fn bootstrap(&self) {
        self.reload_history();
        let active = self.catalog.active().await;
        if !active.is_empty() {
            let _ = self.connection.connect(&active).await;
        }
    }

    /// Rebuild the surface view from disk without touching the backend.
    pub fn reload_history(&self) {
        if let Err(err) = self.history.reload() {
            self.status
                .error(&format!("failed to reload query history: {err}"));
        }
    }

    /// Make `element` the active query target and rebind the session to it.
    pub async fn activate_collection(&self, element: &CatalogElement) -> anyhow::Result<()> {
        self.catalog.set_active(element).await?;
        let _ = self.connection.connect(&element.path).await;
        Ok(())
    }

    /// Execute query text against an explicit target, or fall back to the
    /// active collection. Returns the recorded history file name.
    pub async fn execute(&self, target: Option<&str>, query_text: &str) -> Option<String> {
        let target = match target {
            Some(path) => path.to_string(),
            None => self.catalog.active().await,
        };
        if target.is_empty() {
            self.status
                .warn("no query target selected, please select a collection to run the query on");
            return None;
        }
        self.executor.execute(&target, query_text).await
    }

    /// React to a message sent back by the presentation surface.
    pub async fn handle_surface_message(&self, message: HistoryMessage) {
        match message {
            HistoryMessage::RerunQuery { query, target } => {
                self.execute(Some(&target), &query).await;
            }
            HistoryMessage::OpenResult { file_name } => {
                if let Err(err) = self.viewer.open(&file_name) {
                    self.status
                        .error(&format!("failed to open {file_name}: {err}"));
                }
            }
            // Log-originated kinds echoed back are not ours to handle.
            HistoryMessage::AddHistory { .. } | HistoryMessage::RemoveHistory { .. } => {}
        }
    }

    pub fn clear_history(&self) {
        if let Err(err) = self.history.clear() {
            self.status
                .error(&format!("failed to clear query history: {err}"));
        }
    }

    pub async fn dispose(&self) {
        self.connection.dispose().await;
        self.catalog.dispose().await;
    }
}
