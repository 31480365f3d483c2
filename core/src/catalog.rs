use crate::settings::ACTIVE_COLLECTION_KEY;
use crate::settings::SettingsStore;
use crate::status::StatusSink;
use anyhow::Result;
use graphex_backend_client::GraphBackend;
use graphex_protocol::CatalogElement;
use graphex_protocol::ElementKind;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;

/// Callback invoked with the database element whose subtree changed.
/// Consumers re-query children; the payload carries identity only.
pub type ChangeListener = Box<dyn Fn(&CatalogElement) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct CatalogEntry {
    database: CatalogElement,
    collections: Vec<String>,
}

#[derive(Default)]
struct CatalogState {
    entries: HashMap<String, CatalogEntry>,
    active: String,
}

/// Lazily populated cache of the database→collection hierarchy, plus the
/// single active collection path. The cache map is owned here and never
/// exposed; every collection path lives in exactly one entry.
pub struct ResourceCatalog {
    backend: Arc<dyn GraphBackend>,
    settings: SettingsStore,
    status: Arc<dyn StatusSink>,
    state: Mutex<CatalogState>,
    listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
    next_listener_id: AtomicU64,
}

impl ResourceCatalog {
    /// The persisted active collection is loaded eagerly so it is available
    /// before any catalog population happens.
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        settings: SettingsStore,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let active = settings.get(ACTIVE_COLLECTION_KEY, "");
        Self {
            backend,
            settings,
            status,
            state: Mutex::new(CatalogState {
                entries: HashMap::new(),
                active,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Fetch the databases from the backend, resetting the cache entry of
    /// each one. A backend failure is surfaced to the operator and yields an
    /// empty sequence, never an error.
    pub async fn list_roots(&self) -> Vec<CatalogElement> {
        let databases = match self.backend.list_databases().await {
            Ok(names) => names,
            Err(err) => {
                self.status.error(&format!("failed to list databases: {err}"));
                return Vec::new();
            }
        };
        let mut state = self.state.lock().await;
        let mut results = Vec::with_capacity(databases.len());
        for name in databases {
            let database = CatalogElement::database(&name);
            state.entries.insert(
                name,
                CatalogEntry {
                    database: database.clone(),
                    collections: Vec::new(),
                },
            );
            results.push(database);
        }
        results
    }

    /// Fetch the collections under a database, appending each discovered
    /// path to its cache entry. Collections are leaves. A failed fetch
    /// leaves the entry untouched.
    pub async fn list_children(&self, element: &CatalogElement) -> Vec<CatalogElement> {
        if element.kind != ElementKind::Database {
            return Vec::new();
        }
        let collections = match self.backend.list_collections(&element.name).await {
            Ok(names) => names,
            Err(err) => {
                self.status.error(&format!(
                    "failed to list collections of {}: {err}",
                    element.name
                ));
                return Vec::new();
            }
        };
        let mut state = self.state.lock().await;
        let entry = state
            .entries
            .entry(element.name.clone())
            .or_insert_with(|| CatalogEntry {
                database: element.clone(),
                collections: Vec::new(),
            });
        let mut results = Vec::with_capacity(collections.len());
        for name in collections {
            let collection = CatalogElement::collection_under(element, &name);
            entry.collections.push(collection.path.clone());
            results.push(collection);
        }
        results
    }

    /// Database element owning `element`, or `None` if the catalog has not
    /// discovered it. Linear scan over the entries; catalogs are small.
    pub async fn get_parent(&self, element: &CatalogElement) -> Option<CatalogElement> {
        let state = self.state.lock().await;
        parent_of(&state, &element.path)
    }

    /// Current active collection path; empty when nothing is active.
    pub async fn active(&self) -> String {
        self.state.lock().await.active.clone()
    }

    /// Make `element` the active query target. The new path is persisted
    /// before any notification fires; each distinct database whose "active"
    /// decoration changed gets one change notification (at most two).
    pub async fn set_active(&self, element: &CatalogElement) -> Result<()> {
        let (previous_parent, next_parent) = {
            let mut state = self.state.lock().await;
            let next = parent_of(&state, &element.path);
            let previous = parent_of(&state, &state.active);
            state.active = element.path.clone();
            (previous, next)
        };
        self.settings.update(ACTIVE_COLLECTION_KEY, &element.path)?;
        self.status
            .info(&format!("switched query target to {}", element.path));
        match (previous_parent, next_parent) {
            (Some(previous), Some(next)) if previous.path == next.path => {
                self.emit_change(&previous).await;
            }
            (previous, next) => {
                if let Some(previous) = previous {
                    self.emit_change(&previous).await;
                }
                if let Some(next) = next {
                    self.emit_change(&next).await;
                }
            }
        }
        Ok(())
    }

    pub async fn on_change(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().await.push((id, listener));
        id
    }

    pub async fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .await
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Deregister every listener.
    pub async fn dispose(&self) {
        self.listeners.lock().await.clear();
    }

    async fn emit_change(&self, element: &CatalogElement) {
        let listeners = self.listeners.lock().await;
        for (_, listener) in listeners.iter() {
            listener(element);
        }
    }
}

fn parent_of(state: &CatalogState, path: &str) -> Option<CatalogElement> {
    if path.is_empty() {
        return None;
    }
    state
        .entries
        .values()
        .find(|entry| entry.collections.iter().any(|collection| collection == path))
        .map(|entry| entry.database.clone())
}
