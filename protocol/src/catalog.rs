use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Kind of a node in the database/collection hierarchy. Databases contain
/// collections; collections are leaves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Database,
    Collection,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Database => write!(f, "database"),
            ElementKind::Collection => write!(f, "collection"),
        }
    }
}

/// A node of the resource catalog. `path` is the stable hierarchical
/// identifier (`/dbs/{db}` or `/dbs/{db}/colls/{coll}`) and the sole
/// identity key used across components.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CatalogElement {
    pub name: String,
    pub path: String,
    pub kind: ElementKind,
}

impl CatalogElement {
    pub fn database(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: database_path(name),
            kind: ElementKind::Database,
        }
    }

    /// Collection element under `parent`, which must be a database element.
    pub fn collection_under(parent: &CatalogElement, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: format!("{}/colls/{name}", parent.path),
            kind: ElementKind::Collection,
        }
    }

    /// Rebuild a collection element from its full path, if well formed.
    pub fn collection_from_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("/dbs/")?;
        let (database, name) = rest.split_once("/colls/")?;
        if database.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: ElementKind::Collection,
        })
    }

    /// Database name a collection path belongs to.
    pub fn database_name_of(path: &str) -> Option<&str> {
        let rest = path.strip_prefix("/dbs/")?;
        let (database, _) = rest.split_once("/colls/")?;
        if database.is_empty() { None } else { Some(database) }
    }
}

pub fn database_path(database: &str) -> String {
    format!("/dbs/{database}")
}

pub fn collection_path(database: &str, collection: &str) -> String {
    format!("/dbs/{database}/colls/{collection}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_hierarchical_paths() {
        let database = CatalogElement::database("db1");
        assert_eq!(database.path, "/dbs/db1");
        let collection = CatalogElement::collection_under(&database, "coll1");
        assert_eq!(collection.path, "/dbs/db1/colls/coll1");
        assert_eq!(collection.kind, ElementKind::Collection);
        assert_eq!(collection.path, collection_path("db1", "coll1"));
    }

    #[test]
    fn parses_collection_paths() {
        let element = CatalogElement::collection_from_path("/dbs/db1/colls/coll1")
            .expect("well-formed path");
        assert_eq!(element.name, "coll1");
        assert_eq!(element.kind, ElementKind::Collection);
        assert_eq!(
            CatalogElement::database_name_of("/dbs/db1/colls/coll1"),
            Some("db1")
        );
        assert!(CatalogElement::collection_from_path("/dbs/db1").is_none());
        assert!(CatalogElement::collection_from_path("/dbs//colls/c").is_none());
        assert!(CatalogElement::collection_from_path("/dbs/db1/colls/a/b").is_none());
    }
}
