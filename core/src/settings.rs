use anyhow::Context;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Settings key holding the active collection path.
pub const ACTIVE_COLLECTION_KEY: &str = "graphex.activeCollection";

/// Flat key-value settings persisted as one JSON file. Values survive
/// process restarts; reads of a missing or unreadable store fall back to the
/// caller's default.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.read()
            .ok()
            .and_then(|values| values.get(key).cloned())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn update(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(data) => serde_json::from_slice(&data).context("parse settings store"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err).context("read settings store"),
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("create settings dir")?;
        }
        let data = serde_json::to_vec_pretty(values).context("serialize settings store")?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, data).context("write settings store")?;
        fs::rename(&tmp_path, &self.path).context("replace settings store")?;
        Ok(())
    }
}
