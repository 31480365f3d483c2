use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_ENDPOINT: &str = "https://localhost:8081";
const DEFAULT_TRAVERSAL_SOURCE: &str = "g";
// Well-known fixed key of the local store emulator.
const EMULATOR_PRIMARY_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

/// Tool configuration: where the graph store lives and where graphex keeps
/// its state. Loaded from `<state_dir>/config.toml`, then overridden by
/// `GRAPHEX_*` environment variables.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: String,
    pub primary_key: String,
    pub traversal_source: String,
    pub state_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            primary_key: EMULATOR_PRIMARY_KEY.to_string(),
            traversal_source: DEFAULT_TRAVERSAL_SOURCE.to_string(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".graphex"))
        .unwrap_or_else(|| PathBuf::from(".graphex"))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    fn load_with<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        // The state dir override decides where the config file itself lives.
        if let Some(dir) = get("GRAPHEX_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        let path = config.state_dir.join(CONFIG_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                config = toml::from_str(&raw)
                    .with_context(|| format!("parse {}", path.display()))?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        }
        config.apply_overrides(get);
        Ok(config)
    }

    /// Apply `GRAPHEX_*` overrides from the given lookup.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = get("GRAPHEX_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(key) = get("GRAPHEX_PRIMARY_KEY") {
            self.primary_key = key;
        }
        if let Some(source) = get("GRAPHEX_TRAVERSAL_SOURCE") {
            self.traversal_source = source;
        }
        if let Some(dir) = get("GRAPHEX_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
    }

    /// Storage directory for persisted history records.
    pub fn results_dir(&self) -> PathBuf {
        self.state_dir.join("results")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.state_dir.join("settings.json")
    }
}
