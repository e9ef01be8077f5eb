use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::scheduler::ReminderTemplate;
use crate::store::DEFAULT_STORAGE_KEY;

const APP_NAME: &str = "plant-manager";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding [`Config::database_path`].
pub const DB_ENV: &str = "PLANT_MANAGER_DB";
/// Environment variable overriding [`Config::storage_key`].
pub const KEY_ENV: &str = "PLANT_MANAGER_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding plants and reminders. Defaults to the user data directory.
    pub database_path: Option<PathBuf>,
    /// Key the plant map is stored under.
    pub storage_key: String,
    pub reminder: ReminderTemplate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            reminder: ReminderTemplate::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let config = match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Applies overrides looked up through `var`.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var(DB_ENV).filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(key) = var(KEY_ENV).filter(|v| !v.is_empty()) {
            self.storage_key = key;
        }
        self
    }

    /// The configured database file, or the default location.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::db::default_path(),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
