//! # Application Configuration
//!
//! Resolves where data lives and how the server runs.
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults (`~/Documents/MedTrack`, `127.0.0.1:3000`)
//! 2. `config.yaml` in the data directory, if present
//! 3. Environment: `MEDTRACK_BIND` and `RUST_LOG`
//!
//! The data directory itself comes from `MEDTRACK_DATA_DIR` when set, since
//! the YAML file is looked up inside it.
//!
//! ```yaml
//! database_file: "medtrack.db"
//! bind_address: "127.0.0.1:3000"
//! allowed_origin: "http://localhost:8080"
//! log_filter: "info,medtrack_backend=debug"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DATA_DIR_ENV: &str = "MEDTRACK_DATA_DIR";
pub const BIND_ENV: &str = "MEDTRACK_BIND";
pub const LOG_ENV: &str = "RUST_LOG";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_DIRECTORY_NAME: &str = "MedTrack";
const DEFAULT_DATABASE_FILE: &str = "medtrack.db";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_LOG_FILTER: &str = "info";

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_directory: PathBuf,
    pub database_file: String,
    pub bind_address: String,
    pub allowed_origin: String,
    pub log_filter: String,
}

/// Optional overrides read from `config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub database_file: Option<String>,
    pub bind_address: Option<String>,
    pub allowed_origin: Option<String>,
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Defaults rooted at the given data directory
    pub fn with_data_directory(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` to read environment variables
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_directory = match non_empty(lookup(DATA_DIR_ENV)) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_directory()?,
        };

        let mut config = Self::with_data_directory(data_directory);

        let config_path = config.data_directory.join(CONFIG_FILE_NAME);
        if let Some(file) = read_config_file(&config_path)? {
            config.apply_file(file);
        }

        if let Some(bind) = non_empty(lookup(BIND_ENV)) {
            config.bind_address = bind;
        }
        if let Some(filter) = non_empty(lookup(LOG_ENV)) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Full path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_directory.join(&self.database_file)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(database_file) = file.database_file {
            self.database_file = database_file;
        }
        if let Some(bind_address) = file.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(allowed_origin) = file.allowed_origin {
            self.allowed_origin = allowed_origin;
        }
        if let Some(log_filter) = file.log_filter {
            self.log_filter = log_filter;
        }
    }
}

/// `~/Documents/MedTrack`, falling back to the home directory when the
/// platform has no documents folder
pub fn default_data_directory() -> Result<PathBuf> {
    let base = dirs::document_dir()
        .or_else(dirs::home_dir)
        .context("Could not determine home directory")?;
    Ok(base.join(DEFAULT_DIRECTORY_NAME))
}

/// Read `config.yaml`, returning None when the file does not exist
pub fn read_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Ok(None);
    }

    let yaml_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let file: ConfigFile = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

    info!("Loaded config from {:?}", path);
    Ok(Some(file))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
