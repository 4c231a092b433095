use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".clinic-admin";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "clinic.sqlite";
/// Log file written next to the database; the terminal belongs to the TUI.
const LOG_FILE_NAME: &str = "clinic-admin.log";
/// Environment variable that overrides the database location.
pub const DB_ENV_VAR: &str = "CLINIC_ADMIN_DB";

/// Where the application keeps its state on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    /// Resolve from `CLINIC_ADMIN_DB`, falling back to the home directory.
    pub fn from_env() -> Result<Self> {
        Self::resolve(env::var_os(DB_ENV_VAR).map(PathBuf::from))
    }

    /// Build the config from an optional database override. An empty override
    /// counts as unset.
    pub fn resolve(db_override: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_override.filter(|path| !path.as_os_str().is_empty()) {
            Some(path) => path,
            None => default_db_path()?,
        };
        let log_path = db_path
            .parent()
            .map(|dir| dir.join(LOG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME));

        Ok(Self { db_path, log_path })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
