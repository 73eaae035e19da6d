//! Data directory resolution and the optional `config.toml`.
//!
//! ```text
//! $RESET_DATA_DIR (default ~/.reset-ai)/
//! ├── config.toml   (optional, every key optional)
//! └── reset.db
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use reset_core::constants::{DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MIN_DWELL_MS};

use crate::error::{Result, StoreError};

pub const DATA_DIR_ENV: &str = "RESET_DATA_DIR";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Predictor sensitivity (1..=10) used when a caller gives none.
    pub sensitivity: u8,
    pub list_limit: usize,
    /// Recent Contexts fed into the cognitive resume.
    pub resume_limit: usize,
    pub min_duration_ms: u64,
    /// Database file name, relative to the data directory unless absolute.
    pub database: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            list_limit: 20,
            resume_limit: 5,
            min_duration_ms: MIN_DWELL_MS,
            database: "reset.db".to_string(),
        }
    }
}

impl Config {
    /// Read `<base_dir>/config.toml`; a missing file yields defaults.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| StoreError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::parse(&raw)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(raw)?;
        config.sensitivity = match config.sensitivity {
            0 => DEFAULT_SENSITIVITY,
            s => s.min(MAX_SENSITIVITY),
        };
        Ok(config)
    }

    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.database)
    }
}

/// `explicit`, else `$RESET_DATA_DIR`, else `~/.reset-ai`.
pub fn resolve_base_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => default_base_dir(),
    }
}

pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".reset-ai")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
