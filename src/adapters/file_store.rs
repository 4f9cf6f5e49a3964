//! JSON file adapters for the configuration and catalog ports.
//!
//! `config.json` and `recipes.json` live next to the service on disk.
//! A missing config file loads as defaults (first boot); a missing
//! catalog is an error because there is nothing sensible to default to.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{CatalogStore, ConfigStore};
use crate::catalog::RecipeCatalog;
use crate::config::BarConfig;
use crate::error::{CatalogError, ConfigError, ConfigWarning};

// ── Configuration ─────────────────────────────────────────────

/// `ConfigStore` backed by a JSON file.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<(BarConfig, Vec<ConfigWarning>), ConfigError> {
        if !self.path.exists() {
            info!("no config at {}, using defaults", self.path.display());
            return Ok((BarConfig::default(), Vec::new()));
        }
        let json = fs::read_to_string(&self.path).map_err(|e| ConfigError::Io(e.to_string()))?;
        BarConfig::from_json(&json)
    }

    fn save(&self, config: &BarConfig) -> Result<(), ConfigError> {
        // Validate before persisting — a bad record must never reach disk.
        config.validate()?;
        let json = config.to_json()?;
        fs::write(&self.path, json).map_err(|e| ConfigError::Io(e.to_string()))?;
        info!("config saved to {}", self.path.display());
        Ok(())
    }
}

// ── Catalog ───────────────────────────────────────────────────

/// `CatalogStore` backed by a JSON file (pre-merged recipe list).
pub struct FileCatalogStore {
    path: PathBuf,
}

impl FileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogStore for FileCatalogStore {
    fn load(&self) -> Result<RecipeCatalog, CatalogError> {
        let json = fs::read_to_string(&self.path).map_err(|e| CatalogError::Io(e.to_string()))?;
        RecipeCatalog::from_json(&json)
    }
}
