//! In-memory configuration store for tests and ephemeral setups.

use std::sync::{Mutex, PoisonError};

use crate::app::ports::ConfigStore;
use crate::config::BarConfig;
use crate::error::{ConfigError, ConfigWarning};

/// `ConfigStore` that keeps the record in memory.
#[derive(Default)]
pub struct MemoryConfigStore {
    record: Mutex<Option<BarConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(config: BarConfig) -> Self {
        Self {
            record: Mutex::new(Some(config)),
        }
    }

    /// The stored record, if any.
    pub fn stored(&self) -> Option<BarConfig> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<(BarConfig, Vec<ConfigWarning>), ConfigError> {
        let mut config = self.stored().unwrap_or_default();
        config.normalize();
        let warnings = config.validate()?;
        Ok((config, warnings))
    }

    fn save(&self, config: &BarConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(())
    }
}
