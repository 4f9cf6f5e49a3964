//! Port traits — the boundary between the application core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BarService (domain)
//! ```
//!
//! Driven adapters (event sinks, persistent stores) implement these
//! traits; the service consumes them via generics and never touches the
//! filesystem or a terminal directly.

use crate::catalog::RecipeCatalog;
use crate::config::BarConfig;
use crate::error::{CatalogError, ConfigError, ConfigWarning};

use super::events::BarEvent;

/// The domain emits structured [`BarEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &BarEvent);
}

/// Loads and persists the bottle configuration.
///
/// Implementations MUST validate before persisting — invalid records
/// (duplicate pins, non-positive shot size) are rejected, not clamped.
/// A missing record loads as [`BarConfig::default()`].
pub trait ConfigStore {
    fn load(&self) -> Result<(BarConfig, Vec<ConfigWarning>), ConfigError>;
    fn save(&self, config: &BarConfig) -> Result<(), ConfigError>;
}

/// Loads the pre-merged recipe catalog. Synchronisation with remote
/// sources happens upstream of this port.
pub trait CatalogStore {
    fn load(&self) -> Result<RecipeCatalog, CatalogError>;
}
