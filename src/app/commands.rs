//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (CLI, a web
//! front end, a test harness) that the
//! [`BarService`](super::service::BarService) interprets and acts upon.

use crate::config::BarConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum BarCommand {
    /// Make a full drink: resolve, then rotate + pour per binding.
    MakeDrink { recipe: String },

    /// Address a slot without pouring (bottle change, live slot test).
    RotateTo { slot: u8 },

    /// Pour a measured volume from the slot the turret is already at.
    Pour { slot: u8, volume_oz: f64 },

    /// Explicitly home the rotation axis.
    Home,

    /// Clear a latched fault and re-home.
    Reset,

    /// Toggle safe mode and persist the change.
    SetSafeMode(bool),

    /// Replace the bottle configuration and persist it.
    UpdateConfig(BarConfig),
}
