//! Outbound application events.
//!
//! The [`BarService`](super::service::BarService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to the console, push to a web
//! session, collect in a test.

use crate::error::FaultReason;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum BarEvent {
    /// A drink run began.
    DrinkStarted { recipe: String },

    /// One slot binding was dispensed.
    Poured {
        ingredient: String,
        slot: u8,
        volume_oz: f64,
        /// The stand-in actually in the slot, when a substitution applied.
        substituted_with: Option<String>,
    },

    /// A pantry binding needs the operator's hands.
    PantryAdd { ingredient: String, qty: f64 },

    /// The drink run finished.
    DrinkReady {
        recipe: String,
        dispensed: u32,
        manual: u32,
    },

    /// The resolver marked the recipe unmakeable — a normal negative
    /// outcome, not a failure.
    DrinkRejected { recipe: String, missing: String },

    /// The controller latched a hardware fault.
    Fault { reason: FaultReason },

    /// Configuration was updated and persisted.
    ConfigSaved { safe_mode: bool },
}
