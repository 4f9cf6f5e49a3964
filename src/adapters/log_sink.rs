//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger. A web front end would implement the same trait to push
//! flash messages to the user's session.

use log::{info, warn};

use crate::app::events::BarEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BarEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BarEvent) {
        match event {
            BarEvent::DrinkStarted { recipe } => info!("mixing '{recipe}'"),
            BarEvent::Poured {
                ingredient,
                slot,
                volume_oz,
                substituted_with,
            } => match substituted_with {
                Some(sub) => info!(
                    "poured {volume_oz:.2} oz {ingredient} (as {sub}) from slot {slot}"
                ),
                None => info!("poured {volume_oz:.2} oz {ingredient} from slot {slot}"),
            },
            BarEvent::PantryAdd { ingredient, qty } => {
                info!("add {qty} measure(s) of {ingredient} by hand")
            }
            BarEvent::DrinkReady {
                recipe,
                dispensed,
                manual,
            } => info!("'{recipe}' ready — {dispensed} poured, {manual} manual. Cheers!"),
            BarEvent::DrinkRejected { recipe, missing } => {
                warn!("'{recipe}' not makeable: missing {missing}")
            }
            BarEvent::Fault { reason } => warn!("hardware fault: {reason}"),
            BarEvent::ConfigSaved { safe_mode } => {
                info!(
                    "configuration saved (safe mode {})",
                    if *safe_mode { "on" } else { "off" }
                )
            }
        }
    }
}
