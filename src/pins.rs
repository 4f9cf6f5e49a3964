//! GPIO signal naming and the runtime-editable pin map.
//!
//! Four output signals drive the turret: the DM542T stepper driver takes
//! direction, step, and enable (low-active on most variants); a fourth
//! line fires the valve-press actuator. The map is part of the persisted
//! configuration and can be re-assigned from the configuration surface,
//! so unlike a fixed schematic there is no hard-coded pin table — every
//! driver receives a validated [`PinMap`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Signal names
// ---------------------------------------------------------------------------

/// The four named output signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Stepper rotation direction (HIGH = clockwise).
    Direction,
    /// Stepper step pulse.
    Step,
    /// Stepper driver enable (low-active at the driver; adapters map it).
    Enable,
    /// Valve-press actuator.
    Actuator,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Self::Direction, Self::Step, Self::Enable, Self::Actuator];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direction => "direction",
            Self::Step => "step",
            Self::Enable => "enable",
            Self::Actuator => "actuator",
        }
    }
}

impl core::fmt::Display for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Pin map
// ---------------------------------------------------------------------------

/// BCM pin numbers for the four output signals.
///
/// Defaults match the reference wiring of the main board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub direction: u8,
    pub step: u8,
    pub enable: u8,
    pub actuator: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            direction: 20,
            step: 21,
            enable: 16,
            actuator: 26,
        }
    }
}

impl PinMap {
    /// Pin number for a named signal.
    pub fn pin(&self, signal: Signal) -> u8 {
        match signal {
            Signal::Direction => self.direction,
            Signal::Step => self.step,
            Signal::Enable => self.enable,
            Signal::Actuator => self.actuator,
        }
    }

    /// Reject zero pins and duplicate assignments across signals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for signal in Signal::ALL {
            if self.pin(signal) == 0 {
                return Err(ConfigError::UnassignedPin(signal));
            }
        }
        for (i, first) in Signal::ALL.iter().enumerate() {
            for second in &Signal::ALL[i + 1..] {
                if self.pin(*first) == self.pin(*second) {
                    return Err(ConfigError::DuplicatePin {
                        pin: self.pin(*first),
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        Ok(())
    }
}
