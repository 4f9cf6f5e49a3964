//! Unified error types for the barbot controller.
//!
//! A single top-level `Error` enum that every subsystem converts into,
//! keeping caller-side handling uniform. Validation failures are rejected
//! before any side effect; hardware faults latch the controller in
//! `Faulted` until an explicit reset. An unsatisfied recipe is *not* an
//! error — the resolver reports it as a normal negative result.

use core::fmt;

use crate::pins::Signal;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The recipe catalog is invalid or a recipe could not be found.
    Catalog(CatalogError),
    /// A dispense operation was rejected or the hardware faulted.
    Dispense(DispenseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Catalog(e) => write!(f, "catalog: {e}"),
            Self::Dispense(e) => write!(f, "dispense: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Rejected before anything is persisted or actuated.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The stored record could not be parsed.
    Parse(String),
    /// Two signals are mapped to the same GPIO pin.
    DuplicatePin { pin: u8, first: Signal, second: Signal },
    /// A signal is mapped to pin 0 (pins are positive BCM numbers).
    UnassignedPin(Signal),
    /// Shot size must be a positive, finite volume.
    InvalidShotSize(f64),
    /// Underlying storage failed.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse failed: {msg}"),
            Self::DuplicatePin { pin, first, second } => {
                write!(f, "pin {pin} assigned to both {first} and {second}")
            }
            Self::UnassignedPin(signal) => write!(f, "{signal} has no pin assigned"),
            Self::InvalidShotSize(v) => write!(f, "shot size {v} is not a positive volume"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Non-fatal configuration findings. The config still loads; these are
/// surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The same ingredient is loaded in more than one slot. Both slots
    /// stay addressable; the lowest index wins for resolution.
    DuplicateSlotIngredient {
        ingredient: String,
        kept: usize,
        duplicate: usize,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSlotIngredient {
                ingredient,
                kept,
                duplicate,
            } => write!(
                f,
                "'{ingredient}' loaded in slots {kept} and {duplicate}; slot {kept} will pour"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog record could not be parsed.
    Parse(String),
    /// No recipe with the given identifier or name.
    UnknownRecipe(String),
    /// Underlying storage failed.
    Io(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse failed: {msg}"),
            Self::UnknownRecipe(id) => write!(f, "no recipe matching '{id}'"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<CatalogError> for Error {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

// ---------------------------------------------------------------------------
// Dispense errors
// ---------------------------------------------------------------------------

/// Outcomes of a rejected or failed motion request.
///
/// `InvalidSlot` and `InvalidVolume` are validation errors caught before
/// any motion. `Busy` is transient — the caller retries after status
/// settles. `Fault` means the controller latched and rejects everything
/// until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispenseError {
    /// Slot index outside 0..=11. Rejected before any motion.
    InvalidSlot(u8),
    /// Requested volume is not a positive, finite number of ounces.
    InvalidVolume(f64),
    /// Another job is in flight. No queueing — retry after status settles.
    Busy,
    /// Pour requested for a slot the turret is not currently at.
    WrongPosition { requested: u8, current: Option<u8> },
    /// The controller is (or has just become) faulted.
    Fault(FaultReason),
}

impl fmt::Display for DispenseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSlot(slot) => write!(f, "slot {slot} out of range 0..=11"),
            Self::InvalidVolume(v) => write!(f, "volume {v} oz is not dispensable"),
            Self::Busy => write!(f, "busy: a job is already in flight"),
            Self::WrongPosition { requested, current } => match current {
                Some(c) => write!(f, "wrong position: at slot {c}, pour requested for {requested}"),
                None => write!(f, "wrong position: axis not homed, pour requested for {requested}"),
            },
            Self::Fault(reason) => write!(f, "faulted: {reason}"),
        }
    }
}

impl From<DispenseError> for Error {
    fn from(e: DispenseError) -> Self {
        Self::Dispense(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware fault reasons
// ---------------------------------------------------------------------------

/// Why the controller entered `Faulted`. Surfaced verbatim to callers and
/// kept latched until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// Homing ran past the configured timeout without the sensor firing.
    HomeTimeout,
    /// The stepper driver raised its fault output mid-motion.
    DriverFault,
    /// The independent slot sensor disagrees with the commanded position.
    PositionMismatch { expected: u8, actual: u8 },
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeTimeout => write!(f, "home not found"),
            Self::DriverFault => write!(f, "motor driver fault"),
            Self::PositionMismatch { expected, actual } => {
                write!(f, "position mismatch: expected slot {expected}, sensor reports {actual}")
            }
        }
    }
}

impl From<FaultReason> for DispenseError {
    fn from(e: FaultReason) -> Self {
        Self::Fault(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
