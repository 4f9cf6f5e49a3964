//! Motion tuning and pure path/timing math.
//!
//! Everything here is arithmetic over one [`MotionParams`] value — no
//! hardware, no state. The controller consumes these plans; tests pin the
//! numbers down directly.

use std::time::Duration;

use crate::config::SLOT_COUNT;
use crate::drivers::Direction;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Motion tuning with hardware-matched defaults.
///
/// Not part of the persisted configuration record — these are
/// deployment-level parameters with defaults, passed explicitly into
/// every motion call as part of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionParams {
    /// Full steps per motor revolution (1.8° motor → 200).
    pub steps_per_rev: u32,
    /// Driver microstepping factor.
    pub microstep: u32,
    /// Delay after each STEP edge.
    pub step_delay: Duration,
    /// Valve press time per ounce dispensed.
    pub press_ms_per_oz: u64,
    /// Pause after retracting the actuator, before the next motion.
    pub actuator_settle: Duration,
    /// Bound on the homing search before declaring "home not found".
    pub homing_timeout: Duration,
    /// Tie-break direction when both ways round are equally short.
    pub default_direction: Direction,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            steps_per_rev: 200,
            microstep: 8,
            step_delay: Duration::from_micros(800),
            press_ms_per_oz: 600,
            actuator_settle: Duration::from_millis(200),
            homing_timeout: Duration::from_secs(10),
            default_direction: Direction::Clockwise,
        }
    }
}

impl MotionParams {
    /// Zero-delay tuning for simulated rigs.
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            press_ms_per_oz: 0,
            actuator_settle: Duration::ZERO,
            homing_timeout: Duration::from_millis(20),
            ..Self::default()
        }
    }

    /// Microsteps between adjacent slots.
    pub fn steps_per_slot(&self) -> u32 {
        (self.steps_per_rev * self.microstep) / SLOT_COUNT as u32
    }

    /// How long the valve stays pressed for `volume_oz`.
    pub fn pour_hold(&self, volume_oz: f64) -> Duration {
        Duration::from_millis((self.press_ms_per_oz as f64 * volume_oz).round() as u64)
    }
}

// ---------------------------------------------------------------------------
// Rotation planning
// ---------------------------------------------------------------------------

/// A planned rotation: which way round and how far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPlan {
    pub direction: Direction,
    /// Slots traversed in `direction`.
    pub slots: u32,
    /// Step pulses to issue.
    pub steps: u32,
}

impl RotationPlan {
    /// Shortest angular path from `current` to `target`; a dead tie
    /// (half a revolution) goes the configured default way round.
    pub fn shortest(current: u8, target: u8, params: &MotionParams) -> Self {
        let n = SLOT_COUNT as u32;
        let cw = (u32::from(target) + n - u32::from(current)) % n;
        let ccw = (n - cw) % n;

        let (direction, slots) = match cw.cmp(&ccw) {
            core::cmp::Ordering::Less => (Direction::Clockwise, cw),
            core::cmp::Ordering::Greater => (Direction::CounterClockwise, ccw),
            core::cmp::Ordering::Equal => (params.default_direction, cw),
        };

        Self {
            direction,
            slots,
            steps: slots * params.steps_per_slot(),
        }
    }
}
