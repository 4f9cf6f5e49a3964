//! Dispense controller — the stateful owner of the physical axes.
//!
//! ```text
//!  Uninitialized ──▶ Homing ──▶ Idle ──▶ Rotating ──▶ Idle
//!                                 │                     ▲
//!                                 └──▶ Pouring ─────────┘
//!
//!  Any state ──[hardware fault]──▶ Faulted ──[reset]──▶ Homing
//! ```
//!
//! `Idle` is the only state that accepts a new job; anything arriving
//! while motion is in flight is rejected with a busy signal, never
//! queued — a stale motion request must not fire later. The controller
//! is the sole path by which output pins change, and every write funnels
//! through one choke point that drops it when the snapshot's safe-mode
//! flag is set.
//!
//! Configuration enters as an explicit [`MotionSnapshot`] per call, so an
//! edit mid-job can never retroactively change an in-flight action.

pub mod motion;
pub mod shared;

pub use motion::{MotionParams, RotationPlan};
pub use shared::SharedTurret;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::config::{BarConfig, SLOT_COUNT};
use crate::drivers::{Direction, TurretDriver};
use crate::error::{DispenseError, FaultReason};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurretState {
    Uninitialized,
    Homing,
    Idle,
    Rotating,
    Pouring,
    Faulted,
}

impl TurretState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Homing => "Homing",
            Self::Idle => "Idle",
            Self::Rotating => "Rotating",
            Self::Pouring => "Pouring",
            Self::Faulted => "Faulted",
        }
    }
}

// ---------------------------------------------------------------------------
// Axis state
// ---------------------------------------------------------------------------

/// Actuator position as last commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorPosition {
    #[default]
    Unknown,
    Retracted,
    Extended,
}

/// Physical axis truth. Owned exclusively by the controller — never
/// merged with configuration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisState {
    /// Whether a home calibration has established the zero position.
    pub homed: bool,
    /// Current slot; `None` until homed.
    pub current_slot: Option<u8>,
    pub actuator: ActuatorPosition,
}

/// Point-in-time controller status for pollers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub state: TurretState,
    pub current_slot: Option<u8>,
    pub fault: Option<FaultReason>,
}

// ---------------------------------------------------------------------------
// Per-call inputs
// ---------------------------------------------------------------------------

/// Immutable view of the configuration taken when a request is issued.
#[derive(Debug, Clone, Copy)]
pub struct MotionSnapshot {
    pub safe_mode: bool,
    pub params: MotionParams,
}

impl MotionSnapshot {
    pub fn of(config: &BarConfig, params: MotionParams) -> Self {
        Self {
            safe_mode: config.safe_mode,
            params,
        }
    }
}

/// One dispense order: created by the orchestrator, consumed exactly
/// once, never persisted.
#[derive(Debug)]
pub struct DispenseJob {
    pub slot: u8,
    pub volume_oz: f64,
    pub issued_at: Instant,
}

impl DispenseJob {
    pub fn new(slot: u8, volume_oz: f64) -> Self {
        Self {
            slot,
            volume_oz,
            issued_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// The dispense controller. One instance owns one physical turret.
pub struct DispenseController<D: TurretDriver> {
    driver: D,
    state: TurretState,
    axis: AxisState,
    fault: Option<FaultReason>,
    /// Last published status, shared with non-blocking pollers.
    published: Arc<Mutex<Status>>,
}

impl<D: TurretDriver> DispenseController<D> {
    pub fn new(driver: D) -> Self {
        let status = Status {
            state: TurretState::Uninitialized,
            current_slot: None,
            fault: None,
        };
        Self {
            driver,
            state: TurretState::Uninitialized,
            axis: AxisState::default(),
            fault: None,
            published: Arc::new(Mutex::new(status)),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> TurretState {
        self.state
    }

    pub fn axis(&self) -> AxisState {
        self.axis
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            current_slot: self.axis.current_slot,
            fault: self.fault,
        }
    }

    /// Shared cell updated on every transition (read by [`SharedTurret`]).
    pub(crate) fn status_cell(&self) -> Arc<Mutex<Status>> {
        Arc::clone(&self.published)
    }

    /// Access the underlying driver (sim inspection, teardown).
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    // ── Operations ────────────────────────────────────────────

    /// Home the rotation axis: seek the home sensor, zero the position.
    pub fn home(&mut self, snap: &MotionSnapshot) -> Result<(), DispenseError> {
        match self.state {
            TurretState::Faulted => Err(self.latched()),
            TurretState::Uninitialized | TurretState::Idle => self.home_inner(snap),
            _ => Err(DispenseError::Busy),
        }
    }

    /// Rotate to `slot` by the shortest angular path. Already there is a
    /// successful no-op. Homes first if the axis is uncalibrated.
    pub fn rotate_to(&mut self, snap: &MotionSnapshot, slot: u8) -> Result<(), DispenseError> {
        if slot as usize >= SLOT_COUNT {
            return Err(DispenseError::InvalidSlot(slot));
        }
        self.ensure_idle(snap)?;

        if self.axis.current_slot == Some(slot) {
            debug!("rotate: already at slot {slot}");
            return Ok(());
        }

        // ensure_idle homed the axis, so a position is always known.
        let current = self.axis.current_slot.unwrap_or(0);
        let plan = RotationPlan::shortest(current, slot, &snap.params);
        let live = !snap.safe_mode;

        self.transition(TurretState::Rotating);
        info!(
            "rotate: slot {} -> {} ({:?}, {} steps){}",
            current,
            slot,
            plan.direction,
            plan.steps,
            if live { "" } else { " [safe mode, no motion]" }
        );

        if live {
            self.out_enabled(live, true);
            self.out_direction(live, plan.direction);
            for _ in 0..plan.steps {
                if self.driver.driver_fault() {
                    return Err(self.fault(live, FaultReason::DriverFault));
                }
                self.step_pulse(live, snap.params.step_delay);
            }
            if let Some(actual) = self.driver.slot_feedback() {
                if actual != slot {
                    return Err(self.fault(
                        live,
                        FaultReason::PositionMismatch {
                            expected: slot,
                            actual,
                        },
                    ));
                }
            }
        }

        self.axis.current_slot = Some(slot);
        self.transition(TurretState::Idle);
        Ok(())
    }

    /// Press the valve at `slot` for a duration proportional to
    /// `volume_oz`. The turret must already be at `slot` — a pour never
    /// rotates implicitly.
    pub fn pour(
        &mut self,
        snap: &MotionSnapshot,
        slot: u8,
        volume_oz: f64,
    ) -> Result<(), DispenseError> {
        if slot as usize >= SLOT_COUNT {
            return Err(DispenseError::InvalidSlot(slot));
        }
        if !volume_oz.is_finite() || volume_oz <= 0.0 {
            return Err(DispenseError::InvalidVolume(volume_oz));
        }
        self.ensure_idle(snap)?;

        // Re-validate position right before actuating: a missed rotation
        // must not dispense into the wrong slot.
        if self.axis.current_slot != Some(slot) {
            return Err(DispenseError::WrongPosition {
                requested: slot,
                current: self.axis.current_slot,
            });
        }

        let live = !snap.safe_mode;
        if self.driver.driver_fault() {
            return Err(self.fault(live, FaultReason::DriverFault));
        }

        let hold = snap.params.pour_hold(volume_oz);
        self.transition(TurretState::Pouring);
        info!(
            "pour: slot {slot}, {volume_oz:.2} oz, press {} ms{}",
            hold.as_millis(),
            if live { "" } else { " [safe mode, actuator withheld]" }
        );

        // Identical timing in safe mode; only the pin writes are dropped.
        self.out_actuator(live, true);
        if live {
            self.axis.actuator = ActuatorPosition::Extended;
        }
        pause(hold);
        self.out_actuator(live, false);
        self.axis.actuator = ActuatorPosition::Retracted;
        pause(snap.params.actuator_settle);

        if self.driver.driver_fault() {
            return Err(self.fault(live, FaultReason::DriverFault));
        }
        self.transition(TurretState::Idle);
        Ok(())
    }

    /// Consume one dispense job.
    pub fn dispense(&mut self, snap: &MotionSnapshot, job: DispenseJob) -> Result<(), DispenseError> {
        debug!(
            "job: slot {} / {:.2} oz, issued {} ms ago",
            job.slot,
            job.volume_oz,
            job.issued_at.elapsed().as_millis()
        );
        self.pour(snap, job.slot, job.volume_oz)
    }

    /// Clear a latched fault and re-home. The only way out of `Faulted`.
    pub fn reset(&mut self, snap: &MotionSnapshot) -> Result<(), DispenseError> {
        if let Some(reason) = self.fault.take() {
            info!("reset: clearing fault '{reason}'");
        }
        self.axis = AxisState::default();
        self.transition(TurretState::Uninitialized);
        self.home_inner(snap)
    }

    // ── Internal ──────────────────────────────────────────────

    /// Gate for new jobs: `Idle` passes, `Uninitialized` homes first,
    /// `Faulted` replays the latched reason, anything else is busy.
    fn ensure_idle(&mut self, snap: &MotionSnapshot) -> Result<(), DispenseError> {
        match self.state {
            TurretState::Idle => Ok(()),
            TurretState::Uninitialized => self.home_inner(snap),
            TurretState::Faulted => Err(self.latched()),
            TurretState::Homing | TurretState::Rotating | TurretState::Pouring => {
                Err(DispenseError::Busy)
            }
        }
    }

    fn home_inner(&mut self, snap: &MotionSnapshot) -> Result<(), DispenseError> {
        let live = !snap.safe_mode;
        self.transition(TurretState::Homing);

        if live {
            self.out_actuator(live, false);
            self.out_enabled(live, true);
            self.out_direction(live, snap.params.default_direction);

            let deadline = Instant::now() + snap.params.homing_timeout;
            while !self.driver.home_sensor_active() {
                if self.driver.driver_fault() {
                    return Err(self.fault(live, FaultReason::DriverFault));
                }
                if Instant::now() >= deadline {
                    return Err(self.fault(live, FaultReason::HomeTimeout));
                }
                self.step_pulse(live, snap.params.step_delay);
            }
        } else {
            info!("homing: safe mode, zeroing without motion");
        }

        self.axis = AxisState {
            homed: true,
            current_slot: Some(0),
            actuator: ActuatorPosition::Retracted,
        };
        self.transition(TurretState::Idle);
        info!("homed: position zeroed at slot 0");
        Ok(())
    }

    /// De-energise, latch the reason, and enter `Faulted`.
    fn fault(&mut self, live: bool, reason: FaultReason) -> DispenseError {
        error!("turret fault: {reason}");
        self.out_actuator(live, false);
        self.out_enabled(live, false);
        if live {
            self.axis.actuator = ActuatorPosition::Retracted;
        }
        self.fault = Some(reason);
        self.transition(TurretState::Faulted);
        DispenseError::Fault(reason)
    }

    /// The latched fault, replayed for every rejected request.
    fn latched(&self) -> DispenseError {
        match self.fault {
            Some(reason) => DispenseError::Fault(reason),
            // Faulted always carries a reason; busy is the harmless fallback.
            None => DispenseError::Busy,
        }
    }

    fn transition(&mut self, next: TurretState) {
        if self.state != next {
            info!("turret: {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
        self.publish();
    }

    fn publish(&self) {
        let mut cell = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cell = self.status();
    }

    // ── Pin-write choke point ─────────────────────────────────
    //
    // Every output write in this module goes through these four helpers.
    // With `live == false` (safe mode) the write is dropped, which is the
    // hard guarantee that no sequence of calls can assert an output pin
    // while safe mode is active.

    fn out_direction(&mut self, live: bool, dir: Direction) {
        if live {
            self.driver.set_direction(dir);
        }
    }

    fn out_step(&mut self, live: bool, high: bool) {
        if live {
            self.driver.set_step(high);
        }
    }

    fn out_enabled(&mut self, live: bool, on: bool) {
        if live {
            self.driver.set_enabled(on);
        }
    }

    fn out_actuator(&mut self, live: bool, extended: bool) {
        if live {
            self.driver.set_actuator(extended);
        }
    }

    fn step_pulse(&mut self, live: bool, delay: Duration) {
        self.out_step(live, true);
        pause(delay);
        self.out_step(live, false);
        pause(delay);
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::sim::SimDriver;
    use crate::pins::Signal;

    fn live_snap() -> MotionSnapshot {
        MotionSnapshot {
            safe_mode: false,
            params: MotionParams::instant(),
        }
    }

    fn safe_snap() -> MotionSnapshot {
        MotionSnapshot {
            safe_mode: true,
            params: MotionParams::instant(),
        }
    }

    #[test]
    fn starts_uninitialized() {
        let c = DispenseController::new(SimDriver::new());
        assert_eq!(c.state(), TurretState::Uninitialized);
        assert_eq!(c.axis().current_slot, None);
        assert!(!c.axis().homed);
    }

    #[test]
    fn first_rotate_homes_implicitly() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 3).unwrap();
        assert_eq!(c.state(), TurretState::Idle);
        assert!(c.axis().homed);
        assert_eq!(c.axis().current_slot, Some(3));
    }

    #[test]
    fn homing_counts_real_steps() {
        let mut c = DispenseController::new(SimDriver::new().home_after_steps(5));
        c.home(&live_snap()).unwrap();
        assert_eq!(c.axis().current_slot, Some(0));
        assert_eq!(c.driver().steps_taken(), 5);
    }

    #[test]
    fn homing_timeout_faults_with_home_not_found() {
        let mut c = DispenseController::new(SimDriver::new().never_home());
        let err = c.home(&live_snap()).unwrap_err();
        assert_eq!(err, DispenseError::Fault(FaultReason::HomeTimeout));
        assert_eq!(c.state(), TurretState::Faulted);
        assert_eq!(c.status().fault, Some(FaultReason::HomeTimeout));
    }

    #[test]
    fn out_of_range_slot_is_rejected_before_motion() {
        let mut c = DispenseController::new(SimDriver::new());
        assert_eq!(
            c.rotate_to(&live_snap(), 12),
            Err(DispenseError::InvalidSlot(12))
        );
        // Still uninitialized: the invalid request must not trigger homing.
        assert_eq!(c.state(), TurretState::Uninitialized);
        assert!(c.driver().events.is_empty());
    }

    #[test]
    fn rotate_to_current_slot_is_a_noop_success() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 4).unwrap();
        let steps_before = c.driver().steps_taken();
        c.rotate_to(&live_snap(), 4).unwrap();
        assert_eq!(c.driver().steps_taken(), steps_before);
        assert_eq!(c.state(), TurretState::Idle);
    }

    #[test]
    fn rotation_takes_shortest_path() {
        let mut c = DispenseController::new(SimDriver::new());
        c.home(&live_snap()).unwrap();
        let steps_per_slot = MotionParams::instant().steps_per_slot();

        // 0 -> 9 is three slots counter-clockwise.
        let before = c.driver().steps_taken();
        c.rotate_to(&live_snap(), 9).unwrap();
        assert_eq!(c.driver().steps_taken() - before, 3 * steps_per_slot);
        assert_eq!(c.driver().last_direction(), Some(Direction::CounterClockwise));
    }

    #[test]
    fn pour_requires_current_slot() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 2).unwrap();
        let err = c.pour(&live_snap(), 5, 1.0).unwrap_err();
        assert_eq!(
            err,
            DispenseError::WrongPosition {
                requested: 5,
                current: Some(2),
            }
        );
        // Never rotates implicitly, never touches the actuator.
        assert_eq!(c.axis().current_slot, Some(2));
        assert!(!c.driver().actuator_ever_asserted());
    }

    #[test]
    fn pour_extends_then_retracts() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 2).unwrap();
        c.pour(&live_snap(), 2, 1.5).unwrap();
        assert_eq!(c.driver().transitions(Signal::Actuator), vec![false, true, false]);
        assert_eq!(c.state(), TurretState::Idle);
        assert_eq!(c.axis().actuator, ActuatorPosition::Retracted);
    }

    #[test]
    fn pour_rejects_non_positive_volume() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 1).unwrap();
        assert!(matches!(
            c.pour(&live_snap(), 1, 0.0),
            Err(DispenseError::InvalidVolume(_))
        ));
        assert!(matches!(
            c.pour(&live_snap(), 1, f64::NAN),
            Err(DispenseError::InvalidVolume(_))
        ));
    }

    #[test]
    fn safe_mode_full_pour_never_touches_pins() {
        let mut c = DispenseController::new(SimDriver::new());
        c.home(&safe_snap()).unwrap();
        c.rotate_to(&safe_snap(), 7).unwrap();
        c.pour(&safe_snap(), 7, 2.0).unwrap();

        assert!(c.driver().events.is_empty(), "no pin may move in safe mode");
        // The sequencing itself ran to completion.
        assert_eq!(c.state(), TurretState::Idle);
        assert_eq!(c.axis().current_slot, Some(7));
    }

    #[test]
    fn safe_mode_pour_reports_success() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&safe_snap(), 3).unwrap();
        assert!(c.pour(&safe_snap(), 3, 1.0).is_ok());
    }

    #[test]
    fn driver_fault_mid_rotation_latches() {
        let mut c = DispenseController::new(SimDriver::new().fault_after_steps(10));
        let err = c.rotate_to(&live_snap(), 6).unwrap_err();
        assert_eq!(err, DispenseError::Fault(FaultReason::DriverFault));
        assert_eq!(c.state(), TurretState::Faulted);
    }

    #[test]
    fn position_mismatch_faults_after_rotation() {
        let mut c = DispenseController::new(SimDriver::new().with_slot_feedback(4));
        c.home(&live_snap()).unwrap();
        let err = c.rotate_to(&live_snap(), 6).unwrap_err();
        assert_eq!(
            err,
            DispenseError::Fault(FaultReason::PositionMismatch {
                expected: 6,
                actual: 4,
            })
        );
    }

    #[test]
    fn faulted_rejects_everything_until_reset() {
        let mut c = DispenseController::new(SimDriver::new().never_home());
        assert!(c.home(&live_snap()).is_err());

        let fault = DispenseError::Fault(FaultReason::HomeTimeout);
        assert_eq!(c.rotate_to(&live_snap(), 1), Err(fault));
        assert_eq!(c.pour(&live_snap(), 0, 1.0), Err(fault));
        assert_eq!(c.home(&live_snap()), Err(fault));
    }

    #[test]
    fn reset_rehomes_and_clears_fault() {
        let mut c = DispenseController::new(SimDriver::new().never_home());
        assert!(c.home(&live_snap()).is_err());

        // Reset in safe mode: the broken sensor is out of the loop.
        c.reset(&safe_snap()).unwrap();
        assert_eq!(c.state(), TurretState::Idle);
        assert_eq!(c.status().fault, None);
        assert_eq!(c.axis().current_slot, Some(0));
    }

    #[test]
    fn dispense_consumes_a_job() {
        let mut c = DispenseController::new(SimDriver::new());
        c.rotate_to(&live_snap(), 1).unwrap();
        let job = DispenseJob::new(1, 1.5);
        c.dispense(&live_snap(), job).unwrap();
        assert_eq!(c.state(), TurretState::Idle);
    }

    #[test]
    fn enable_is_dropped_on_fault() {
        let mut c = DispenseController::new(SimDriver::new().fault_after_steps(3));
        let _ = c.rotate_to(&live_snap(), 6);
        let enables = c.driver().transitions(Signal::Enable);
        assert_eq!(enables.last(), Some(&false), "driver must be de-energised");
    }
}
