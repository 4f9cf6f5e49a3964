//! Simulated turret driver.
//!
//! Records every output-pin transition in order and plays back scripted
//! sensor behaviour. This is both the default backend on machines without
//! GPIO and the harness for the controller's fault-injection tests.

use log::debug;

use crate::drivers::{Direction, PinEvent, TurretDriver};
use crate::pins::Signal;

/// In-memory driver with scripted sensors.
///
/// By default the home sensor fires on the first poll (the turret powers
/// up at home); use [`home_after_steps`](Self::home_after_steps) to make
/// homing do real work, [`never_home`](Self::never_home) to force a homing
/// timeout, and [`fault_after_steps`](Self::fault_after_steps) /
/// [`with_slot_feedback`](Self::with_slot_feedback) to inject hardware faults.
#[derive(Debug, Default)]
pub struct SimDriver {
    /// Every output transition, in the order it was driven.
    pub events: Vec<PinEvent>,
    step_rises: u32,
    home_after_steps: Option<u32>,
    fault_after_steps: Option<u32>,
    feedback: Option<u8>,
}

impl SimDriver {
    pub fn new() -> Self {
        Self {
            home_after_steps: Some(0),
            ..Self::default()
        }
    }

    /// Home sensor triggers once `steps` step pulses have been driven.
    pub fn home_after_steps(mut self, steps: u32) -> Self {
        self.home_after_steps = Some(steps);
        self
    }

    /// Home sensor never triggers — homing will time out.
    pub fn never_home(mut self) -> Self {
        self.home_after_steps = None;
        self
    }

    /// Driver-fault line asserts once `steps` step pulses have been driven.
    pub fn fault_after_steps(mut self, steps: u32) -> Self {
        self.fault_after_steps = Some(steps);
        self
    }

    /// Fit an independent slot sensor that always reports `slot`.
    pub fn with_slot_feedback(mut self, slot: u8) -> Self {
        self.feedback = Some(slot);
        self
    }

    // ── Recorded-history accessors ────────────────────────────────

    /// Step pulses driven so far (rising edges on STEP).
    pub fn steps_taken(&self) -> u32 {
        self.step_rises
    }

    /// Whether the actuator line was ever driven high.
    pub fn actuator_ever_asserted(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.signal == Signal::Actuator && e.high)
    }

    /// Every transition on one signal, in order.
    pub fn transitions(&self, signal: Signal) -> Vec<bool> {
        self.events
            .iter()
            .filter(|e| e.signal == signal)
            .map(|e| e.high)
            .collect()
    }

    /// Last latched direction, if the DIR line was ever driven.
    pub fn last_direction(&self) -> Option<Direction> {
        self.events
            .iter()
            .rev()
            .find(|e| e.signal == Signal::Direction)
            .map(|e| {
                if e.high {
                    Direction::Clockwise
                } else {
                    Direction::CounterClockwise
                }
            })
    }

    fn record(&mut self, signal: Signal, high: bool) {
        debug!("sim: {signal} -> {}", if high { "HIGH" } else { "LOW" });
        self.events.push(PinEvent { signal, high });
    }
}

impl TurretDriver for SimDriver {
    fn set_direction(&mut self, dir: Direction) {
        self.record(Signal::Direction, dir.dir_level());
    }

    fn set_step(&mut self, high: bool) {
        if high {
            self.step_rises += 1;
        }
        self.record(Signal::Step, high);
    }

    fn set_enabled(&mut self, on: bool) {
        // Logical level recorded; the real driver inverts for low-active.
        self.record(Signal::Enable, on);
    }

    fn set_actuator(&mut self, extended: bool) {
        self.record(Signal::Actuator, extended);
    }

    fn home_sensor_active(&mut self) -> bool {
        match self.home_after_steps {
            Some(threshold) => self.step_rises >= threshold,
            None => false,
        }
    }

    fn driver_fault(&mut self) -> bool {
        match self.fault_after_steps {
            Some(threshold) => self.step_rises >= threshold,
            None => false,
        }
    }

    fn slot_feedback(&mut self) -> Option<u8> {
        self.feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_transitions_in_order() {
        let mut sim = SimDriver::new();
        sim.set_enabled(true);
        sim.set_direction(Direction::CounterClockwise);
        sim.set_step(true);
        sim.set_step(false);

        assert_eq!(
            sim.events,
            vec![
                PinEvent { signal: Signal::Enable, high: true },
                PinEvent { signal: Signal::Direction, high: false },
                PinEvent { signal: Signal::Step, high: true },
                PinEvent { signal: Signal::Step, high: false },
            ]
        );
        assert_eq!(sim.steps_taken(), 1);
        assert_eq!(sim.last_direction(), Some(Direction::CounterClockwise));
    }

    #[test]
    fn scripted_home_sensor_waits_for_steps() {
        let mut sim = SimDriver::new().home_after_steps(2);
        assert!(!sim.home_sensor_active());
        sim.set_step(true);
        sim.set_step(false);
        assert!(!sim.home_sensor_active());
        sim.set_step(true);
        sim.set_step(false);
        assert!(sim.home_sensor_active());
    }

    #[test]
    fn never_home_stays_inactive() {
        let mut sim = SimDriver::new().never_home();
        for _ in 0..100 {
            sim.set_step(true);
            sim.set_step(false);
        }
        assert!(!sim.home_sensor_active());
    }
}
