//! Raspberry Pi GPIO backend (feature `rpi`).
//!
//! Drives the DM542T stepper driver and the actuator relay through BCM
//! pins via `rppal`. The enable input is low-active on the DM542T, so the
//! logical flag is inverted here and nowhere else.

use log::info;
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::drivers::{Direction, TurretDriver};
use crate::error::ConfigError;
use crate::pins::PinMap;

/// Optional input wiring. Boards differ in which feedback lines exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputPins {
    /// Home (zero-position) sensor, active high.
    pub home_sensor: Option<u8>,
    /// Stepper driver fault output, active high.
    pub driver_fault: Option<u8>,
}

/// Real GPIO driver for the turret main board.
pub struct RpiDriver {
    direction: OutputPin,
    step: OutputPin,
    enable: OutputPin,
    actuator: OutputPin,
    home_sensor: Option<InputPin>,
    fault_in: Option<InputPin>,
}

impl RpiDriver {
    /// Claim the configured pins. Fails if the GPIO character device is
    /// unavailable or a pin is already held elsewhere.
    pub fn new(pins: &PinMap, inputs: InputPins) -> Result<Self, ConfigError> {
        pins.validate()?;
        let gpio = Gpio::new().map_err(|e| ConfigError::Io(e.to_string()))?;

        let claim_out = |pin: u8| -> Result<OutputPin, ConfigError> {
            Ok(gpio
                .get(pin)
                .map_err(|e| ConfigError::Io(e.to_string()))?
                .into_output_low())
        };
        let claim_in = |pin: u8| -> Result<InputPin, ConfigError> {
            Ok(gpio
                .get(pin)
                .map_err(|e| ConfigError::Io(e.to_string()))?
                .into_input_pulldown())
        };

        let mut enable = claim_out(pins.enable)?;
        // Low-active: hold the driver disabled until the controller asks.
        enable.set_high();

        let driver = Self {
            direction: claim_out(pins.direction)?,
            step: claim_out(pins.step)?,
            enable,
            actuator: claim_out(pins.actuator)?,
            home_sensor: inputs.home_sensor.map(|p| claim_in(p)).transpose()?,
            fault_in: inputs.driver_fault.map(|p| claim_in(p)).transpose()?,
        };
        info!(
            "rpi driver up: DIR={} STEP={} ENABLE={} ACTUATOR={}",
            pins.direction, pins.step, pins.enable, pins.actuator
        );
        Ok(driver)
    }
}

impl TurretDriver for RpiDriver {
    fn set_direction(&mut self, dir: Direction) {
        if dir.dir_level() {
            self.direction.set_high();
        } else {
            self.direction.set_low();
        }
    }

    fn set_step(&mut self, high: bool) {
        if high {
            self.step.set_high();
        } else {
            self.step.set_low();
        }
    }

    fn set_enabled(&mut self, on: bool) {
        // DM542T enable is low-active.
        if on {
            self.enable.set_low();
        } else {
            self.enable.set_high();
        }
    }

    fn set_actuator(&mut self, extended: bool) {
        if extended {
            self.actuator.set_high();
        } else {
            self.actuator.set_low();
        }
    }

    fn home_sensor_active(&mut self) -> bool {
        match &self.home_sensor {
            Some(pin) => pin.is_high(),
            // No sensor fitted: trust the power-on position as home.
            None => true,
        }
    }

    fn driver_fault(&mut self) -> bool {
        self.fault_in.as_ref().is_some_and(InputPin::is_high)
    }
}

impl Drop for RpiDriver {
    fn drop(&mut self) {
        // Leave the rig de-energised and the valve closed.
        self.actuator.set_low();
        self.enable.set_high();
    }
}
