//! LEDC-backed PWM output channel.
//!
//! One instance per actuator (fan, humidifier).  A dumb actuator: it
//! programs whatever timer configuration and duty level it is told to —
//! budget enforcement and mode logic live in the duty scheduler.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the real LEDC timer/channel via hw_init helpers.
//! On host/test: tracks state in-memory only.

use log::warn;

use crate::control::duty::PwmConfig;
use crate::drivers::hw_init;
use crate::error::ActuatorError;

pub struct PwmChannel {
    timer: u32,
    channel: u32,
    gpio: i32,
    config: Option<PwmConfig>,
    level: u32,
}

impl PwmChannel {
    pub fn new(timer: u32, channel: u32, gpio: i32) -> Self {
        Self {
            timer,
            channel,
            gpio,
            config: None,
            level: 0,
        }
    }

    /// Reprogram the underlying LEDC timer.  On failure the previous
    /// configuration stays active and the error is reported to the
    /// caller for logging — the control loop carries on.
    pub fn configure(&mut self, pwm: PwmConfig) -> Result<(), ActuatorError> {
        hw_init::ledc_configure(
            self.timer,
            self.channel,
            self.gpio,
            pwm.frequency_hz,
            pwm.resolution_bits,
        )
        .map_err(|e| {
            warn!("pwm ch{}: {}", self.channel, e);
            ActuatorError::PwmConfigFailed
        })?;
        self.config = Some(pwm);
        Ok(())
    }

    /// Write a duty level, clamped to the configured resolution.  A
    /// write before the first configure is dropped (the timer is not
    /// running yet, so there is nothing to drive).
    pub fn write_level(&mut self, level: u32) {
        let Some(cfg) = self.config else {
            return;
        };
        let max = (1u32 << u32::from(cfg.resolution_bits).min(31)) - 1;
        self.level = level.min(max);
        hw_init::ledc_set(self.channel, self.level);
    }

    pub fn off(&mut self) {
        self.write_level(0);
    }

    /// Last written duty level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Currently programmed timer configuration, if any.
    pub fn config(&self) -> Option<PwmConfig> {
        self.config
    }
}
