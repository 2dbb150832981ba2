//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and both PWM channels, exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation stubs.

use log::warn;

use crate::app::ports::{ActuatorId, ActuatorPort, SensorPort};
use crate::control::duty::PwmConfig;
use crate::drivers::pwm::PwmChannel;
use crate::sensors::{ClimateSnapshot, SensorHub};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    fan: PwmChannel,
    humidifier: PwmChannel,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, fan: PwmChannel, humidifier: PwmChannel) -> Self {
        Self {
            sensor_hub,
            fan,
            humidifier,
        }
    }

    /// Refresh the sensor cache.  Called on the (slower) sensor-read
    /// cadence; the control tick consumes the cached snapshot.
    pub fn refresh_sensors(&mut self, uptime_secs: u64) {
        self.sensor_hub.refresh(uptime_secs);
    }

    fn channel(&mut self, actuator: ActuatorId) -> &mut PwmChannel {
        match actuator {
            ActuatorId::Fan => &mut self.fan,
            ActuatorId::Humidifier => &mut self.humidifier,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_all(&mut self, _uptime_secs: u64) -> ClimateSnapshot {
        self.sensor_hub.snapshot()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn configure_pwm(&mut self, actuator: ActuatorId, pwm: PwmConfig) {
        if let Err(e) = self.channel(actuator).configure(pwm) {
            // The previous timer configuration stays active; the duty
            // scheduler will retry on the next frequency change.
            warn!("{:?}: {}", actuator, e);
        }
    }

    fn set_duty_level(&mut self, actuator: ActuatorId, level: u32) {
        self.channel(actuator).write_level(level);
    }

    fn all_off(&mut self) {
        self.fan.off();
        self.humidifier.off();
    }
}
