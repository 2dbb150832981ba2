//! System configuration parameters
//!
//! All tunable parameters for the ClimaBox controller.  Values can be
//! overridden at runtime (config commands) and are persisted to NVS with
//! debounce coalescing so rapid edits cost a single flash write.

use serde::{Deserialize, Serialize};

/// Which sensor channel feeds a duty scheduler or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Co2,
}

/// Control policy for one PWM actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Duty follows the sensor value linearly between the configured
    /// sensor range, mapped onto the duty range.
    Proportional,
    /// Bang-bang with a hysteresis band: full duty once the sensor
    /// crosses the active end of the band, back to minimum duty once it
    /// returns past the inactive end.
    HysteresisWindow,
    /// Run at maximum duty whenever the time budget allows, regardless
    /// of the sensor value.
    BudgetSchedule,
    /// Always at maximum duty (budget-exempt).
    ForcedOn,
    /// Always off.
    ForcedOff,
}

/// Per-actuator configuration (one entry each for fan and humidifier).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub mode: ControlMode,
    /// Sensor channel driving this actuator.
    pub sensor: SensorKind,
    /// Input range for proportional mapping / hysteresis thresholds.
    /// `min > max` reverses the mapping direction (e.g. a humidifier
    /// that runs harder the *drier* the air gets).
    pub min_sensor_value: f32,
    pub max_sensor_value: f32,
    /// Output duty range, each in [0, 1].
    pub min_duty: f32,
    pub max_duty: f32,
    /// Active-seconds ceiling within the rolling window.
    pub max_active_secs: u32,
    /// Rolling-window length for the time budget.
    pub active_window_secs: u32,
    /// Cooldown after the budget replenishes before activity may resume.
    pub activation_offset_secs: u32,
    pub pwm_frequency_hz: u32,
    pub pwm_resolution_bits: u8,
}

/// Out-of-range alert settings for one sensor channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Minimum spacing between repeated alerts for the same channel.
    pub interval_ms: u64,
    pub min: f32,
    pub max: f32,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensor calibration offsets ---
    pub temperature_calibration_c: f32,
    pub humidity_calibration_pct: f32,
    pub co2_calibration_ppm: f32,

    // --- Timing ---
    /// Sensor read interval (milliseconds)
    pub sensor_read_interval_ms: u32,
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (milliseconds)
    pub telemetry_interval_ms: u64,
    /// Quiet period before a dirty config is flushed to NVS
    pub settings_save_interval_ms: u64,

    // --- Actuators ---
    pub fan: ActuatorConfig,
    pub humidifier: ActuatorConfig,

    // --- Alerts ---
    pub alert_temperature: AlertConfig,
    pub alert_humidity: AlertConfig,
    pub alert_co2: AlertConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // The stock enclosure sensor reads slightly warm.
            temperature_calibration_c: -0.4,
            humidity_calibration_pct: 0.0,
            co2_calibration_ppm: 0.0,

            sensor_read_interval_ms: 5_000,
            control_loop_interval_ms: 1_000,
            telemetry_interval_ms: 15_000,
            settings_save_interval_ms: 30_000,

            fan: ActuatorConfig {
                mode: ControlMode::Proportional,
                sensor: SensorKind::Co2,
                min_sensor_value: 600.0,
                max_sensor_value: 1_400.0,
                min_duty: 0.0,
                max_duty: 1.0,
                max_active_secs: 1_800,
                active_window_secs: 3_600,
                activation_offset_secs: 0,
                pwm_frequency_hz: 25_000,
                pwm_resolution_bits: 8,
            },
            humidifier: ActuatorConfig {
                mode: ControlMode::HysteresisWindow,
                sensor: SensorKind::Humidity,
                // Reversed band: active when the air dries below 40 %,
                // inactive again above 60 %.
                min_sensor_value: 60.0,
                max_sensor_value: 40.0,
                min_duty: 0.0,
                max_duty: 0.8,
                max_active_secs: 600,
                active_window_secs: 1_800,
                activation_offset_secs: 30,
                pwm_frequency_hz: 1_000,
                pwm_resolution_bits: 8,
            },

            alert_temperature: AlertConfig {
                enabled: true,
                interval_ms: 5 * 60 * 1000,
                min: 10.0,
                max: 30.0,
            },
            alert_humidity: AlertConfig {
                enabled: false,
                interval_ms: 5 * 60 * 1000,
                min: 20.0,
                max: 80.0,
            },
            alert_co2: AlertConfig {
                enabled: true,
                interval_ms: 5 * 60 * 1000,
                min: 0.0,
                max: 1_500.0,
            },
        }
    }
}

impl SystemConfig {
    /// JSON snapshot for the provisioning / debug surface.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
