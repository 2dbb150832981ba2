//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish over MQTT,
//! update a BLE characteristic, etc.

use crate::alerts::AlertKind;
use crate::control::duty::BudgetDiagnostics;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// A sensor channel left its configured comfort band.
    Alert { kind: AlertKind, value: f32 },

    /// Configuration was updated at runtime (persist pending).
    ConfigUpdated,

    /// Configuration was flushed to persistent storage.
    ConfigSaved,

    /// The application service has started.
    Started,
}

/// A point-in-time telemetry snapshot suitable for logging or
/// transmission.  Includes the budget diagnostics surface: accumulated
/// active time, window length and the can-act flag per actuator.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub co2_ppm: f32,
    pub fan_duty_pct: f32,
    pub humidifier_duty_pct: f32,
    pub fan_budget: BudgetDiagnostics,
    pub humidifier_budget: BudgetDiagnostics,
    /// Compact display/log rendering of the sensor values.
    pub display: heapless::String<48>,
}
