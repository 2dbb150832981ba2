//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future MQTT or BLE adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | {} | fan={:.0}% ({}/{}s{}) | hum={:.0}% ({}/{}s{})",
                    t.display,
                    t.fan_duty_pct,
                    t.fan_budget.accumulated_secs,
                    t.fan_budget.window_secs,
                    if t.fan_budget.can_act { "" } else { ", out of time" },
                    t.humidifier_duty_pct,
                    t.humidifier_budget.accumulated_secs,
                    t.humidifier_budget.window_secs,
                    if t.humidifier_budget.can_act { "" } else { ", out of time" },
                );
            }
            AppEvent::Alert { kind, value } => {
                warn!("ALERT | {:?} out of range: {:.1}", kind, value);
            }
            AppEvent::ConfigUpdated => {
                info!("CONFIG | updated (save pending)");
            }
            AppEvent::ConfigSaved => {
                info!("CONFIG | saved to NVS");
            }
            AppEvent::Started => {
                info!("START | control loop up");
            }
        }
    }
}
