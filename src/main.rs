//! ClimaBox Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink    NvsAdapter   Esp32Time    │
//! │  (Sensor+Actuator)   (EventSink)     (ConfigPort) (clock)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  DutyScheduler × 2 · TimerQueue · Alerts               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is driven by two esp_timer tick sources pushed into the
//! lock-free event queue: sensor reads on the configured read interval
//! and control ticks on the control interval.
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod alerts;
pub mod app;
pub mod config;
pub mod control;
mod error;
mod events;
mod pins;
pub mod sensors;
pub mod timers;

mod adapters;
mod drivers;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::info;

use adapters::hardware::HardwareAdapter;
use adapters::log_sink::LogEventSink;
use adapters::nvs::NvsAdapter;
use adapters::time::Esp32TimeAdapter;
use app::service::AppService;
use config::SystemConfig;
use drivers::pwm::PwmChannel;
use events::{pop_event, Event};
use sensors::co2::Co2Sensor;
use sensors::humidity::HumiditySensor;
use sensors::temperature::TemperatureSensor;
use sensors::SensorHub;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("ClimaBox v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = drivers::watchdog::Watchdog::new();

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            // Continue without NVS — config will not be persisted this
            // session.  On next reboot, NVS should self-heal.
            log::warn!("NVS init failed ({}), running with defaults and no persistence", e);
            None
        }
    };
    let config = match nvs.as_ref().map(|n| n.load()) {
        Some(Ok(cfg)) => {
            info!("Config loaded from NVS");
            cfg
        }
        Some(Err(e)) => {
            log::warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
        None => SystemConfig::default(),
    };

    // ── 4. Construct adapters ─────────────────────────────────
    let sensor_hub = SensorHub::new(
        TemperatureSensor::new(pins::TEMP_ADC_GPIO),
        HumiditySensor::new(pins::HUMIDITY_ADC_GPIO),
        Co2Sensor::new(pins::CO2_ADC_GPIO),
    );
    let mut hw = HardwareAdapter::new(
        sensor_hub,
        PwmChannel::new(pins::LEDC_TIMER_FAN, pins::LEDC_CH_FAN, pins::FAN_PWM_GPIO),
        PwmChannel::new(
            pins::LEDC_TIMER_HUMIDIFIER,
            pins::LEDC_CH_HUMIDIFIER,
            pins::HUMIDIFIER_PWM_GPIO,
        ),
    );
    let mut sink = LogEventSink::new();
    let time = Esp32TimeAdapter::new();

    // ── 5. Start the service and the tick sources ─────────────
    drivers::hw_timer::start_timers(
        config.sensor_read_interval_ms,
        config.control_loop_interval_ms,
    );
    let mut service = AppService::new(config);
    service.start(time.uptime_ms(), &mut sink);

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        while let Some(event) = pop_event() {
            match event {
                Event::SensorReadTick => {
                    hw.refresh_sensors(time.uptime_secs());
                }
                Event::ControlTick => {
                    service.tick(&mut hw, &mut sink, time.uptime_ms());
                    if let Some(nvs) = nvs.as_ref() {
                        let _ = service.persist_if_due(nvs, &mut sink);
                    }
                    watchdog.feed();
                }
            }
        }

        // Idle until the next tick lands in the queue.  The loop never
        // exits; on panic the watchdog restarts the device.
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
