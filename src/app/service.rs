//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the per-actuator duty schedulers, the deferred
//! timer registry and the alert engine.  It exposes a clean,
//! hardware-agnostic API; all I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          AppService           │
//! ActuatorPort ◀──│  DutyScheduler × 2 · Timers   │
//!   ConfigPort ◀──│  Alerts · Save debounce       │
//!                 └──────────────────────────────┘
//! ```
//!
//! Configuration persistence is debounce-coalesced: every mutation
//! re-arms a one-shot on the timer registry, so a burst of edits from a
//! provisioning session costs one NVS write after the quiet period.

use log::{info, warn};

use crate::alerts::{AlertEngine, AlertKind};
use crate::app::commands::AppCommand;
use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::{ActuatorId, ActuatorPort, ConfigPort, EventSink, SensorPort};
use crate::config::SystemConfig;
use crate::control::duty::{BudgetDiagnostics, DutyCommand, DutyScheduler};
use crate::control::window::DEFAULT_CHUNK_SECS;
use crate::timers::{TimerHandle, TimerQueue};

/// Deferred actions carried by the timer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Quiet period after the last config change elapsed — flush to NVS.
    SaveConfig,
    /// Emit a telemetry snapshot.
    Telemetry,
    /// An alert channel's pacing window elapsed.
    AlertWindowElapsed(AlertKind),
}

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    fan: DutyScheduler,
    humidifier: DutyScheduler,
    timers: TimerQueue<TimerAction>,
    alerts: AlertEngine,

    /// Latest calibrated snapshot, kept for telemetry.
    snapshot: crate::sensors::ClimateSnapshot,
    fan_duty_pct: f32,
    humidifier_duty_pct: f32,

    save_timer: Option<TimerHandle>,
    telemetry_timer: Option<TimerHandle>,
    save_requested: bool,
    config_dirty: bool,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** arm the telemetry cadence — call [`start`] next.
    ///
    /// [`start`]: Self::start
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            fan: DutyScheduler::new(DEFAULT_CHUNK_SECS),
            humidifier: DutyScheduler::new(DEFAULT_CHUNK_SECS),
            timers: TimerQueue::new(),
            alerts: AlertEngine::new(),
            snapshot: crate::sensors::ClimateSnapshot::default(),
            fan_duty_pct: 0.0,
            humidifier_duty_pct: 0.0,
            save_timer: None,
            telemetry_timer: None,
            save_requested: false,
            config_dirty: false,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Arm the telemetry cadence and announce the start.
    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.telemetry_timer = Some(self.timers.add_interval(
            TimerAction::Telemetry,
            self.config.telemetry_interval_ms,
            now_ms,
        ));
        sink.emit(&AppEvent::Started);
        info!("AppService started");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: read sensors → evaluate duty
    /// schedulers → apply actuator commands → alerts → deferred timers.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
        now_ms: u64,
    ) {
        self.tick_count += 1;
        let now_secs = now_ms / 1_000;

        // 1. Read sensors via SensorPort, apply calibration
        let mut snapshot = hw.read_all(now_secs);
        snapshot.apply_calibration(&self.config);
        self.snapshot = snapshot;

        // 2. Evaluate both duty schedulers and drive the outputs
        let fan_cmd = self
            .fan
            .evaluate(&self.config.fan, snapshot.value(self.config.fan.sensor), now_secs);
        Self::apply(hw, ActuatorId::Fan, &fan_cmd);
        self.fan_duty_pct = fan_cmd.percent;

        let hum_cmd = self.humidifier.evaluate(
            &self.config.humidifier,
            snapshot.value(self.config.humidifier.sensor),
            now_secs,
        );
        Self::apply(hw, ActuatorId::Humidifier, &hum_cmd);
        self.humidifier_duty_pct = hum_cmd.percent;

        // 3. Alerts: newly fired channels enter their pacing window
        for (kind, value) in self.alerts.check(&snapshot, &self.config) {
            let interval = self.alert_interval_ms(kind);
            let _ = self
                .timers
                .add_timeout(TimerAction::AlertWindowElapsed(kind), interval, now_ms);
            sink.emit(&AppEvent::Alert { kind, value });
        }

        // 4. Deferred timers.  Collect first: dispatch needs &mut self.
        let mut due: heapless::Vec<TimerAction, 8> = heapless::Vec::new();
        self.timers.poll(now_ms, |action| {
            if due.push(action).is_err() {
                warn!("timer action overflow, dropping {:?}", action);
            }
        });
        for action in due {
            self.on_timer(action, sink, now_secs);
        }
    }

    fn apply(hw: &mut impl ActuatorPort, actuator: ActuatorId, cmd: &DutyCommand) {
        if let Some(pwm) = cmd.reconfigure {
            hw.configure_pwm(actuator, pwm);
        }
        hw.set_duty_level(actuator, cmd.level);
    }

    fn on_timer(&mut self, action: TimerAction, sink: &mut impl EventSink, now_secs: u64) {
        match action {
            TimerAction::SaveConfig => {
                self.save_timer = None;
                self.save_requested = true;
            }
            TimerAction::Telemetry => {
                sink.emit(&AppEvent::Telemetry(self.build_telemetry(now_secs)));
            }
            TimerAction::AlertWindowElapsed(kind) => {
                self.alerts.window_elapsed(kind);
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from provisioning, serial, tests).
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink, now_ms: u64) {
        match cmd {
            AppCommand::UpdateConfig(new_config) => {
                let telemetry_changed =
                    new_config.telemetry_interval_ms != self.config.telemetry_interval_ms;
                self.config = new_config;
                if telemetry_changed {
                    self.rearm_telemetry(now_ms);
                }
                self.mark_config_dirty(now_ms);
                sink.emit(&AppEvent::ConfigUpdated);
                info!("Configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                if let Some(handle) = self.save_timer.take() {
                    self.timers.clear_timeout(handle);
                }
                self.save_requested = true;
                info!("Explicit config save requested");
            }
            AppCommand::ResetConfig => {
                self.config = SystemConfig::default();
                self.rearm_telemetry(now_ms);
                self.mark_config_dirty(now_ms);
                sink.emit(&AppEvent::ConfigUpdated);
                info!("Configuration reset to defaults");
            }
        }
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified and (re)arm the save debounce: the
    /// pending timeout is cleared and a fresh one armed, so only the
    /// *last* change in a burst starts the quiet period.
    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        self.config_dirty = true;
        if let Some(handle) = self.save_timer.take() {
            self.timers.clear_timeout(handle);
        }
        self.save_timer = Some(self.timers.add_timeout(
            TimerAction::SaveConfig,
            self.config.settings_save_interval_ms,
            now_ms,
        ));
    }

    /// Flush the config if a save is due (debounce elapsed or explicit
    /// request).  Returns `true` if a write happened.  On failure the
    /// request stays pending and is retried on the next call.
    pub fn persist_if_due(
        &mut self,
        storage: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.save_requested {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.save_requested = false;
                self.config_dirty = false;
                sink.emit(&AppEvent::ConfigSaved);
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before shutdown or restart), skipping
    /// the debounce entirely.
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        if let Some(handle) = self.save_timer.take() {
            self.timers.clear_timeout(handle);
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                self.save_requested = false;
                info!("Config force-saved before shutdown");
            }
            Err(e) => warn!("Config force-save failed: {}", e),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry(&self, now_secs: u64) -> TelemetryData {
        TelemetryData {
            temperature_c: self.snapshot.temperature_c,
            humidity_pct: self.snapshot.humidity_pct,
            co2_ppm: self.snapshot.co2_ppm,
            fan_duty_pct: self.fan_duty_pct,
            humidifier_duty_pct: self.humidifier_duty_pct,
            fan_budget: self.fan.budget(now_secs),
            humidifier_budget: self.humidifier.budget(now_secs),
            display: self.snapshot.display_string(),
        }
    }

    /// Budget diagnostics for one actuator.
    pub fn budget(&self, actuator: ActuatorId, now_secs: u64) -> BudgetDiagnostics {
        match actuator {
            ActuatorId::Fan => self.fan.budget(now_secs),
            ActuatorId::Humidifier => self.humidifier.budget(now_secs),
        }
    }

    /// Clone of the live configuration (for read-back or delta updates).
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn alert_interval_ms(&self, kind: AlertKind) -> u64 {
        match kind {
            AlertKind::Temperature => self.config.alert_temperature.interval_ms,
            AlertKind::Humidity => self.config.alert_humidity.interval_ms,
            AlertKind::Co2 => self.config.alert_co2.interval_ms,
        }
    }

    fn rearm_telemetry(&mut self, now_ms: u64) {
        if let Some(handle) = self.telemetry_timer.take() {
            self.timers.clear_interval(handle);
        }
        self.telemetry_timer = Some(self.timers.add_interval(
            TimerAction::Telemetry,
            self.config.telemetry_interval_ms,
            now_ms,
        ));
    }
}
