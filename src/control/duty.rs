//! Duty-cycle decision engine.
//!
//! One [`DutyScheduler`] per actuator.  Each control tick it takes the
//! configured policy, the live sensor value and the state of its
//! [`TimeWindow`] budget, and produces a [`DutyCommand`] — the duty
//! fraction, the integer PWM level and, when the configured PWM frequency
//! changed since the last tick, a reconfiguration request.  The command is
//! applied to hardware by the service layer; the scheduler itself is pure
//! state and arithmetic, which keeps it testable on the host.
//!
//! The time budget gates every mode except `ForcedOn`: once the actuator
//! has been active for `max_active_secs` within the rolling window it is
//! forced to the inactive branch until the window drains back to zero,
//! plus an optional activation-offset cooldown.

use crate::config::{ActuatorConfig, ControlMode};
use crate::control::window::TimeWindow;

/// PWM timer parameters for a hardware (re)configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
}

/// Outcome of one evaluation tick.
#[derive(Debug, Clone, Copy)]
pub struct DutyCommand {
    /// Duty fraction in [0, 1].
    pub duty: f32,
    /// Integer level in [0, 2^bits − 1] for the LEDC channel.
    pub level: u32,
    /// Duty as a percentage for telemetry.
    pub percent: f32,
    /// `Some` when the PWM timer must be reprogrammed before the level
    /// write (frequency changed since the last tick, or first tick).
    pub reconfigure: Option<PwmConfig>,
}

/// Read-only budget state for the diagnostics surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetDiagnostics {
    pub accumulated_secs: u32,
    pub window_secs: u32,
    pub can_act: bool,
}

/// Linear map of `value` from [src_from, src_to] onto [dst_from, dst_to],
/// clamped to the destination range.  A source range given high-to-low
/// reverses the mapping direction; a zero source range has no gradient
/// and yields `dst_from`.
pub fn map_value(value: f32, src_from: f32, src_to: f32, dst_from: f32, dst_to: f32) -> f32 {
    let reversed = src_from > src_to;
    let (lo, hi) = if reversed { (src_to, src_from) } else { (src_from, src_to) };

    let src_range = hi - lo;
    if src_range == 0.0 {
        return dst_from;
    }

    let k = (dst_to - dst_from) / src_range;
    let (dst_lo, dst_hi) = if dst_from <= dst_to { (dst_from, dst_to) } else { (dst_to, dst_from) };
    let result = (dst_from + (value - lo) * k).clamp(dst_lo, dst_hi);

    if reversed { dst_from + dst_to - result } else { result }
}

/// Per-actuator duty decision state.
pub struct DutyScheduler {
    window: TimeWindow,
    /// Last frequency programmed into the LEDC timer; 0 = never.
    programmed_freq_hz: u32,
    /// Hysteresis latch for `ControlMode::HysteresisWindow`.
    latched_on: bool,
    budget_available: bool,
    /// Earliest second activity may resume after replenishment.
    budget_available_at: u64,
    last_tick: Option<u64>,
}

impl DutyScheduler {
    pub fn new(chunk_secs: u32) -> Self {
        Self {
            window: TimeWindow::new(0, chunk_secs),
            programmed_freq_hz: 0,
            latched_on: false,
            budget_available: false,
            budget_available_at: 0,
            last_tick: None,
        }
    }

    /// Evaluate one control tick.
    ///
    /// `sensor_value` may be NaN when the channel has no reading; every
    /// mode degrades to its inactive branch and the final duty is never
    /// NaN.  Seconds since the previous tick are fed back into the budget
    /// window whenever the resulting duty is above zero.
    pub fn evaluate(&mut self, cfg: &ActuatorConfig, sensor_value: f32, now_secs: u64) -> DutyCommand {
        let reconfigure = (self.programmed_freq_hz != cfg.pwm_frequency_hz).then(|| {
            self.programmed_freq_hz = cfg.pwm_frequency_hz;
            PwmConfig {
                frequency_hz: cfg.pwm_frequency_hz,
                resolution_bits: cfg.pwm_resolution_bits,
            }
        });

        // Window length is configuration; resize is a no-op when the
        // chunk count is unchanged.
        self.window.resize(cfg.active_window_secs);

        if self.budget_available && self.window.accumulated_secs() >= cfg.max_active_secs {
            self.budget_available = false;
            self.budget_available_at = 0;
        } else if !self.budget_available && self.window.accumulated_secs() == 0 {
            self.budget_available = true;
            self.budget_available_at = now_secs + u64::from(cfg.activation_offset_secs);
        }
        let can_act = self.can_act(now_secs);

        let duty = match cfg.mode {
            ControlMode::Proportional => {
                if can_act && sensor_value >= cfg.min_sensor_value {
                    map_value(
                        sensor_value,
                        cfg.min_sensor_value,
                        cfg.max_sensor_value,
                        cfg.min_duty,
                        cfg.max_duty,
                    )
                } else {
                    0.0
                }
            }

            ControlMode::HysteresisWindow => {
                // Band position: 1.0 = fully active end, 0.0 = fully
                // inactive end (reversed ranges included).  NaN compares
                // false on both edges, so a dead sensor never latches.
                let band = map_value(
                    sensor_value,
                    cfg.min_sensor_value,
                    cfg.max_sensor_value,
                    0.0,
                    1.0,
                );
                if !self.latched_on && can_act && band >= 1.0 {
                    self.latched_on = true;
                } else if self.latched_on && (!can_act || band <= 0.0) {
                    self.latched_on = false;
                }

                if self.latched_on { cfg.max_duty } else { cfg.min_duty }
            }

            ControlMode::BudgetSchedule => {
                if can_act { cfg.max_duty } else { cfg.min_duty }
            }

            ControlMode::ForcedOn => cfg.max_duty,

            ControlMode::ForcedOff => 0.0,
        };

        let duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };

        let active_secs = if duty > 0.0 {
            let last = self.last_tick.unwrap_or(now_secs);
            now_secs.saturating_sub(last).min(u64::from(u32::MAX)) as u32
        } else {
            0
        };
        self.window.update(now_secs, active_secs);
        self.last_tick = Some(now_secs);

        DutyCommand {
            duty,
            level: (Self::resolution(cfg.pwm_resolution_bits) as f32 * duty) as u32,
            percent: duty * 100.0,
            reconfigure,
        }
    }

    fn can_act(&self, now_secs: u64) -> bool {
        self.budget_available && now_secs >= self.budget_available_at
    }

    fn resolution(bits: u8) -> u32 {
        (1u32 << u32::from(bits).min(31)) - 1
    }

    /// Budget state for telemetry and diagnostics.
    pub fn budget(&self, now_secs: u64) -> BudgetDiagnostics {
        BudgetDiagnostics {
            accumulated_secs: self.window.accumulated_secs(),
            window_secs: self.window.window_secs(),
            can_act: self.can_act(now_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SensorKind, SystemConfig};

    fn cfg(mode: ControlMode) -> ActuatorConfig {
        ActuatorConfig {
            mode,
            sensor: SensorKind::Co2,
            min_sensor_value: 0.0,
            max_sensor_value: 100.0,
            min_duty: 0.0,
            max_duty: 1.0,
            max_active_secs: 60,
            active_window_secs: 180,
            activation_offset_secs: 0,
            pwm_frequency_hz: 25_000,
            pwm_resolution_bits: 8,
        }
    }

    // ── map_value ─────────────────────────────────────────────

    #[test]
    fn map_value_linear_and_clamped() {
        assert_eq!(map_value(50.0, 0.0, 100.0, 0.0, 1.0), 0.5);
        assert_eq!(map_value(150.0, 0.0, 100.0, 0.0, 1.0), 1.0);
        assert_eq!(map_value(-10.0, 0.0, 100.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn map_value_reversed_range() {
        // 60 → 40 band: drier air maps toward the active end.
        assert_eq!(map_value(40.0, 60.0, 40.0, 0.0, 1.0), 1.0);
        assert_eq!(map_value(60.0, 60.0, 40.0, 0.0, 1.0), 0.0);
        assert_eq!(map_value(50.0, 60.0, 40.0, 0.0, 1.0), 0.5);
    }

    #[test]
    fn map_value_zero_range_has_no_gradient() {
        assert_eq!(map_value(42.0, 10.0, 10.0, 0.2, 0.9), 0.2);
    }

    #[test]
    fn map_value_nan_propagates() {
        assert!(map_value(f32::NAN, 0.0, 100.0, 0.0, 1.0).is_nan());
    }

    // ── Proportional ──────────────────────────────────────────

    #[test]
    fn proportional_maps_sensor_to_duty() {
        let mut s = DutyScheduler::new(60);
        let c = cfg(ControlMode::Proportional);

        let cmd = s.evaluate(&c, 50.0, 0);
        assert_eq!(cmd.duty, 0.5);
        assert_eq!(cmd.level, 127);
        assert_eq!(cmd.percent, 50.0);

        let cmd = s.evaluate(&c, 150.0, 1);
        assert_eq!(cmd.duty, 1.0);
        assert_eq!(cmd.level, 255);
    }

    #[test]
    fn proportional_below_min_is_off() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::Proportional);
        c.min_sensor_value = 20.0;
        assert_eq!(s.evaluate(&c, 10.0, 0).duty, 0.0);
    }

    #[test]
    fn nan_sensor_yields_zero_duty() {
        let mut s = DutyScheduler::new(60);
        let c = cfg(ControlMode::Proportional);
        let cmd = s.evaluate(&c, f32::NAN, 0);
        assert_eq!(cmd.duty, 0.0);
        assert_eq!(cmd.level, 0);
    }

    // ── Hysteresis ────────────────────────────────────────────

    #[test]
    fn hysteresis_latches_on_and_off() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::HysteresisWindow);
        c.min_duty = 0.1;
        c.max_duty = 0.9;

        // Inside the band: stays at minimum.
        assert_eq!(s.evaluate(&c, 50.0, 0).duty, 0.1);
        // Crosses the active end: latches on.
        assert_eq!(s.evaluate(&c, 100.0, 1).duty, 0.9);
        // Back inside the band: latch holds.
        assert_eq!(s.evaluate(&c, 50.0, 2).duty, 0.9);
        // Past the inactive end: latch drops.
        assert_eq!(s.evaluate(&c, -5.0, 3).duty, 0.1);
    }

    #[test]
    fn hysteresis_drops_latch_when_budget_runs_out() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::HysteresisWindow);
        c.max_active_secs = 5;

        s.evaluate(&c, 100.0, 0);
        for t in 1..=5 {
            s.evaluate(&c, 100.0, t);
        }
        // 5 active seconds accumulated: budget exhausted, latch released.
        let cmd = s.evaluate(&c, 100.0, 6);
        assert_eq!(cmd.duty, c.min_duty);
        assert!(!s.budget(6).can_act);
    }

    #[test]
    fn hysteresis_nan_keeps_latch_until_budget_drops() {
        let mut s = DutyScheduler::new(60);
        let c = cfg(ControlMode::HysteresisWindow);

        s.evaluate(&c, 100.0, 0);
        let cmd = s.evaluate(&c, f32::NAN, 1);
        assert_eq!(cmd.duty, c.max_duty);
    }

    // ── Budget schedule / forced modes ────────────────────────

    #[test]
    fn budget_schedule_runs_until_budget_exhausted() {
        let mut s = DutyScheduler::new(60);
        let c = cfg(ControlMode::BudgetSchedule);

        // Runs at max regardless of the (absent) sensor value.
        for t in 0..=60 {
            let cmd = s.evaluate(&c, f32::NAN, t);
            assert_eq!(cmd.duty, 1.0, "tick {t}");
        }
        // 60 active seconds reached: forced to the inactive branch.
        let cmd = s.evaluate(&c, f32::NAN, 61);
        assert_eq!(cmd.duty, 0.0);
        assert!(!s.budget(61).can_act);

        // One full window with no activity drains the accumulator.
        let mut t = 61;
        while s.budget(t).accumulated_secs > 0 {
            t += 60;
            s.evaluate(&c, f32::NAN, t);
        }
        assert!(t - 61 <= 240, "window should drain within ~one window length");
        let cmd = s.evaluate(&c, f32::NAN, t + 1);
        assert_eq!(cmd.duty, 1.0);
    }

    #[test]
    fn forced_on_ignores_budget() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::ForcedOn);
        c.max_active_secs = 5;
        c.max_duty = 0.7;

        for t in 0..30 {
            assert_eq!(s.evaluate(&c, f32::NAN, t).duty, 0.7);
        }
    }

    #[test]
    fn forced_off_is_always_zero() {
        let mut s = DutyScheduler::new(60);
        let c = cfg(ControlMode::ForcedOff);
        assert_eq!(s.evaluate(&c, 100.0, 0).duty, 0.0);
    }

    // ── Budget state machine ──────────────────────────────────

    #[test]
    fn activation_offset_delays_resumption() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::BudgetSchedule);
        c.max_active_secs = 2;
        c.activation_offset_secs = 30;

        // First tick replenishes the (empty) budget and starts the offset.
        assert_eq!(s.evaluate(&c, f32::NAN, 0).duty, 0.0);
        assert!(!s.budget(0).can_act);

        // Offset elapsed: may act.
        assert_eq!(s.evaluate(&c, f32::NAN, 30).duty, 1.0);
    }

    #[test]
    fn budget_replenishes_only_at_zero() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::BudgetSchedule);
        c.max_active_secs = 60;

        for t in 0..=61 {
            s.evaluate(&c, f32::NAN, t);
        }
        assert!(!s.budget(61).can_act);

        // Partial drain is not enough: the window still holds seconds.
        s.evaluate(&c, f32::NAN, 121);
        assert!(s.budget(121).accumulated_secs > 0);
        assert!(!s.budget(121).can_act);
    }

    // ── PWM reconfiguration ───────────────────────────────────

    #[test]
    fn reconfigures_pwm_only_when_frequency_changes() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::ForcedOff);

        let cmd = s.evaluate(&c, 0.0, 0);
        assert_eq!(
            cmd.reconfigure,
            Some(PwmConfig { frequency_hz: 25_000, resolution_bits: 8 })
        );

        assert!(s.evaluate(&c, 0.0, 1).reconfigure.is_none());

        c.pwm_frequency_hz = 10_000;
        let cmd = s.evaluate(&c, 0.0, 2);
        assert_eq!(cmd.reconfigure.map(|p| p.frequency_hz), Some(10_000));
    }

    #[test]
    fn window_resizes_when_config_changes() {
        let mut s = DutyScheduler::new(60);
        let mut c = cfg(ControlMode::ForcedOn);

        s.evaluate(&c, 0.0, 0);
        assert_eq!(s.budget(0).window_secs, 180);

        c.active_window_secs = 600;
        s.evaluate(&c, 0.0, 1);
        assert_eq!(s.budget(1).window_secs, 600);
    }

    #[test]
    fn default_config_modes_evaluate() {
        // Smoke-check both stock actuator configs.
        let sys = SystemConfig::default();
        let mut fan = DutyScheduler::new(60);
        let mut hum = DutyScheduler::new(60);

        let cmd = fan.evaluate(&sys.fan, 1_000.0, 0);
        assert!(cmd.duty > 0.0 && cmd.duty < 1.0);

        // First tick arms the 30 s activation offset; once it elapses,
        // 35 % RH is past the active end of the reversed band.
        hum.evaluate(&sys.humidifier, 50.0, 0);
        let cmd = hum.evaluate(&sys.humidifier, 35.0, 31);
        assert_eq!(cmd.duty, sys.humidifier.max_duty);
    }
}
