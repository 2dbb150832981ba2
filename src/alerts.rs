//! Out-of-range alerting with per-channel pacing.
//!
//! Each sensor channel has a configured comfort band; leaving it raises
//! an alert, but at most once per configured interval — the pacing
//! window is armed on the deferred timer registry by the service, which
//! calls [`AlertEngine::window_elapsed`] when it fires.
//!
//! The engine is deliberately decoupled from the timer queue and the
//! event sink: `check` just reports which alerts fired this tick, the
//! service owns the plumbing.  This keeps the engine independently
//! testable.

use crate::config::{AlertConfig, SystemConfig};
use crate::sensors::ClimateSnapshot;

/// Alertable sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Temperature,
    Humidity,
    Co2,
}

const ALERT_COUNT: usize = 3;

impl AlertKind {
    const ALL: [Self; ALERT_COUNT] = [Self::Temperature, Self::Humidity, Self::Co2];

    fn index(self) -> usize {
        match self {
            Self::Temperature => 0,
            Self::Humidity => 1,
            Self::Co2 => 2,
        }
    }

    fn config(self, config: &SystemConfig) -> &AlertConfig {
        match self {
            Self::Temperature => &config.alert_temperature,
            Self::Humidity => &config.alert_humidity,
            Self::Co2 => &config.alert_co2,
        }
    }

    fn value(self, snapshot: &ClimateSnapshot) -> f32 {
        match self {
            Self::Temperature => snapshot.temperature_c,
            Self::Humidity => snapshot.humidity_pct,
            Self::Co2 => snapshot.co2_ppm,
        }
    }
}

/// Tracks which channels are inside their pacing window.
pub struct AlertEngine {
    suppressed: [bool; ALERT_COUNT],
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            suppressed: [false; ALERT_COUNT],
        }
    }

    /// Evaluate every enabled alert against the snapshot.  Returns the
    /// channels that newly fired this tick (each then enters its pacing
    /// window until [`window_elapsed`](Self::window_elapsed)).
    ///
    /// A NaN channel never alerts — "sensor missing" is not
    /// "out of range".
    pub fn check(
        &mut self,
        snapshot: &ClimateSnapshot,
        config: &SystemConfig,
    ) -> heapless::Vec<(AlertKind, f32), ALERT_COUNT> {
        let mut fired = heapless::Vec::new();

        for kind in AlertKind::ALL {
            let cfg = kind.config(config);
            if !cfg.enabled || self.suppressed[kind.index()] {
                continue;
            }

            let value = kind.value(snapshot);
            if value < cfg.min || value > cfg.max {
                self.suppressed[kind.index()] = true;
                let _ = fired.push((kind, value));
            }
        }

        fired
    }

    /// The pacing window for `kind` elapsed; the channel may alert again.
    pub fn window_elapsed(&mut self, kind: AlertKind) {
        self.suppressed[kind.index()] = false;
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}
