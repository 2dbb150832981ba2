//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and refreshes a cached
//! [`ClimateSnapshot`] on its own cadence (sensor reads are slower than
//! the control tick).  A channel with no usable reading is NaN in the
//! snapshot; the duty schedulers treat NaN as "stay inactive", so a dead
//! or warming-up sensor can never drive an actuator.

pub mod co2;
pub mod humidity;
pub mod temperature;

use core::fmt::Write as _;

use log::debug;

use crate::config::{SensorKind, SystemConfig};
use crate::error::SensorError;
use co2::Co2Sensor;
use humidity::HumiditySensor;
use temperature::TemperatureSensor;

/// A point-in-time snapshot of the climate channels.  NaN = no reading.
#[derive(Debug, Clone, Copy)]
pub struct ClimateSnapshot {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub co2_ppm: f32,
}

impl Default for ClimateSnapshot {
    fn default() -> Self {
        Self {
            temperature_c: f32::NAN,
            humidity_pct: f32::NAN,
            co2_ppm: f32::NAN,
        }
    }
}

impl ClimateSnapshot {
    /// Value of one channel; NaN when the channel has no reading.
    pub fn value(&self, kind: SensorKind) -> f32 {
        match kind {
            SensorKind::Temperature => self.temperature_c,
            SensorKind::Humidity => self.humidity_pct,
            SensorKind::Co2 => self.co2_ppm,
        }
    }

    /// True once at least one channel has produced a reading.
    pub fn ready(&self) -> bool {
        !self.temperature_c.is_nan() || !self.humidity_pct.is_nan() || !self.co2_ppm.is_nan()
    }

    /// Apply the per-channel calibration offsets from the configuration.
    /// NaN channels stay NaN.
    pub fn apply_calibration(&mut self, config: &SystemConfig) {
        self.temperature_c += config.temperature_calibration_c;
        self.humidity_pct += config.humidity_calibration_pct;
        self.co2_ppm += config.co2_calibration_ppm;
    }

    /// Compact one-line rendering for logs and the status display,
    /// e.g. `23.5 C  1.2k ppm  45 %`.
    pub fn display_string(&self) -> heapless::String<48> {
        let mut out = heapless::String::new();
        if !self.ready() {
            let _ = out.push_str("NO DATA");
            return out;
        }

        let _ = write!(out, "{:.1} C  ", self.temperature_c);
        if !self.co2_ppm.is_nan() && self.co2_ppm >= 1_000.0 {
            let k = self.co2_ppm / 1_000.0;
            if k - k.floor() > 0.06 {
                let _ = write!(out, "{k:.1}k ppm  ");
            } else {
                let _ = write!(out, "{k:.0}k ppm  ");
            }
        } else {
            let _ = write!(out, "{:.0} ppm  ", self.co2_ppm);
        }
        let _ = write!(out, "{:.0} %", self.humidity_pct);
        out
    }
}

/// Aggregates all sensor drivers and caches the latest snapshot.
pub struct SensorHub {
    temperature: TemperatureSensor,
    humidity: HumiditySensor,
    co2: Co2Sensor,
    latest: ClimateSnapshot,
}

impl SensorHub {
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(temperature: TemperatureSensor, humidity: HumiditySensor, co2: Co2Sensor) -> Self {
        Self {
            temperature,
            humidity,
            co2,
            latest: ClimateSnapshot::default(),
        }
    }

    /// Read every sensor and refresh the cached snapshot.
    ///
    /// Individual read failures are logged at debug level and leave the
    /// channel at NaN — a single flaky sensor must not disturb the
    /// control loop.
    pub fn refresh(&mut self, uptime_secs: u64) -> ClimateSnapshot {
        self.latest = ClimateSnapshot {
            temperature_c: channel("temperature", self.temperature.read()),
            humidity_pct: channel("humidity", self.humidity.read()),
            co2_ppm: channel("co2", self.co2.read(uptime_secs)),
        };
        self.latest
    }

    /// Latest cached snapshot (all NaN until the first refresh).
    pub fn snapshot(&self) -> ClimateSnapshot {
        self.latest
    }
}

fn channel(name: &str, reading: Result<f32, SensorError>) -> f32 {
    match reading {
        Ok(value) => value,
        Err(e) => {
            debug!("sensors: {name}: {e}");
            f32::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_defaults_to_no_readings() {
        let snap = ClimateSnapshot::default();
        assert!(!snap.ready());
        assert!(snap.value(SensorKind::Co2).is_nan());
        assert_eq!(snap.display_string(), "NO DATA");
    }

    #[test]
    fn display_string_formats_co2_in_thousands() {
        let snap = ClimateSnapshot {
            temperature_c: 23.46,
            humidity_pct: 45.2,
            co2_ppm: 1_230.0,
        };
        assert_eq!(snap.display_string(), "23.5 C  1.2k ppm  45 %");

        let snap = ClimateSnapshot { co2_ppm: 2_010.0, ..snap };
        assert_eq!(snap.display_string(), "23.5 C  2k ppm  45 %");

        let snap = ClimateSnapshot { co2_ppm: 640.0, ..snap };
        assert_eq!(snap.display_string(), "23.5 C  640 ppm  45 %");
    }

    #[test]
    fn calibration_offsets_apply() {
        let config = SystemConfig::default();
        let mut snap = ClimateSnapshot {
            temperature_c: 25.0,
            humidity_pct: f32::NAN,
            co2_ppm: 800.0,
        };
        snap.apply_calibration(&config);
        assert!((snap.temperature_c - (25.0 + config.temperature_calibration_c)).abs() < 1e-6);
        assert!(snap.humidity_pct.is_nan());
    }
}
