//! NTC thermistor temperature sensor (10 kOhm @ 25 C, B = 3950).
//!
//! Wired in a voltage-divider with a fixed 10 kOhm resistor, read via
//! the ESP32-S3 ADC. The simplified Beta (Steinhart-Hart) equation
//! converts resistance to temperature.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH8 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static AtomicU16 for injection.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp_adc(raw: u16) {
    SIM_TEMP_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

pub struct TemperatureSensor {
    _adc_gpio: i32,
}

impl TemperatureSensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self { _adc_gpio: adc_gpio }
    }

    /// Read the probe temperature in °C.
    ///
    /// A reading pinned to either supply rail means the divider is open
    /// or shorted (probe unplugged) — reported as `OutOfRange`, which the
    /// hub degrades to "no reading".
    pub fn read(&self) -> Result<f32, SensorError> {
        let raw = self.read_adc();
        let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
        if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
            return Err(SensorError::OutOfRange);
        }

        let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
        let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
        if inv_t <= 0.0 {
            return Err(SensorError::OutOfRange);
        }
        Ok((1.0 / inv_t) - 273.15)
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_TEMP)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_TEMP_ADC.load(Ordering::Relaxed)
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    // Single test: the injection atomic is shared process state.
    #[test]
    fn conversion_and_rail_detection() {
        let sensor = TemperatureSensor::new(0);

        // Equal divider legs = 10 kOhm = 25 C by definition.
        sim_set_temp_adc(2048);
        let t = sensor.read().unwrap();
        assert!((t - 25.0).abs() < 1.0, "got {t}");

        sim_set_temp_adc(0);
        assert_eq!(sensor.read(), Err(SensorError::OutOfRange));
        sim_set_temp_adc(4095);
        assert_eq!(sensor.read(), Err(SensorError::OutOfRange));
        sim_set_temp_adc(2048);
    }
}
