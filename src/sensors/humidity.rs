//! HIH-4030 analog relative-humidity sensor.
//!
//! Near-linear voltage output; the datasheet transfer function at 25 C is
//! `Vout = Vsupply * (0.0062 * RH + 0.16)`.  Read via the ESP32-S3 ADC
//! behind a divider that scales the 5 V sensor supply into ADC range.
//!
//! Dual-target like the other sensors: real ADC on ESP-IDF, injected
//! atomic on the host.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

static SIM_HUMIDITY_ADC: AtomicU16 = AtomicU16::new(1862);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_humidity_adc(raw: u16) {
    SIM_HUMIDITY_ADC.store(raw, Ordering::Relaxed);
}

const ADC_MAX: f32 = 4095.0;
/// Sensor supply rail as seen after the input divider.
const V_SUPPLY: f32 = 3.3;
const ZERO_OFFSET: f32 = 0.16;
const SLOPE_PER_RH: f32 = 0.0062;

pub struct HumiditySensor {
    _adc_gpio: i32,
}

impl HumiditySensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self { _adc_gpio: adc_gpio }
    }

    /// Read relative humidity in percent, clamped to [0, 100].
    pub fn read(&self) -> Result<f32, SensorError> {
        let raw = self.read_adc();
        let voltage = (f32::from(raw) / ADC_MAX) * V_SUPPLY;
        if voltage <= 0.01 || voltage >= (V_SUPPLY - 0.01) {
            return Err(SensorError::OutOfRange);
        }

        let rh = (voltage / V_SUPPLY - ZERO_OFFSET) / SLOPE_PER_RH;
        Ok(rh.clamp(0.0, 100.0))
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_HUMIDITY)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_HUMIDITY_ADC.load(Ordering::Relaxed)
    }
}
