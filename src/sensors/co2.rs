//! NDIR CO2 module, analog output.
//!
//! The module maps 0 – 5000 ppm onto a 0.4 – 2.0 V output.  Like most
//! NDIR cells it needs a warm-up period after power-on before the lamp
//! and detector stabilise; readings before that are not meaningful and
//! are reported as `WarmingUp`.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

static SIM_CO2_ADC: AtomicU16 = AtomicU16::new(800);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_co2_adc(raw: u16) {
    SIM_CO2_ADC.store(raw, Ordering::Relaxed);
}

const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;
/// Output voltage at 0 ppm.
const V_ZERO: f32 = 0.4;
/// Output voltage at full scale.
const V_SPAN: f32 = 2.0;
const PPM_FULL_SCALE: f32 = 5_000.0;

/// Seconds after power-on before NDIR readings are trusted.
const WARMUP_SECS: u64 = 180;

pub struct Co2Sensor {
    _adc_gpio: i32,
}

impl Co2Sensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self { _adc_gpio: adc_gpio }
    }

    /// Read the CO2 concentration in ppm.
    ///
    /// `uptime_secs` gates the warm-up period; an output below the 0 ppm
    /// baseline after warm-up means the cell is still unstable or
    /// disconnected.
    pub fn read(&self, uptime_secs: u64) -> Result<f32, SensorError> {
        if uptime_secs < WARMUP_SECS {
            return Err(SensorError::WarmingUp);
        }

        let raw = self.read_adc();
        let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
        if voltage < V_ZERO {
            return Err(SensorError::OutOfRange);
        }

        let ppm = (voltage - V_ZERO) / (V_SPAN - V_ZERO) * PPM_FULL_SCALE;
        Ok(ppm.min(PPM_FULL_SCALE))
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_CO2)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_CO2_ADC.load(Ordering::Relaxed)
    }
}
