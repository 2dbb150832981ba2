//! Hardware peripheral access.
//!
//! ADC channel setup plus the LEDC helpers used by the PWM channels,
//! using raw ESP-IDF sys calls.  `init_peripherals()` is called once from
//! `main()` before the event loop starts; the LEDC timers are *not* set
//! up there — each actuator's first duty evaluation emits a reconfigure
//! command carrying its configured frequency, and the PWM channel
//! programs the timer then (and again whenever the frequency changes at
//! runtime).

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe {
        init_adc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

pub const ADC1_CH_HUMIDITY: u32 = 5;
pub const ADC1_CH_CO2: u32 = 6;
pub const ADC1_CH_TEMP: u32 = 8;

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.  No concurrent access is possible because
/// `init_adc()` completes before the event loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for channel in [ADC1_CH_HUMIDITY, ADC1_CH_CO2, ADC1_CH_TEMP] {
        // SAFETY: handle valid per adc1_handle() contract.
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }

    info!("hw_init: ADC1 configured (CH5=humidity, CH6=co2, CH8=temp)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE is written once during init_adc() before this
    // function is called; single-threaded main-loop access guaranteed.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    0
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// Program (or reprogram) a LEDC timer and bind a channel + GPIO to it.
/// Safe to call repeatedly — a frequency change while the channel runs
/// glitches one period at worst, which the actuators tolerate.
#[cfg(target_os = "espidf")]
pub fn ledc_configure(
    timer: u32,
    channel: u32,
    gpio: i32,
    freq_hz: u32,
    resolution_bits: u8,
) -> Result<(), HwInitError> {
    // SAFETY: LEDC register writes from the single main-loop context.
    unsafe {
        let timer_cfg = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: timer,
            duty_resolution: u32::from(resolution_bits),
            freq_hz,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        let ret = ledc_timer_config(&timer_cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }

        let channel_cfg = ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: timer,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        };
        let ret = ledc_channel_config(&channel_cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    info!(
        "hw_init: LEDC timer {} -> {} Hz / {} bit (ch {}, gpio {})",
        timer, freq_hz, resolution_bits, channel, gpio
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_configure(
    _timer: u32,
    _channel: u32,
    _gpio: i32,
    _freq_hz: u32,
    _resolution_bits: u8,
) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, level: u32) {
    // SAFETY: the channel was configured via ledc_configure(); duty
    // register writes are race-free since only the main loop calls this.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, level);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _level: u32) {}
