//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the ClimaBox system: the configuration
//! is serialised to a `postcard` blob and stored under a single NVS key.
//! All fields are range-checked before persistence — invalid values are
//! rejected, not clamped.
//!
//! On non-espidf targets the backend is an in-memory map so the adapter
//! (and everything above it) runs in host tests.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{ActuatorConfig, AlertConfig, SystemConfig};
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "climabox";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"syscfg\0";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

fn validate_actuator(a: &ActuatorConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&a.min_duty) || !(0.0..=1.0).contains(&a.max_duty) {
        return Err(ConfigError::ValidationFailed("duty values must be 0.0–1.0"));
    }
    if a.min_duty > a.max_duty {
        return Err(ConfigError::ValidationFailed("min_duty must be <= max_duty"));
    }
    if !a.min_sensor_value.is_finite() || !a.max_sensor_value.is_finite() {
        return Err(ConfigError::ValidationFailed("sensor range must be finite"));
    }
    if !(1..=14).contains(&a.pwm_resolution_bits) {
        return Err(ConfigError::ValidationFailed("pwm_resolution_bits must be 1–14"));
    }
    if !(10..=150_000).contains(&a.pwm_frequency_hz) {
        return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be 10–150000"));
    }
    if !(60..=86_400).contains(&a.active_window_secs) {
        return Err(ConfigError::ValidationFailed("active_window_secs must be 60–86400"));
    }
    if a.max_active_secs > a.active_window_secs {
        return Err(ConfigError::ValidationFailed(
            "max_active_secs must be <= active_window_secs",
        ));
    }
    if a.activation_offset_secs > 3_600 {
        return Err(ConfigError::ValidationFailed("activation_offset_secs must be <= 3600"));
    }
    Ok(())
}

fn validate_alert(a: &AlertConfig) -> Result<(), ConfigError> {
    if a.interval_ms < 1_000 {
        return Err(ConfigError::ValidationFailed("alert interval_ms must be >= 1000"));
    }
    if !a.min.is_finite() || !a.max.is_finite() || a.min > a.max {
        return Err(ConfigError::ValidationFailed("alert range must be finite with min <= max"));
    }
    Ok(())
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    validate_actuator(&cfg.fan)?;
    validate_actuator(&cfg.humidifier)?;
    validate_alert(&cfg.alert_temperature)?;
    validate_alert(&cfg.alert_humidity)?;
    validate_alert(&cfg.alert_co2)?;

    for cal in [
        cfg.temperature_calibration_c,
        cfg.humidity_calibration_pct,
        cfg.co2_calibration_ppm,
    ] {
        if !cal.is_finite() {
            return Err(ConfigError::ValidationFailed("calibration offsets must be finite"));
        }
    }
    if !(100..=60_000).contains(&cfg.sensor_read_interval_ms) {
        return Err(ConfigError::ValidationFailed("sensor_read_interval_ms must be 100–60000"));
    }
    if !(100..=5_000).contains(&cfg.control_loop_interval_ms) {
        return Err(ConfigError::ValidationFailed("control_loop_interval_ms must be 100–5000"));
    }
    if !(1_000..=3_600_000).contains(&cfg.telemetry_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_ms must be 1000–3600000",
        ));
    }
    if !(1_000..=600_000).contains(&cfg.settings_save_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "settings_save_interval_ms must be 1000–600000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY);
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let cfg = SystemConfig::default();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn rejects_duty_above_one() {
        let mut cfg = SystemConfig::default();
        cfg.fan.max_duty = 1.5;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_inverted_duty_range() {
        let mut cfg = SystemConfig::default();
        cfg.humidifier.min_duty = 0.9;
        cfg.humidifier.max_duty = 0.2;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_budget_exceeding_window() {
        let mut cfg = SystemConfig::default();
        cfg.fan.max_active_secs = cfg.fan.active_window_secs + 1;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_nan_sensor_range() {
        let mut cfg = SystemConfig::default();
        cfg.fan.min_sensor_value = f32::NAN;
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn save_load_roundtrip() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.fan.pwm_frequency_hz = 12_345;
        nvs.save(&cfg).unwrap();

        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.fan.pwm_frequency_hz, 12_345);
    }

    #[test]
    fn load_without_store_returns_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        let loaded = nvs.load().unwrap();
        assert_eq!(
            loaded.fan.pwm_frequency_hz,
            SystemConfig::default().fan.pwm_frequency_hz
        );
    }

    #[test]
    fn invalid_config_is_never_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.fan.pwm_resolution_bits = 0;
        assert!(nvs.save(&cfg).is_err());

        // The store is still empty: load falls back to defaults.
        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.fan.pwm_resolution_bits, 8);
    }
}
