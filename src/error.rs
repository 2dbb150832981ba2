#![allow(dead_code)] // Top-level funnel reserved for typed port returns

//! Unified error types for the ClimaBox firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level control loop's error handling uniform.  All variants are
//! `Copy` so they can be passed around without allocation.
//!
//! The control core itself (duty schedulers, time windows, the timer
//! registry) never fails visibly — a missing sensor reading degrades to
//! duty 0 and an invalid timer handle is ignored.  These types cover the
//! paths that *can* fail: peripheral access, initialisation and
//! configuration loading.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Why a sensor channel has no usable reading this tick.  The hub maps
/// any of these to a NaN snapshot value, which the duty schedulers treat
/// as "inactive" — sensor trouble is never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Reading is outside the physically plausible range (open or
    /// shorted divider, disconnected probe).
    OutOfRange,
    /// Sensor requires warm-up time before readings are valid.
    WarmingUp,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::WarmingUp => write!(f, "sensor warming up"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// LEDC timer/channel reconfiguration failed.
    PwmConfigFailed,
    /// PWM duty-level write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmConfigFailed => write!(f, "PWM reconfigure failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
