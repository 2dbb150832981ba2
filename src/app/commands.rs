//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (provisioning,
//! serial console, tests) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::SystemConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Hot-reload configuration.  Budget windows resize and PWM timers
    /// reprogram on the next control tick; the save debounce re-arms.
    UpdateConfig(SystemConfig),

    /// Flush the current config to NVS on the next persistence check,
    /// bypassing the debounce interval.
    SaveConfig,

    /// Restore factory defaults (persisted via the normal debounce).
    ResetConfig,
}
