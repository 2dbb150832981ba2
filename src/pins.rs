//! GPIO / peripheral pin assignments for the ClimaBox main board.
//!
//! Single source of truth — every driver references this module rather
//! than hard-coding pin numbers.  Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Actuators — LEDC PWM
// ---------------------------------------------------------------------------

/// Exhaust fan MOSFET gate (4-wire fan PWM input on the Pro board).
pub const FAN_PWM_GPIO: i32 = 11;
/// Ultrasonic humidifier driver enable, PWM-dimmed.
pub const HUMIDIFIER_PWM_GPIO: i32 = 12;

/// LEDC timer / channel assignments.  Each actuator owns a timer so its
/// frequency can be reprogrammed at runtime without disturbing the other.
pub const LEDC_TIMER_FAN: u32 = 0;
pub const LEDC_CH_FAN: u32 = 0;
pub const LEDC_TIMER_HUMIDIFIER: u32 = 1;
pub const LEDC_CH_HUMIDIFIER: u32 = 1;

// ---------------------------------------------------------------------------
// Sensors — Analog (ADC1)
// ---------------------------------------------------------------------------

/// NTC thermistor — 10 kΩ @ 25 °C, voltage-divider to ADC.
/// ADC1 channel 8 (GPIO 9 on ESP32-S3).
pub const TEMP_ADC_GPIO: i32 = 9;

/// HIH-4030 analog relative-humidity sensor.
/// ADC1 channel 5 (GPIO 6 on ESP32-S3).
pub const HUMIDITY_ADC_GPIO: i32 = 6;

/// NDIR CO2 module, analog output (0.4 – 2 V ≙ 0 – 5000 ppm).
/// ADC1 channel 6 (GPIO 7 on ESP32-S3).
pub const CO2_ADC_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// I²C bus (future expansion: SHT4x, OLED, etc.)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;
