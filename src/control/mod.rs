//! Actuator control core — budget accumulation and duty decisions.
//!
//! [`window::TimeWindow`] tracks active seconds over a rolling window;
//! [`duty::DutyScheduler`] turns a sensor value, a control mode and the
//! window's budget state into a PWM duty command each tick.

pub mod duty;
pub mod window;
