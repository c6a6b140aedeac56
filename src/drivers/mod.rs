//! Output drivers.

pub mod led_patterns;
