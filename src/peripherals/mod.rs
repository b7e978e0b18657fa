//! PineTime board support used by the firmware

pub mod backlight;
pub mod display;
