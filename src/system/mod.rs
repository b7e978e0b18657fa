#[cfg(feature = "firmware")]
pub mod config;
pub mod time;
