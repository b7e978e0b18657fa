//! Mask watchface for the PineTime
//!
//! A digital clock hidden behind a face mask. Once per minute the mask slides
//! shut, a pair of eyes lights up, the time is updated underneath, and the
//! mask slides open again.
//!
//! The library is `no_std` and hardware independent: the watchface talks to
//! its host through the traits in [`ui::host`], and [`graphics`] provides a
//! software host rendering into 1-bit framebuffers. The board support lives
//! behind the `firmware` feature.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod error;
pub mod graphics;
#[cfg(feature = "firmware")]
pub mod peripherals;
pub mod system;
pub mod ui;

pub use error::Error;
