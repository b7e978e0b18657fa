//! Backlight control
//!
//! Implementation based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/backlight.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use embassy_nrf::gpio::{AnyPin, Output};

/// Highest brightness level
pub const MAX_BRIGHTNESS: u8 = 7;

/// Control the backlight.
///
/// There are three active-low backlight pins, each connected to a FET that
/// toggles backlight power through a resistor.
///
/// - Low: 2.2 kΩ
/// - Mid: 100 Ω
/// - High: 30 Ω
///
/// Through combinations of these pins, 7 brightness levels (+ off) can be
/// configured.
pub struct Backlight<'a> {
    low: Output<'a, AnyPin>,
    mid: Output<'a, AnyPin>,
    high: Output<'a, AnyPin>,

    /// The current brightness level (value between 0 and 7).
    brightness: u8,
}

impl<'a> Backlight<'a> {
    /// Take the backlight pins, starting with the backlight off.
    pub fn init(low: Output<'a, AnyPin>, mid: Output<'a, AnyPin>, high: Output<'a, AnyPin>) -> Self {
        let mut backlight = Self {
            low,
            mid,
            high,
            brightness: 0,
        };
        backlight.off();
        backlight
    }

    /// Set the brightness level between 0 (off) and 7 (max brightness).
    pub fn set(&mut self, brightness: u8) -> Result<(), Error> {
        if brightness > MAX_BRIGHTNESS {
            return Err(Error::OutOfBounds);
        }
        debug!("Setting backlight brightness to {}", brightness);

        for (bit, pin) in [&mut self.low, &mut self.mid, &mut self.high]
            .into_iter()
            .enumerate()
        {
            if brightness & (1 << bit) > 0 {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
        self.brightness = brightness;
        Ok(())
    }

    /// Turn off the backlight.
    pub fn off(&mut self) {
        for pin in [&mut self.low, &mut self.mid, &mut self.high] {
            pin.set_high();
        }
        self.brightness = 0;
    }

    /// Return the current brightness level (value between 0 and 7).
    pub fn brightness(&self) -> u8 {
        self.brightness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error {
    OutOfBounds,
}
