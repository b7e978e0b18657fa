//! Clock string formatting

use core::fmt;

use chrono::Timelike;

/// Length of a formatted clock string
pub const CLOCK_LEN: usize = 5;

/// Fixed width `HH:MM` string
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ClockString {
    buf: [u8; CLOCK_LEN],
}

impl ClockString {
    pub fn as_str(&self) -> &str {
        // Only ever written with ASCII digits and a colon
        core::str::from_utf8(&self.buf).unwrap_or("--:--")
    }
}

impl Default for ClockString {
    fn default() -> Self {
        Self { buf: *b"00:00" }
    }
}

impl fmt::Debug for ClockString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ClockString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for ClockString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ClockString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClockString {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Format hours and minutes of `time` as `HH:MM`.
///
/// The 12 hour style keeps the zero padding (`01`–`12`) and has no AM/PM
/// suffix, so the result is always five characters wide.
pub fn format_clock<T: Timelike>(time: &T, is_24h: bool) -> ClockString {
    let hour = if is_24h { time.hour() } else { time.hour12().1 };
    let mut clock = ClockString::default();
    if format_no_std::show(
        &mut clock.buf,
        format_args!("{:02}:{:02}", hour, time.minute()),
    )
    .is_err()
    {
        warn!("Clock string overflow");
    }
    clock
}
