//! Time keeping module for PineTime

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike};
use embassy_time::{Duration, Instant};

use crate::ui::host::Clock;

/// Wall clock time at a known system instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    /// Clock time
    time: NaiveDateTime,
    /// Related system time
    instant: Instant,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: NaiveDateTime::UNIX_EPOCH,
            instant: Instant::from_ticks(0),
        }
    }
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime, instant: Instant) -> Self {
        Self { time, instant }
    }

    /// Create new time reference from seconds since the Unix epoch, falling
    /// back to the epoch itself when out of range
    pub fn from_timestamp(secs: i64, instant: Instant) -> Self {
        let time = DateTime::from_timestamp(secs, 0)
            .map(|utc| utc.naive_utc())
            .unwrap_or_else(|| {
                warn!("Timestamp {} out of range", secs);
                NaiveDateTime::UNIX_EPOCH
            });
        Self { time, instant }
    }
}

/// Derives UTC and local time from a reference and the system clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeManager {
    reference: TimeReference,
    /// Local time minus UTC
    utc_offset: TimeDelta,
}

impl TimeManager {
    /// Initialize time measurement on boot
    pub fn init(utc_offset_secs: i32) -> Self {
        Self {
            reference: TimeReference::default(),
            utc_offset: TimeDelta::seconds(i64::from(utc_offset_secs)),
        }
    }

    pub fn with_reference(mut self, reference: TimeReference) -> Self {
        self.set_time(reference);
        self
    }

    /// Update time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        debug!("Time reference set to {}", reference.time.and_utc().timestamp());
        self.reference = reference;
    }

    /// UTC time at `now`. Instants before the reference read as the reference.
    pub fn utc(&self, now: Instant) -> NaiveDateTime {
        let elapsed = now
            .checked_duration_since(self.reference.instant)
            .unwrap_or(Duration::from_ticks(0));
        let elapsed = TimeDelta::microseconds(elapsed.as_micros() as i64);
        self.reference
            .time
            .checked_add_signed(elapsed)
            .unwrap_or(self.reference.time)
    }

    /// Local time at `now`
    pub fn local(&self, now: Instant) -> NaiveDateTime {
        let utc = self.utc(now);
        utc.checked_add_signed(self.utc_offset).unwrap_or(utc)
    }

    /// Time left until the local minute changes
    pub fn until_next_minute(&self, now: Instant) -> Duration {
        let local = self.local(now);
        let into_minute = u64::from(local.second()) * 1_000_000
            + u64::from(local.nanosecond().min(999_999_999)) / 1_000;
        Duration::from_micros(60_000_000 - into_minute)
    }
}

/// [`Clock`] reading the system timer
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    time: TimeManager,
    clock_24h: bool,
}

impl WallClock {
    pub fn new(time: TimeManager, clock_24h: bool) -> Self {
        Self { time, clock_24h }
    }
}

impl Clock for WallClock {
    fn now(&self) -> NaiveDateTime {
        self.time.local(Instant::now())
    }

    fn is_24h_style(&self) -> bool {
        self.clock_24h
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    fn datetime(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 3)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn counts_from_the_reference() {
        let time = TimeManager::init(0)
            .with_reference(TimeReference::from_datetime(datetime(10, 2, 30), at(5_000)));
        assert_eq!(time.utc(at(5_000)), datetime(10, 2, 30));
        assert_eq!(time.utc(at(35_000)), datetime(10, 3, 0));
        // Before the reference
        assert_eq!(time.utc(at(0)), datetime(10, 2, 30));
    }

    #[test]
    fn applies_the_utc_offset() {
        let time = TimeManager::init(-5 * 3_600)
            .with_reference(TimeReference::from_datetime(datetime(10, 0, 0), at(0)));
        assert_eq!(time.local(at(0)), datetime(5, 0, 0));
        assert_eq!(time.utc(at(0)), datetime(10, 0, 0));
    }

    #[test]
    fn boots_at_the_epoch() {
        let time = TimeManager::init(0);
        assert_eq!(time.utc(at(0)), NaiveDateTime::UNIX_EPOCH);
    }

    #[test]
    fn reference_from_timestamp() {
        let reference = TimeReference::from_timestamp(1_709_460_000, at(0));
        let time = TimeManager::init(0).with_reference(reference);
        assert_eq!(time.utc(at(0)), datetime(10, 0, 0));

        let out_of_range = TimeReference::from_timestamp(i64::MAX, at(0));
        assert_eq!(out_of_range, TimeReference::default());
    }

    #[test]
    fn next_minute() {
        let time = TimeManager::init(0)
            .with_reference(TimeReference::from_datetime(datetime(10, 2, 45), at(0)));
        assert_eq!(time.until_next_minute(at(0)), Duration::from_secs(15));
        assert_eq!(time.until_next_minute(at(14_500)), Duration::from_millis(500));
        assert_eq!(time.until_next_minute(at(15_000)), Duration::from_secs(60));
    }

    #[test]
    fn wall_clock_reports_its_style() {
        let clock = WallClock::new(TimeManager::init(0), false);
        assert!(!clock.is_24h_style());
    }
}
