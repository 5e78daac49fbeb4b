use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};

/// A source of the current time for `timestamp` tokens.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Always returns the same instant. Useful for tests and reproducible builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    /// A clock fixed at `at`.
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self(at)
    }

    /// A clock fixed at midnight UTC of the given date, or `None` if the date does not exist.
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
        Some(Self(Utc.from_utc_datetime(&midnight).fixed_offset()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}
