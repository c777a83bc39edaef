//! The source of the current time in the ledger's local timezone.

use std::fmt;

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

/// Supplies the current time.
pub trait Clock {
    /// The current time in the local offset.
    fn now(&self) -> OffsetDateTime;

    /// The local offset in effect at `instant`.
    fn offset_at(&self, _instant: OffsetDateTime) -> UtcOffset {
        self.now().offset()
    }
}

#[derive(Clone, Copy)]
enum Zone {
    Fixed(UtcOffset),
    Named(&'static Tz),
}

/// Reads the system clock and converts it to the local offset.
#[derive(Clone, Copy)]
pub struct SystemClock {
    zone: Zone,
}

impl SystemClock {
    /// Create a clock that always reports times in `offset`.
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    /// Create a clock that reports times in UTC.
    pub fn utc() -> Self {
        Self::new(UtcOffset::UTC)
    }

    /// Create a clock for the timezone with the canonical name
    /// `canonical_timezone`, e.g. "Pacific/Auckland".
    ///
    /// The offset follows the timezone's daylight saving rules. Returns
    /// `None` if the timezone name is not known.
    pub fn in_timezone(canonical_timezone: &str) -> Option<Self> {
        time_tz::timezones::get_by_name(canonical_timezone).map(|tz| Self {
            zone: Zone::Named(tz),
        })
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Zone::Fixed(offset) => write!(f, "SystemClock({offset})"),
            Zone::Named(tz) => write!(f, "SystemClock({})", tz.name()),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();

        now.to_offset(self.offset_at(now))
    }

    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self.zone {
            Zone::Fixed(offset) => offset,
            Zone::Named(tz) => tz.get_offset_utc(&instant).to_utc(),
        }
    }
}
