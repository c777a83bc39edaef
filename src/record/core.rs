//! Defines the record model and the date keys derived from its timestamp.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// Identifies a record while it is held in memory.
///
/// IDs are only meaningful within one [RecordStore](crate::RecordStore) and
/// are never persisted.
pub type RecordId = u64;

/// An income or expense entry.
///
/// `timestamp` doubles as the durable key, so it never changes after the
/// record is created. Only `amount` and `comment` may be edited.
///
/// `date_key` is fixed when the record is created and stored next to it, so
/// a record stays in the same day and month even if the local offset
/// changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    date_key: DateKey,
    is_income: bool,
    /// The magnitude of the money spent or earned.
    pub amount: f64,
    /// Free text describing the record, may be empty.
    pub comment: String,
}

/// The text shown in place of an empty comment.
pub const EMPTY_COMMENT_LABEL: &str = "Record";

impl Record {
    pub(crate) fn new(
        id: RecordId,
        timestamp: OffsetDateTime,
        is_income: bool,
        amount: f64,
        comment: String,
    ) -> Self {
        Self {
            id,
            timestamp,
            date_key: DateKey::of(timestamp),
            is_income,
            amount,
            comment,
        }
    }

    /// Build a record from its durable form, keeping the stored date keys.
    ///
    /// The timestamp is shown in `offset`. If the stored keys cannot be
    /// parsed they are derived from the timestamp in `offset` instead.
    pub(crate) fn from_raw(id: RecordId, raw: RawRecord, offset: UtcOffset) -> Self {
        let timestamp = raw.timestamp.to_offset(offset);
        let date_key = raw.date_key().unwrap_or_else(|| {
            tracing::warn!(
                "Could not parse the stored date key \"{}\"/\"{}\" of the record created at {timestamp}, deriving it from the timestamp.",
                raw.year_month,
                raw.day
            );
            DateKey::of(timestamp)
        });

        Self {
            id,
            timestamp,
            date_key,
            is_income: raw.is_income,
            amount: raw.amount,
            comment: raw.comment,
        }
    }

    /// The in-memory ID of the record.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// When the record was created.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Whether the record is income (`true`) or an expense (`false`).
    pub fn is_income(&self) -> bool {
        self.is_income
    }

    /// The year-month and day the record belongs to.
    pub fn date_key(&self) -> DateKey {
        self.date_key
    }

    /// The comment, or [EMPTY_COMMENT_LABEL] if the comment is empty.
    pub fn comment_label(&self) -> &str {
        if self.comment.is_empty() {
            EMPTY_COMMENT_LABEL
        } else {
            &self.comment
        }
    }

    /// The amount with two fraction digits and a leading `+` for income or
    /// `-` for expenses, e.g. "+12.34".
    pub fn amount_label(&self) -> String {
        let sign = if self.is_income { '+' } else { '-' };

        format!("{sign}{:.2}", self.amount)
    }

    /// The creation time formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn timestamp_label(&self) -> String {
        let ts = self.timestamp;

        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            ts.year(),
            u8::from(ts.month()),
            ts.day(),
            ts.hour(),
            ts.minute(),
            ts.second()
        )
    }
}

/// The fields of a record as they are kept in the durable store.
///
/// Unlike [Record], a raw record has no in-memory ID but carries the date
/// keys used to query it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// The year and month the record was created in, e.g. "2025-10".
    pub year_month: String,
    /// The day of the month the record was created on, e.g. "05".
    pub day: String,
    /// When the record was created. Acts as the durable key.
    pub timestamp: OffsetDateTime,
    /// Whether the record is income (`true`) or an expense (`false`).
    pub is_income: bool,
    /// The magnitude of the money spent or earned.
    pub amount: f64,
    /// Free text describing the record, may be empty.
    pub comment: String,
}

impl RawRecord {
    /// Build the durable form of `record`, deriving the date keys from its
    /// timestamp.
    pub fn from_record(record: &Record) -> Self {
        let key = record.date_key();

        Self {
            year_month: key.year_month.to_string(),
            day: key.day_label(),
            timestamp: record.timestamp,
            is_income: record.is_income,
            amount: record.amount,
            comment: record.comment.clone(),
        }
    }

    /// The stored date keys, or `None` if they are malformed.
    pub fn date_key(&self) -> Option<DateKey> {
        DateKey::parse(&self.year_month, &self.day)
    }
}

// ============================================================================
// DATE KEYS
// ============================================================================

/// The calendar month a record belongs to.
///
/// Ordering follows the calendar, so a list of buckets sorted by
/// `YearMonth` is in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// The calendar year.
    pub year: i32,
    /// The month as a number from 1 to 12.
    pub month: u8,
}

impl YearMonth {
    /// The year-month of `timestamp` in the timestamp's own offset.
    pub fn of(timestamp: OffsetDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: u8::from(timestamp.month()),
        }
    }

    /// Parse the stored form, e.g. "2025-10".
    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.split_once('-')?;
        let year = year.parse::<i32>().ok()?;
        let month = month.parse::<u8>().ok().filter(|month| (1..=12).contains(month))?;

        Some(Self { year, month })
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The date-derived key used to query the durable store for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateKey {
    /// The month of the day.
    pub year_month: YearMonth,
    /// The day of the month, from 1 to 31.
    pub day: u8,
}

impl DateKey {
    /// The date key of `timestamp` in the timestamp's own offset.
    pub fn of(timestamp: OffsetDateTime) -> Self {
        Self {
            year_month: YearMonth::of(timestamp),
            day: timestamp.day(),
        }
    }

    /// Parse the stored year-month and day, e.g. "2025-10" and "05".
    pub fn parse(year_month: &str, day: &str) -> Option<Self> {
        let year_month = YearMonth::parse(year_month)?;
        let day = day.parse::<u8>().ok().filter(|day| (1..=31).contains(day))?;

        Some(Self { year_month, day })
    }

    /// The day as it is stored in the durable store, e.g. "05".
    pub fn day_label(&self) -> String {
        format!("{:02}", self.day)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year_month, self.day)
    }
}

// ============================================================================
// ID ISSUING
// ============================================================================

/// Issues increasing record IDs, starting at 0.
///
/// Each store owns its own counter so separate stores (and tests) never
/// interfere with each other.
#[derive(Debug, Default)]
pub struct RecordIdCounter {
    next: RecordId,
}

impl RecordIdCounter {
    /// Take the next unused ID.
    pub fn next_id(&mut self) -> RecordId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Check that `amount` can be stored on a record.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `amount` is negative, NaN or infinite.
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount))
    }
}
