//! Records and the in-memory structures built from them.
//!
//! This module contains:
//! - The `Record` model, its durable form `RawRecord` and the date keys
//! - `SortedRecords`, the sorted list used to locate records by key
//! - The month classifier and the `MonthlyRecords` it produces
//! - Income and expense statistics

mod classify;
mod core;
mod sorted;
mod statistics;

pub use classify::{MonthBucket, MonthlyRecords, classify};
pub use core::{
    DateKey, EMPTY_COMMENT_LABEL, RawRecord, Record, RecordId, RecordIdCounter, YearMonth,
    validate_amount,
};
pub use sorted::{ById, ByTimestamp, RecordOrder, SortedRecords};
pub use statistics::{Statistics, format_amount};
