//! Grouping of records into month buckets.

use time::OffsetDateTime;

use super::{
    core::{Record, YearMonth},
    sorted::{ByTimestamp, SortedRecords},
    statistics::Statistics,
};

/// A group of records that were all created in the same month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    /// The month every record in the bucket belongs to.
    pub year_month: YearMonth,
    /// The records of the month, oldest first.
    pub records: SortedRecords<ByTimestamp>,
}

impl MonthBucket {
    fn new(year_month: YearMonth) -> Self {
        Self {
            year_month,
            records: SortedRecords::new(),
        }
    }

    /// The income and expense totals for the month.
    pub fn statistics(&self) -> Statistics {
        Statistics::of(&self.records)
    }
}

/// Group `records` into month buckets with a single pass.
///
/// A new bucket is started whenever the year-month of a record differs from
/// the record before it. `records` should be sorted by timestamp: records of
/// the same month that are not next to each other end up in separate
/// buckets. Buckets are returned in order of first appearance and are never
/// empty.
pub fn classify(records: impl IntoIterator<Item = Record>) -> Vec<MonthBucket> {
    let mut buckets: Vec<MonthBucket> = Vec::new();

    for record in records {
        let year_month = record.date_key().year_month;
        let bucket = match buckets.last_mut() {
            Some(current) if current.year_month == year_month => current,
            _ => {
                buckets.push(MonthBucket::new(year_month));
                let last = buckets.len() - 1;
                &mut buckets[last]
            }
        };

        bucket.records.insert(record);
    }

    buckets
}

/// Every loaded record, grouped into month buckets in chronological order.
///
/// Buckets are kept sorted by [YearMonth] and records inside a bucket by
/// timestamp, so a record is located with two binary searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyRecords {
    buckets: Vec<MonthBucket>,
}

impl MonthlyRecords {
    /// Classify records that are already sorted by timestamp.
    pub fn from_sorted(records: SortedRecords<ByTimestamp>) -> Self {
        Self {
            buckets: classify(records.into_vec()),
        }
    }

    /// The month buckets, oldest month first.
    pub fn buckets(&self) -> &[MonthBucket] {
        &self.buckets
    }

    /// The number of month buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The total number of records across all buckets.
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.records.len()).sum()
    }

    /// The record of month `year_month` created at `timestamp`.
    pub fn get(&self, year_month: YearMonth, timestamp: OffsetDateTime) -> Option<&Record> {
        let bucket_index = self.bucket_index(year_month).ok()?;

        self.buckets[bucket_index].records.get(timestamp)
    }

    /// A mutable reference to the record of month `year_month` created at
    /// `timestamp`.
    pub fn get_mut(
        &mut self,
        year_month: YearMonth,
        timestamp: OffsetDateTime,
    ) -> Option<&mut Record> {
        let bucket_index = self.bucket_index(year_month).ok()?;

        self.buckets[bucket_index].records.get_mut(timestamp)
    }

    /// Add `record` to the bucket for its month, creating the bucket if needed.
    pub fn insert(&mut self, record: Record) {
        let year_month = record.date_key().year_month;

        let bucket_index = match self.bucket_index(year_month) {
            Ok(index) => index,
            Err(index) => {
                self.buckets.insert(index, MonthBucket::new(year_month));
                index
            }
        };

        self.buckets[bucket_index].records.insert(record);
    }

    /// Remove and return the record of month `year_month` created at
    /// `timestamp`.
    ///
    /// A bucket left empty by the removal is dropped.
    pub fn remove(&mut self, year_month: YearMonth, timestamp: OffsetDateTime) -> Option<Record> {
        let bucket_index = self.bucket_index(year_month).ok()?;
        let bucket = &mut self.buckets[bucket_index];
        let record = bucket.records.remove(timestamp)?;

        if bucket.records.is_empty() {
            self.buckets.remove(bucket_index);
        }

        Some(record)
    }

    fn bucket_index(&self, year_month: YearMonth) -> Result<usize, usize> {
        self.buckets
            .binary_search_by_key(&year_month, |bucket| bucket.year_month)
    }
}
