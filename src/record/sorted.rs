//! A record list that keeps itself sorted so records can be located with a
//! binary search.

use std::marker::PhantomData;

use time::OffsetDateTime;

use super::core::{Record, RecordId};

/// Chooses the key a [SortedRecords] list is ordered by.
pub trait RecordOrder {
    /// The key type. Keys must be unique within one list.
    type Key: Ord + Copy;

    /// Extract the sort key from `record`.
    fn key(record: &Record) -> Self::Key;
}

/// Orders records by their in-memory ID, i.e. creation order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ById;

impl RecordOrder for ById {
    type Key = RecordId;

    fn key(record: &Record) -> RecordId {
        record.id()
    }
}

/// Orders records by their creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByTimestamp;

impl RecordOrder for ByTimestamp {
    type Key = OffsetDateTime;

    fn key(record: &Record) -> OffsetDateTime {
        record.timestamp()
    }
}

/// A list of records kept in ascending order of `O::key`.
///
/// Every insertion goes through this type, which is what makes [Self::find]
/// valid. Keys are expected to be unique; if two records share a key,
/// lookups return either one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedRecords<O: RecordOrder> {
    records: Vec<Record>,
    order: PhantomData<O>,
}

impl<O: RecordOrder> Default for SortedRecords<O> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            order: PhantomData,
        }
    }
}

impl<O: RecordOrder> SortedRecords<O> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from records in any order.
    pub fn from_unsorted(mut records: Vec<Record>) -> Self {
        records.sort_by_key(O::key);

        Self {
            records,
            order: PhantomData,
        }
    }

    /// Add `record`, keeping the list sorted.
    ///
    /// Appending a record whose key is greater than every existing key (the
    /// common case for newly created records) does not shift any elements.
    pub fn insert(&mut self, record: Record) {
        let key = O::key(&record);

        match self.records.last() {
            Some(last) if O::key(last) > key => {
                let index = self.records.partition_point(|r| O::key(r) < key);
                self.records.insert(index, record);
            }
            _ => self.records.push(record),
        }
    }

    /// The index of the record with `key`, or `None` if there is no such record.
    pub fn find(&self, key: O::Key) -> Option<usize> {
        self.records.binary_search_by_key(&key, O::key).ok()
    }

    /// The record with `key`.
    pub fn get(&self, key: O::Key) -> Option<&Record> {
        self.find(key).map(|index| &self.records[index])
    }

    /// A mutable reference to the record with `key`.
    ///
    /// Only the `amount` and `comment` fields are public, so the caller
    /// cannot change the sort key through the returned reference.
    pub fn get_mut(&mut self, key: O::Key) -> Option<&mut Record> {
        self.find(key).map(|index| &mut self.records[index])
    }

    /// Remove and return the record with `key`.
    pub fn remove(&mut self, key: O::Key) -> Option<Record> {
        self.find(key).map(|index| self.records.remove(index))
    }

    /// Remove and return the first record matching `predicate`.
    ///
    /// This is a linear scan, used when looking a record up by a key the list
    /// is not sorted by.
    pub fn remove_where(&mut self, predicate: impl Fn(&Record) -> bool) -> Option<Record> {
        self.records
            .iter()
            .position(predicate)
            .map(|index| self.records.remove(index))
    }

    /// A mutable reference to the first record matching `predicate`.
    pub fn find_mut_where(&mut self, predicate: impl Fn(&Record) -> bool) -> Option<&mut Record> {
        self.records.iter_mut().find(|record| predicate(record))
    }

    /// The records in ascending key order.
    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    /// Iterate over the records in ascending key order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// The number of records in the list.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Consume the list, returning the records in ascending key order.
    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }
}

impl<'a, O: RecordOrder> IntoIterator for &'a SortedRecords<O> {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
