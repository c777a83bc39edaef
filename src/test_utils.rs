//! Gateways and clocks for tests.

use std::{
    cell::Cell,
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    clock::Clock,
    gateway::{PreferenceGateway, RecordGateway},
    record::{DateKey, RawRecord},
    sqlite::SQLiteRecordGateway,
};

/// A clock that starts at a fixed time and moves forward one second each
/// time it is read, so consecutive records get distinct timestamps.
#[derive(Debug)]
pub struct SteppingClock {
    start: OffsetDateTime,
    reads: Cell<i64>,
}

impl SteppingClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            start,
            reads: Cell::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> OffsetDateTime {
        let reads = self.reads.get();
        self.reads.set(reads + 1);

        self.start + Duration::seconds(reads)
    }

    fn offset_at(&self, _instant: OffsetDateTime) -> UtcOffset {
        self.start.offset()
    }
}

/// A record gateway where every call fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingRecordGateway;

impl RecordGateway for FailingRecordGateway {
    fn query_by_date_key(&self, _key: DateKey) -> Result<Vec<RawRecord>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn query_all(&self) -> Result<Vec<RawRecord>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn insert(&mut self, _record: RawRecord) -> Result<(), Error> {
        Err(Error::DatabaseLockError)
    }

    fn update(
        &mut self,
        _timestamp: OffsetDateTime,
        _amount: f64,
        _comment: &str,
    ) -> Result<(), Error> {
        Err(Error::DatabaseLockError)
    }

    fn delete(&mut self, _timestamp: OffsetDateTime) -> Result<(), Error> {
        Err(Error::DatabaseLockError)
    }
}

/// Wraps a SQLite gateway and returns every record newest first.
#[derive(Debug, Clone)]
pub struct ReversedRecordGateway(pub SQLiteRecordGateway);

impl RecordGateway for ReversedRecordGateway {
    fn query_by_date_key(&self, key: DateKey) -> Result<Vec<RawRecord>, Error> {
        self.0.query_by_date_key(key)
    }

    fn query_all(&self) -> Result<Vec<RawRecord>, Error> {
        let mut records = self.0.query_all()?;
        records.reverse();
        Ok(records)
    }

    fn insert(&mut self, record: RawRecord) -> Result<(), Error> {
        self.0.insert(record)
    }

    fn update(
        &mut self,
        timestamp: OffsetDateTime,
        amount: f64,
        comment: &str,
    ) -> Result<(), Error> {
        self.0.update(timestamp, amount, comment)
    }

    fn delete(&mut self, timestamp: OffsetDateTime) -> Result<(), Error> {
        self.0.delete(timestamp)
    }
}

/// Wraps a SQLite gateway whose reads can be switched to fail.
///
/// Clones share the switch.
#[derive(Debug, Clone)]
pub struct UnreliableRecordGateway {
    inner: SQLiteRecordGateway,
    reads_fail: Arc<AtomicBool>,
}

impl UnreliableRecordGateway {
    pub fn new(inner: SQLiteRecordGateway) -> Self {
        Self {
            inner,
            reads_fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_reads_fail(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), Error> {
        if self.reads_fail.load(Ordering::SeqCst) {
            Err(Error::DatabaseLockError)
        } else {
            Ok(())
        }
    }
}

impl RecordGateway for UnreliableRecordGateway {
    fn query_by_date_key(&self, key: DateKey) -> Result<Vec<RawRecord>, Error> {
        self.check_read()?;
        self.inner.query_by_date_key(key)
    }

    fn query_all(&self) -> Result<Vec<RawRecord>, Error> {
        self.check_read()?;
        self.inner.query_all()
    }

    fn insert(&mut self, record: RawRecord) -> Result<(), Error> {
        self.inner.insert(record)
    }

    fn update(
        &mut self,
        timestamp: OffsetDateTime,
        amount: f64,
        comment: &str,
    ) -> Result<(), Error> {
        self.inner.update(timestamp, amount, comment)
    }

    fn delete(&mut self, timestamp: OffsetDateTime) -> Result<(), Error> {
        self.inner.delete(timestamp)
    }
}

/// An in-memory preference gateway that records every write.
#[derive(Debug, Default)]
pub struct MemoryPreferenceGateway {
    values: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryPreferenceGateway {
    /// Every write made so far, oldest first.
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl PreferenceGateway for MemoryPreferenceGateway {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_owned(), bytes.to_vec());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_owned(), bytes.to_vec()));

        Ok(())
    }
}
