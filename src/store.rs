//! The in-memory record store that sits between the presentation layer and
//! the durable store.
//!
//! The store holds two views of the records:
//! - the today view, a list of the records created on the current day
//!   ordered by ID,
//! - and the total view, every record grouped into month buckets.
//!
//! Each mutation is applied to every loaded view and then written to the
//! [RecordGateway]. Durable writes are best effort: a failed write is logged
//! and the in-memory change is kept, so memory and the durable store may
//! differ until the next reload.
//!
//! Grouping the total view runs on a blocking worker. Its result is handed
//! back by [RecordStore::poll_total] or [RecordStore::wait_for_total], which
//! are the only places the published buckets are replaced.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use time::OffsetDateTime;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::{
    Error,
    clock::{Clock, SystemClock},
    gateway::RecordGateway,
    record::{
        ById, DateKey, MonthBucket, MonthlyRecords, RawRecord, Record, RecordId, RecordIdCounter,
        SortedRecords, Statistics, YearMonth, validate_amount,
    },
};

/// Which view the presentation layer is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The records created today.
    Today,
    /// Every record, grouped by month.
    Total,
}

/// Identifies the record to edit or delete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// A record in the today view, by its in-memory ID.
    Today(RecordId),
    /// A record in the total view, by the month bucket it is in and its
    /// creation timestamp. The timestamp may be given in any offset.
    Total {
        /// The month of the bucket holding the record.
        year_month: YearMonth,
        /// When the record was created.
        timestamp: OffsetDateTime,
    },
}

impl Selection {
    /// Select `record` in the total view.
    pub fn total(record: &Record) -> Self {
        Selection::Total {
            year_month: record.date_key().year_month,
            timestamp: record.timestamp(),
        }
    }
}

/// A change made while the total view was being classified. These are
/// replayed onto the classified buckets before they are published.
#[derive(Debug)]
enum Change {
    Added(Record),
    Deleted {
        year_month: YearMonth,
        timestamp: OffsetDateTime,
    },
    Edited {
        year_month: YearMonth,
        timestamp: OffsetDateTime,
        amount: f64,
        comment: String,
    },
}

impl Change {
    fn apply(self, monthly: &mut MonthlyRecords) {
        match self {
            Change::Added(record) => monthly.insert(record),
            Change::Deleted {
                year_month,
                timestamp,
            } => {
                monthly.remove(year_month, timestamp);
            }
            Change::Edited {
                year_month,
                timestamp,
                amount,
                comment,
            } => {
                if let Some(record) = monthly.get_mut(year_month, timestamp) {
                    record.amount = amount;
                    record.comment = comment;
                }
            }
        }
    }
}

/// The result sent back by the classification worker.
#[derive(Debug)]
struct Classified {
    generation: u64,
    monthly: MonthlyRecords,
    elapsed: Duration,
}

#[derive(Debug)]
struct PendingClassification {
    generation: u64,
    receiver: oneshot::Receiver<Classified>,
    changes: Vec<Change>,
}

#[derive(Debug, Default)]
enum TotalState {
    #[default]
    Unloaded,
    Loading(PendingClassification),
    Loaded(MonthlyRecords),
}

/// The single owner of the records held in memory.
///
/// All methods are meant to be called from one context, e.g. a UI thread.
/// [Self::load_total] must be called from within a tokio runtime.
#[derive(Debug)]
pub struct RecordStore<G, C = SystemClock> {
    gateway: G,
    clock: C,
    ids: RecordIdCounter,
    today: SortedRecords<ById>,
    today_key: Option<DateKey>,
    total: TotalState,
    generation: Arc<AtomicU64>,
    active_view: View,
}

impl<G: RecordGateway> RecordStore<G> {
    /// Create a store that reads the time from the system clock in UTC.
    pub fn new(gateway: G) -> Self {
        Self::with_clock(gateway, SystemClock::utc())
    }
}

impl<G: RecordGateway, C: Clock> RecordStore<G, C> {
    /// Create a store that reads the current time from `clock`.
    ///
    /// The clock's offset decides which day and month records belong to.
    pub fn with_clock(gateway: G, clock: C) -> Self {
        Self {
            gateway,
            clock,
            ids: RecordIdCounter::default(),
            today: SortedRecords::new(),
            today_key: None,
            total: TotalState::Unloaded,
            generation: Arc::new(AtomicU64::new(0)),
            active_view: View::Today,
        }
    }

    // ------------------------------------------------------------------------
    // Today view
    // ------------------------------------------------------------------------

    /// Load the records created on the current day and make the today view
    /// active.
    ///
    /// Does nothing if the today view is already loaded. If the durable store
    /// cannot be read the error is logged and the view stays unloaded, so the
    /// next call tries again.
    pub fn load_today(&mut self) {
        self.active_view = View::Today;

        if self.today_key.is_some() {
            return;
        }

        let key = DateKey::of(self.clock.now());

        match self.gateway.query_by_date_key(key) {
            Ok(raw_records) => {
                self.today = SortedRecords::new();
                for raw in raw_records {
                    let record = self.to_record(raw);
                    self.today.insert(record);
                }
                self.today_key = Some(key);

                tracing::debug!("Loaded {} records for {key}.", self.today.len());
            }
            Err(error) => {
                tracing::error!("Could not load the records for {key}: {error}");
            }
        }
    }

    /// Drop the today view from memory and make the total view active.
    ///
    /// The durable store is not touched.
    pub fn unload_today(&mut self) {
        self.active_view = View::Total;
        self.today.clear();
        self.today_key = None;
    }

    /// Whether the today view is loaded.
    pub fn is_today_loaded(&self) -> bool {
        self.today_key.is_some()
    }

    /// The records of the today view, in creation order.
    pub fn today_records(&self) -> &[Record] {
        self.today.as_slice()
    }

    /// The current day, e.g. "2025-10-05".
    pub fn today_label(&self) -> String {
        DateKey::of(self.clock.now()).to_string()
    }

    /// The income and expense totals of the today view.
    ///
    /// Use [Statistics::labels] for the totals formatted with two fraction
    /// digits.
    pub fn today_statistics(&self) -> Statistics {
        Statistics::of(&self.today)
    }

    // ------------------------------------------------------------------------
    // Total view
    // ------------------------------------------------------------------------

    /// Load every record and start grouping them by month on a blocking
    /// worker. Makes the total view active.
    ///
    /// Does nothing if the total view is loaded or loading. The records are
    /// read synchronously; if that fails the error is logged and the view
    /// stays unloaded. Otherwise [Self::is_loading] reports `true` until the
    /// result is applied by [Self::poll_total] or [Self::wait_for_total].
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn load_total(&mut self) {
        self.active_view = View::Total;

        if !matches!(self.total, TotalState::Unloaded) {
            return;
        }

        let raw_records = match self.gateway.query_all() {
            Ok(raw_records) => raw_records,
            Err(error) => {
                tracing::error!("Could not load all records: {error}");
                return;
            }
        };

        let records: Vec<Record> = raw_records
            .into_iter()
            .map(|raw| self.to_record(raw))
            .collect();
        // The gateway does not promise an order, classification needs
        // timestamp order.
        let sorted = SortedRecords::from_unsorted(records);

        let generation = self.generation.load(Ordering::SeqCst);
        let current_generation = Arc::clone(&self.generation);
        let (sender, receiver) = oneshot::channel();

        tracing::debug!("Classifying {} records.", sorted.len());

        tokio::task::spawn_blocking(move || {
            if current_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("Skipping classification, the total view was unloaded.");
                return;
            }

            let start_time = Instant::now();
            let monthly = MonthlyRecords::from_sorted(sorted);
            let result = Classified {
                generation,
                monthly,
                elapsed: start_time.elapsed(),
            };

            if sender.send(result).is_err() {
                tracing::debug!("Discarding classification, the total view was unloaded.");
            }
        });

        self.total = TotalState::Loading(PendingClassification {
            generation,
            receiver,
            changes: Vec::new(),
        });
    }

    /// Publish the classified total view if the worker has finished.
    ///
    /// Returns `true` if the total view was published by this call. This does
    /// not block, so it can be called from an event loop.
    pub fn poll_total(&mut self) -> bool {
        let TotalState::Loading(pending) = &mut self.total else {
            return false;
        };

        match pending.receiver.try_recv() {
            Ok(classified) => self.publish(classified),
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                tracing::error!("The classification worker stopped without a result.");
                self.total = TotalState::Unloaded;
                false
            }
        }
    }

    /// Wait for the classification worker and publish its result.
    ///
    /// Returns `true` if the total view was published by this call, `false`
    /// if nothing was loading.
    pub async fn wait_for_total(&mut self) -> bool {
        let TotalState::Loading(pending) = &mut self.total else {
            return false;
        };

        match (&mut pending.receiver).await {
            Ok(classified) => self.publish(classified),
            Err(_) => {
                tracing::error!("The classification worker stopped without a result.");
                self.total = TotalState::Unloaded;
                false
            }
        }
    }

    /// Drop the total view from memory.
    ///
    /// A classification that is still running is discarded. The durable store
    /// is not touched.
    pub fn unload_total(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.total = TotalState::Unloaded;
    }

    /// Whether the total view is being classified.
    pub fn is_loading(&self) -> bool {
        matches!(self.total, TotalState::Loading(_))
    }

    /// Whether the total view has been classified and published.
    pub fn is_total_loaded(&self) -> bool {
        matches!(self.total, TotalState::Loaded(_))
    }

    /// The month buckets of the total view, oldest month first.
    ///
    /// Empty until the total view is published.
    pub fn month_buckets(&self) -> &[MonthBucket] {
        match &self.total {
            TotalState::Loaded(monthly) => monthly.buckets(),
            _ => &[],
        }
    }

    /// The income and expense totals of the month bucket at `index`.
    pub fn month_statistics(&self, index: usize) -> Option<Statistics> {
        self.month_buckets().get(index).map(MonthBucket::statistics)
    }

    // ------------------------------------------------------------------------
    // Shared
    // ------------------------------------------------------------------------

    /// The view the presentation layer is showing.
    pub fn active_view(&self) -> View {
        self.active_view
    }

    /// The number of rows in the active view: records for the today view and
    /// month buckets for the total view.
    pub fn record_count(&self) -> usize {
        match self.active_view {
            View::Today => self.today.len(),
            View::Total => self.month_buckets().len(),
        }
    }

    /// Create a record timestamped now and persist it.
    ///
    /// The record is added to the today view if that view is loaded and to
    /// the total view if it is loaded or loading.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `amount` is negative or not finite.
    /// A failed durable write is logged, not returned.
    pub fn add_record(
        &mut self,
        is_income: bool,
        amount: f64,
        comment: impl Into<String>,
    ) -> Result<Record, Error> {
        let amount = validate_amount(amount)?;
        let record = Record::new(
            self.ids.next_id(),
            self.clock.now(),
            is_income,
            amount,
            comment.into(),
        );

        if self.today_key == Some(record.date_key()) {
            self.today.insert(record.clone());
        }
        self.apply_to_total(Change::Added(record.clone()));

        if let Err(error) = self.gateway.insert(RawRecord::from_record(&record)) {
            tracing::error!("Could not save record {record:?}: {error}");
        }

        Ok(record)
    }

    /// Remove the selected record from every loaded view and from the durable
    /// store.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the selected view is not loaded or does
    /// not contain the record. A failed durable delete is logged, not
    /// returned.
    pub fn delete_record(&mut self, selection: Selection) -> Result<Record, Error> {
        let record = match selection {
            Selection::Today(id) => self.today.remove(id),
            Selection::Total {
                year_month,
                timestamp,
            } => match &mut self.total {
                TotalState::Loaded(monthly) => monthly.remove(year_month, timestamp),
                _ => None,
            },
        }
        .ok_or(Error::NotFound)?;

        let timestamp = record.timestamp();
        match selection {
            Selection::Today(_) => self.apply_to_total(Change::Deleted {
                year_month: record.date_key().year_month,
                timestamp,
            }),
            Selection::Total { .. } => {
                self.today.remove_where(|r| r.timestamp() == timestamp);
            }
        }

        if let Err(error) = self.gateway.delete(timestamp) {
            tracing::error!("Could not delete record {record:?}: {error}");
        }

        Ok(record)
    }

    /// Set the amount and comment of the selected record in every loaded view
    /// and in the durable store.
    ///
    /// The income flag and timestamp of a record cannot be changed.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `amount` is negative or not finite,
    /// or [Error::NotFound] if the selected view is not loaded or does not
    /// contain the record. A failed durable update is logged, not returned.
    pub fn edit_record(
        &mut self,
        selection: Selection,
        amount: f64,
        comment: impl Into<String>,
    ) -> Result<Record, Error> {
        let amount = validate_amount(amount)?;
        let comment = comment.into();

        let record = match selection {
            Selection::Today(id) => self.today.get_mut(id),
            Selection::Total {
                year_month,
                timestamp,
            } => match &mut self.total {
                TotalState::Loaded(monthly) => monthly.get_mut(year_month, timestamp),
                _ => None,
            },
        }
        .ok_or(Error::NotFound)?;

        record.amount = amount;
        record.comment = comment.clone();
        let record = record.clone();

        let timestamp = record.timestamp();
        match selection {
            Selection::Today(_) => self.apply_to_total(Change::Edited {
                year_month: record.date_key().year_month,
                timestamp,
                amount,
                comment,
            }),
            Selection::Total { .. } => {
                if let Some(today_record) =
                    self.today.find_mut_where(|r| r.timestamp() == timestamp)
                {
                    today_record.amount = amount;
                    today_record.comment = comment;
                }
            }
        }

        if let Err(error) = self
            .gateway
            .update(timestamp, record.amount, &record.comment)
        {
            tracing::error!("Could not update record {record:?}: {error}");
        }

        Ok(record)
    }

    fn to_record(&mut self, raw: RawRecord) -> Record {
        let offset = self.clock.offset_at(raw.timestamp);

        Record::from_raw(self.ids.next_id(), raw, offset)
    }

    fn apply_to_total(&mut self, change: Change) {
        match &mut self.total {
            TotalState::Loaded(monthly) => change.apply(monthly),
            TotalState::Loading(pending) => pending.changes.push(change),
            TotalState::Unloaded => {}
        }
    }

    fn publish(&mut self, classified: Classified) -> bool {
        let current_generation = self.generation.load(Ordering::SeqCst);

        let pending = match std::mem::take(&mut self.total) {
            TotalState::Loading(pending)
                if pending.generation == classified.generation
                    && classified.generation == current_generation =>
            {
                pending
            }
            other => {
                tracing::debug!("Discarding a stale classification.");
                self.total = other;
                return false;
            }
        };

        let mut monthly = classified.monthly;
        let change_count = pending.changes.len();
        for change in pending.changes {
            change.apply(&mut monthly);
        }

        tracing::info!(
            "Classified {} records into {} months in {:.1}ms, replayed {change_count} changes.",
            monthly.record_count(),
            monthly.len(),
            classified.elapsed.as_secs_f64() * 1000.0,
        );

        self.total = TotalState::Loaded(monthly);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::{
        Duration,
        macros::{datetime, offset},
    };

    use crate::{
        Error,
        db::initialize,
        gateway::RecordGateway,
        record::{DateKey, RawRecord, YearMonth},
        sqlite::SQLiteRecordGateway,
        test_utils::{
            FailingRecordGateway, ReversedRecordGateway, SteppingClock, UnreliableRecordGateway,
        },
    };

    use super::{RecordStore, Selection, View};

    type TestStore = RecordStore<SQLiteRecordGateway, SteppingClock>;

    const TODAY_START: time::OffsetDateTime = datetime!(2025-10-05 09:00:00 UTC);

    fn get_test_gateway() -> SQLiteRecordGateway {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        SQLiteRecordGateway::new(Arc::new(Mutex::new(conn)))
    }

    fn get_test_store(gateway: SQLiteRecordGateway) -> TestStore {
        RecordStore::with_clock(gateway, SteppingClock::new(TODAY_START))
    }

    fn raw(timestamp: time::OffsetDateTime, is_income: bool, amount: f64) -> RawRecord {
        let key = DateKey::of(timestamp);

        RawRecord {
            year_month: key.year_month.to_string(),
            day: key.day_label(),
            timestamp,
            is_income,
            amount,
            comment: String::new(),
        }
    }

    fn seed_history(gateway: &mut SQLiteRecordGateway) {
        for timestamp in [
            datetime!(2025-08-01 10:00:00 UTC),
            datetime!(2025-08-20 10:00:00 UTC),
            datetime!(2025-09-15 10:00:00 UTC),
            datetime!(2025-10-01 10:00:00 UTC),
        ] {
            gateway.insert(raw(timestamp, false, 1.0)).unwrap();
        }
    }

    // ------------------------------------------------------------------------
    // Today view
    // ------------------------------------------------------------------------

    #[test]
    fn load_today_only_includes_todays_records() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        gateway
            .insert(raw(TODAY_START - Duration::hours(1), true, 5.0))
            .unwrap();
        let mut store = get_test_store(gateway);

        store.load_today();

        assert!(store.is_today_loaded());
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.today_records()[0].amount, 5.0);
    }

    #[test]
    fn load_today_twice_does_not_duplicate() {
        let mut gateway = get_test_gateway();
        gateway.insert(raw(TODAY_START, true, 5.0)).unwrap();
        let mut store = get_test_store(gateway);

        store.load_today();
        store.load_today();

        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn loaded_ids_follow_gateway_order() {
        let mut gateway = get_test_gateway();
        for seconds in [30, 10, 20] {
            gateway
                .insert(raw(TODAY_START + Duration::seconds(seconds), true, seconds as f64))
                .unwrap();
        }
        let mut store = get_test_store(gateway);

        store.load_today();

        let amounts: Vec<_> = store.today_records().iter().map(|r| r.amount).collect();
        let ids: Vec<_> = store.today_records().iter().map(|r| r.id()).collect();
        assert_eq!(amounts, vec![10.0, 20.0, 30.0]);
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn failed_today_load_leaves_view_unloaded() {
        let mut store = RecordStore::with_clock(FailingRecordGateway, SteppingClock::new(TODAY_START));

        store.load_today();

        assert!(!store.is_today_loaded());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn today_load_retries_after_failed_read() {
        let mut sqlite = get_test_gateway();
        sqlite.insert(raw(TODAY_START, true, 5.0)).unwrap();
        let gateway = UnreliableRecordGateway::new(sqlite);
        let mut store = RecordStore::with_clock(gateway.clone(), SteppingClock::new(TODAY_START));

        gateway.set_reads_fail(true);
        store.load_today();
        assert!(!store.is_today_loaded());

        gateway.set_reads_fail(false);
        store.load_today();
        assert!(store.is_today_loaded());
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn today_records_keep_their_stored_day_after_an_offset_change() {
        let gateway = get_test_gateway();
        let mut writer = RecordStore::with_clock(
            gateway.clone(),
            SteppingClock::new(datetime!(2025-04-01 00:30:00 +13:00)),
        );
        let added = writer.add_record(true, 1.0, "").unwrap();
        let mut reader = RecordStore::with_clock(
            gateway,
            SteppingClock::new(datetime!(2025-04-01 09:00:00 +12:00)),
        );

        reader.load_today();

        assert_eq!(reader.record_count(), 1);
        let loaded = &reader.today_records()[0];
        assert_eq!(loaded.timestamp(), added.timestamp());
        assert_eq!(loaded.date_key(), added.date_key());
        assert_eq!(reader.today_label(), loaded.date_key().to_string());
    }

    #[test]
    fn unload_today_clears_memory_but_not_storage() {
        let mut store = get_test_store(get_test_gateway());
        store.load_today();
        store.add_record(true, 1.0, "").unwrap();

        store.unload_today();

        assert!(!store.is_today_loaded());
        assert!(store.today_records().is_empty());
        assert_eq!(store.active_view(), View::Total);

        store.load_today();
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn record_count_tracks_adds_minus_deletes() {
        let mut store = get_test_store(get_test_gateway());
        store.load_today();
        let mut ids = Vec::new();

        for i in 0..10 {
            ids.push(store.add_record(i % 2 == 0, i as f64, "").unwrap().id());
        }
        for id in [ids[0], ids[5], ids[9]] {
            store.delete_record(Selection::Today(id)).unwrap();
        }

        assert_eq!(store.record_count(), 7);
        for id in [ids[1], ids[4], ids[8]] {
            assert!(store.today_records().iter().any(|r| r.id() == id));
        }
    }

    #[test]
    fn add_then_edit_keeps_income_flag() {
        let gateway = get_test_gateway();
        let mut store = get_test_store(gateway.clone());
        store.load_today();

        let added = store.add_record(true, 12.34, "lunch").unwrap();
        store
            .edit_record(Selection::Today(added.id()), 15.0, "dinner")
            .unwrap();

        let in_memory = &store.today_records()[0];
        assert_eq!(in_memory.amount, 15.0);
        assert_eq!(in_memory.comment, "dinner");
        assert!(in_memory.is_income());
        assert_eq!(in_memory.timestamp(), added.timestamp());

        let mut fresh = get_test_store(gateway);
        fresh.load_today();
        let durable = &fresh.today_records()[0];
        assert_eq!(durable.amount, 15.0);
        assert_eq!(durable.comment, "dinner");
        assert!(durable.is_income());
    }

    #[test]
    fn today_statistics_are_split_and_formatted() {
        let mut store = get_test_store(get_test_gateway());
        store.load_today();
        store.add_record(true, 10.0, "").unwrap();
        store.add_record(false, 3.5, "").unwrap();
        store.add_record(true, 2.0, "").unwrap();

        let statistics = store.today_statistics();

        assert_eq!(
            statistics.labels(),
            ("12.00".to_owned(), "3.50".to_owned())
        );
    }

    #[test]
    fn delete_then_reload_removes_from_storage() {
        let gateway = get_test_gateway();
        let mut store = get_test_store(gateway.clone());
        store.load_today();
        let keep = store.add_record(true, 1.0, "keep").unwrap();
        let remove = store.add_record(false, 2.0, "remove").unwrap();

        let removed = store.delete_record(Selection::Today(remove.id())).unwrap();
        assert_eq!(removed.comment, "remove");
        assert_eq!(store.record_count(), 1);

        store.unload_today();
        store.load_today();
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.today_records()[0].comment, keep.comment);
    }

    #[test]
    fn invalid_amounts_change_nothing() {
        let gateway = get_test_gateway();
        let mut store = get_test_store(gateway.clone());
        store.load_today();

        let result = store.add_record(false, -1.0, "");

        assert_eq!(result, Err(Error::InvalidAmount(-1.0)));
        assert_eq!(store.record_count(), 0);
        assert!(gateway.query_all().unwrap().is_empty());
    }

    #[test]
    fn missing_selection_is_not_found() {
        let mut store = get_test_store(get_test_gateway());
        store.load_today();

        assert_eq!(
            store.delete_record(Selection::Today(42)),
            Err(Error::NotFound)
        );
        assert_eq!(
            store.edit_record(Selection::Today(42), 1.0, ""),
            Err(Error::NotFound)
        );
        assert_eq!(
            store.delete_record(Selection::Total {
                year_month: YearMonth { year: 2025, month: 10 },
                timestamp: TODAY_START
            }),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn failed_writes_keep_the_in_memory_change() {
        let mut store = RecordStore::with_clock(FailingRecordGateway, SteppingClock::new(TODAY_START));
        // The failing gateway cannot load, so build the view from adds alone.
        store.today_key = Some(DateKey::of(TODAY_START));

        let record = store.add_record(true, 4.0, "offline").unwrap();
        assert_eq!(store.record_count(), 1);

        store
            .edit_record(Selection::Today(record.id()), 5.0, "edited")
            .unwrap();
        assert_eq!(store.today_records()[0].amount, 5.0);

        store.delete_record(Selection::Today(record.id())).unwrap();
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn today_label_uses_clock() {
        let store = get_test_store(get_test_gateway());

        assert_eq!(store.today_label(), "2025-10-05");
    }

    // ------------------------------------------------------------------------
    // Total view
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn load_total_classifies_by_month() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);

        store.load_total();
        assert!(store.is_loading());
        assert!(store.month_buckets().is_empty());

        assert!(store.wait_for_total().await);

        assert!(!store.is_loading());
        assert!(store.is_total_loaded());
        assert_eq!(store.active_view(), View::Total);
        assert_eq!(store.record_count(), 3);
        let months: Vec<_> = store.month_buckets().iter().map(|b| b.year_month).collect();
        assert_eq!(
            months,
            vec![
                YearMonth { year: 2025, month: 8 },
                YearMonth { year: 2025, month: 9 },
                YearMonth { year: 2025, month: 10 },
            ]
        );
        assert_eq!(store.month_buckets()[0].records.len(), 2);
    }

    #[tokio::test]
    async fn load_total_sorts_unordered_gateway_results() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store =
            RecordStore::with_clock(ReversedRecordGateway(gateway), SteppingClock::new(TODAY_START));

        store.load_total();
        store.wait_for_total().await;

        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn poll_total_publishes_once_finished() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);

        store.load_total();
        let mut published = false;
        for _ in 0..1000 {
            if store.poll_total() {
                published = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        assert!(published);
        assert!(!store.is_loading());
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn unload_before_publish_discards_result() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);

        store.load_total();
        store.unload_total();

        assert!(!store.is_loading());
        assert!(!store.wait_for_total().await);
        assert!(!store.poll_total());
        assert!(store.month_buckets().is_empty());
    }

    #[tokio::test]
    async fn reload_after_unload_publishes_fresh_result() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);

        store.load_total();
        store.unload_total();
        store.load_total();

        assert!(store.wait_for_total().await);
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn failed_total_load_leaves_view_unloaded() {
        let mut store = RecordStore::with_clock(FailingRecordGateway, SteppingClock::new(TODAY_START));

        store.load_total();

        assert!(!store.is_loading());
        assert!(!store.is_total_loaded());
    }

    #[tokio::test]
    async fn total_load_retries_after_failed_read() {
        let mut sqlite = get_test_gateway();
        seed_history(&mut sqlite);
        let gateway = UnreliableRecordGateway::new(sqlite);
        let mut store = RecordStore::with_clock(gateway.clone(), SteppingClock::new(TODAY_START));

        gateway.set_reads_fail(true);
        store.load_total();
        assert!(!store.is_loading());

        gateway.set_reads_fail(false);
        store.load_total();
        assert!(store.wait_for_total().await);
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn total_view_groups_by_stored_month_after_an_offset_change() {
        let gateway = get_test_gateway();
        let mut writer = RecordStore::with_clock(
            gateway.clone(),
            SteppingClock::new(datetime!(2025-04-01 00:30:00 +13:00)),
        );
        let added = writer.add_record(false, 2.0, "").unwrap();
        let mut reader = RecordStore::with_clock(
            gateway.clone(),
            SteppingClock::new(datetime!(2025-04-01 09:00:00 +12:00)),
        );

        reader.load_total();
        reader.wait_for_total().await;

        let months: Vec<_> = reader.month_buckets().iter().map(|b| b.year_month).collect();
        assert_eq!(months, vec![YearMonth { year: 2025, month: 4 }]);

        let loaded = reader.month_buckets()[0].records.as_slice()[0].clone();
        reader.delete_record(Selection::total(&loaded)).unwrap();
        assert!(reader.month_buckets().is_empty());
        assert!(gateway.query_all().unwrap().is_empty());
        assert_eq!(loaded.timestamp(), added.timestamp());
    }

    #[tokio::test]
    async fn total_selection_accepts_the_instant_in_another_offset() {
        let gateway = get_test_gateway();
        let mut store = RecordStore::with_clock(
            gateway,
            SteppingClock::new(datetime!(2025-01-31 23:30:00 UTC)),
        );
        let record = store.add_record(true, 1.0, "").unwrap();
        store.load_total();
        store.wait_for_total().await;

        let edited = store
            .edit_record(
                Selection::Total {
                    year_month: YearMonth { year: 2025, month: 1 },
                    timestamp: record.timestamp().to_offset(offset!(+13:00)),
                },
                2.0,
                "",
            )
            .unwrap();

        assert_eq!(edited.timestamp(), record.timestamp());
        assert_eq!(store.month_buckets()[0].records.as_slice()[0].amount, 2.0);
    }

    #[tokio::test]
    async fn changes_during_classification_are_replayed() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);
        store.load_today();
        let added = store.add_record(true, 7.0, "before").unwrap();
        let removed = store.add_record(true, 8.0, "gone").unwrap();

        store.load_total();
        store
            .edit_record(Selection::Today(added.id()), 9.0, "during")
            .unwrap();
        store.delete_record(Selection::Today(removed.id())).unwrap();
        let late = store.add_record(false, 1.5, "late").unwrap();
        store.wait_for_total().await;

        let october = store.month_buckets().last().unwrap();
        let comments: Vec<_> = october.records.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(comments, vec!["", "during", "late"]);
        assert_eq!(october.records.get(late.timestamp()).map(|r| r.amount), Some(1.5));
    }

    #[tokio::test]
    async fn deleting_from_total_also_removes_from_today() {
        let gateway = get_test_gateway();
        let mut store = get_test_store(gateway.clone());
        store.load_today();
        let record = store.add_record(false, 3.0, "").unwrap();
        store.load_total();
        store.wait_for_total().await;

        store
            .delete_record(Selection::total(&record))
            .unwrap();

        assert!(store.today_records().is_empty());
        assert!(store.month_buckets().is_empty());
        assert!(gateway.query_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_from_today_also_removes_from_total() {
        let mut gateway = get_test_gateway();
        seed_history(&mut gateway);
        let mut store = get_test_store(gateway);
        store.load_today();
        let record = store.add_record(false, 3.0, "").unwrap();
        store.load_total();
        store.wait_for_total().await;
        assert_eq!(store.month_buckets()[2].records.len(), 2);

        store.delete_record(Selection::Today(record.id())).unwrap();

        assert_eq!(store.month_buckets()[2].records.len(), 1);
    }

    #[tokio::test]
    async fn editing_in_total_updates_today_and_storage() {
        let gateway = get_test_gateway();
        let mut store = get_test_store(gateway.clone());
        store.load_today();
        let record = store.add_record(true, 3.0, "old").unwrap();
        store.load_total();
        store.wait_for_total().await;

        store
            .edit_record(Selection::total(&record), 4.0, "new")
            .unwrap();

        assert_eq!(store.today_records()[0].comment, "new");
        assert_eq!(store.month_buckets()[0].records.as_slice()[0].amount, 4.0);
        assert_eq!(gateway.query_all().unwrap()[0].comment, "new");
    }

    #[tokio::test]
    async fn month_statistics_per_bucket() {
        let mut gateway = get_test_gateway();
        gateway
            .insert(raw(datetime!(2025-09-01 10:00:00 UTC), true, 10.0))
            .unwrap();
        gateway
            .insert(raw(datetime!(2025-09-02 10:00:00 UTC), false, 3.5))
            .unwrap();
        gateway
            .insert(raw(datetime!(2025-10-01 10:00:00 UTC), true, 2.0))
            .unwrap();
        let mut store = get_test_store(gateway);
        store.load_total();
        store.wait_for_total().await;

        let september = store.month_statistics(0).unwrap();
        let october = store.month_statistics(1).unwrap();

        assert_eq!(september.labels(), ("10.00".to_owned(), "3.50".to_owned()));
        assert_eq!(october.labels(), ("2.00".to_owned(), "0.00".to_owned()));
        assert_eq!(store.month_statistics(2), None);
    }
}
