//! Implements a SQLite backed record gateway.
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    gateway::RecordGateway,
    record::{DateKey, RawRecord},
};

/// Stores records in a SQLite database.
///
/// The `record` table must exist, see [crate::initialize_db].
#[derive(Debug, Clone)]
pub struct SQLiteRecordGateway {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteRecordGateway {
    /// Create a new gateway for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)
    }
}

impl RecordGateway for SQLiteRecordGateway {
    /// Retrieve the records created on the day `key`, oldest first.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some SQL error.
    fn query_by_date_key(&self, key: DateKey) -> Result<Vec<RawRecord>, Error> {
        let connection = self.lock()?;

        let mut statement = connection.prepare(
            "SELECT year_month, day, timestamp, is_income, amount, comment FROM record
             WHERE year_month = :year_month AND day = :day
             ORDER BY timestamp ASC",
        )?;

        let records = statement
            .query_map(
                &[
                    (":year_month", &key.year_month.to_string()),
                    (":day", &key.day_label()),
                ],
                map_record_row,
            )?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        Ok(records)
    }

    /// Retrieve every record, ordered by timestamp.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some SQL error.
    fn query_all(&self) -> Result<Vec<RawRecord>, Error> {
        let connection = self.lock()?;

        let mut statement = connection.prepare(
            "SELECT year_month, day, timestamp, is_income, amount, comment FROM record
             ORDER BY timestamp ASC",
        )?;

        let records = statement
            .query_map([], map_record_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        Ok(records)
    }

    /// Insert `record` and commit.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::TimestampOutOfRange] if the timestamp cannot be stored,
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some SQL error.
    fn insert(&mut self, record: RawRecord) -> Result<(), Error> {
        let timestamp = timestamp_to_nanos(record.timestamp)?;
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        transaction.execute(
            "INSERT INTO record (year_month, day, timestamp, is_income, amount, comment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                record.year_month,
                record.day,
                timestamp,
                record.is_income,
                record.amount,
                record.comment,
            ),
        )?;

        transaction.commit()?;
        Ok(())
    }

    /// Update the amount and comment of the record created at `timestamp`
    /// and commit.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UpdateMissingRecord] if no record has `timestamp`,
    /// - [Error::TimestampOutOfRange] if the timestamp cannot be stored,
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn update(
        &mut self,
        timestamp: OffsetDateTime,
        amount: f64,
        comment: &str,
    ) -> Result<(), Error> {
        let timestamp = timestamp_to_nanos(timestamp)?;
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        // Timestamps are not constrained to be unique, only the first match
        // is changed.
        let rows_affected = transaction.execute(
            "UPDATE record SET amount = ?1, comment = ?2
             WHERE id = (SELECT id FROM record WHERE timestamp = ?3 ORDER BY id LIMIT 1)",
            (amount, comment, timestamp),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingRecord);
        }

        transaction.commit()?;
        Ok(())
    }

    /// Delete the record created at `timestamp` and commit.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DeleteMissingRecord] if no record has `timestamp`,
    /// - [Error::TimestampOutOfRange] if the timestamp cannot be stored,
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn delete(&mut self, timestamp: OffsetDateTime) -> Result<(), Error> {
        let timestamp = timestamp_to_nanos(timestamp)?;
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let rows_affected = transaction.execute(
            "DELETE FROM record
             WHERE id = (SELECT id FROM record WHERE timestamp = ?1 ORDER BY id LIMIT 1)",
            [timestamp],
        )?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingRecord);
        }

        transaction.commit()?;
        Ok(())
    }
}

/// Create the record table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year_month TEXT NOT NULL,
                day TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                is_income INTEGER NOT NULL,
                amount REAL NOT NULL,
                comment TEXT NOT NULL
                )",
        (),
    )?;

    // Used by the today view.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_date ON record(year_month, day);",
        (),
    )?;

    // Used to locate records for updates and deletes.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_timestamp ON record(timestamp);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [RawRecord].
///
/// The row must contain `year_month, day, timestamp, is_income, amount, comment`
/// in that order.
pub fn map_record_row(row: &Row) -> Result<RawRecord, rusqlite::Error> {
    let year_month = row.get(0)?;
    let day = row.get(1)?;
    let timestamp = nanos_to_timestamp(row.get(2)?)?;
    let is_income = row.get(3)?;
    let amount = row.get(4)?;
    let comment = row.get(5)?;

    Ok(RawRecord {
        year_month,
        day,
        timestamp,
        is_income,
        amount,
        comment,
    })
}

fn timestamp_to_nanos(timestamp: OffsetDateTime) -> Result<i64, Error> {
    i64::try_from(timestamp.unix_timestamp_nanos()).map_err(|_| Error::TimestampOutOfRange)
}

fn nanos_to_timestamp(nanos: i64) -> Result<OffsetDateTime, rusqlite::Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(error)))
}
