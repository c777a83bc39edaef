//! Wires the stores to a SQLite database.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    clock::SystemClock,
    config::LedgerConfig,
    db::initialize,
    preferences::PreferenceStore,
    sqlite::{SQLitePreferenceGateway, SQLiteRecordGateway},
    store::RecordStore,
};

/// The record store and preference store of one ledger, sharing a single
/// database connection.
#[derive(Debug)]
pub struct Ledger {
    /// The records and their today and total views.
    pub records: RecordStore<SQLiteRecordGateway, SystemClock>,

    /// The saved position of the "add record" button.
    pub preferences: PreferenceStore<SQLitePreferenceGateway>,
}

impl Ledger {
    /// Open the database described by `config` and create the stores.
    ///
    /// # Errors
    /// Returns an error if the timezone is unknown or the database cannot be
    /// opened or initialized.
    pub fn open(config: &LedgerConfig) -> Result<Self, Error> {
        let clock = config.clock()?;
        let connection = config.open_connection()?;

        tracing::info!(
            "Opened ledger at {} with local timezone {}.",
            config.db_path.display(),
            config.local_timezone
        );

        Ok(Self::from_connection(
            connection,
            clock,
            config,
        ))
    }

    /// Create the stores on an already initialized `connection`.
    pub fn from_connection(connection: Connection, clock: SystemClock, config: &LedgerConfig) -> Self {
        let connection = Arc::new(Mutex::new(connection));

        Self {
            records: RecordStore::with_clock(
                SQLiteRecordGateway::new(Arc::clone(&connection)),
                clock,
            ),
            preferences: PreferenceStore::new(
                Arc::new(SQLitePreferenceGateway::new(connection)),
                config.preference_debounce,
            ),
        }
    }

    /// Open an empty ledger backed by an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory(config: &LedgerConfig) -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;
        initialize(&connection)?;

        Ok(Self::from_connection(
            connection,
            config.clock()?,
            config,
        ))
    }
}
