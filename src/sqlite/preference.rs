//! Implements a SQLite backed preference gateway.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, gateway::PreferenceGateway};

/// Stores preference blobs in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLitePreferenceGateway {
    connection: Arc<Mutex<Connection>>,
}

impl SQLitePreferenceGateway {
    /// Create a new gateway for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl PreferenceGateway for SQLitePreferenceGateway {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let bytes = connection
            .prepare("SELECT value FROM preference WHERE key = :key")?
            .query_row(&[(":key", key)], |row| row.get(0))
            .optional()?;

        Ok(bytes)
    }

    fn set_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let transaction = connection.unchecked_transaction()?;

        transaction.execute(
            "INSERT INTO preference (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, bytes),
        )?;

        transaction.commit()?;
        Ok(())
    }
}

/// Create the preference table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_preference_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS preference (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        )",
        (),
    )?;

    Ok(())
}
