//! Configuration for opening a ledger.

use std::{env, path::PathBuf, time::Duration};

use rusqlite::Connection;
use crate::{Error, clock::SystemClock, db::initialize};

/// The environment variable holding the path to the SQLite database.
pub const DB_PATH_VAR: &str = "TALLY_DB_PATH";
/// The environment variable holding the canonical timezone name.
pub const TIMEZONE_VAR: &str = "TALLY_TIMEZONE";
/// The environment variable holding the preference debounce window in milliseconds.
pub const DEBOUNCE_VAR: &str = "TALLY_PREFERENCE_DEBOUNCE_MS";

/// The default time to wait for further changes before saving a preference.
pub const DEFAULT_PREFERENCE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Settings needed to open the ledger's storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// File path to the application SQLite database.
    pub db_path: PathBuf,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// Records are assigned to days and months in this timezone.
    pub local_timezone: String,

    /// How long preference changes are collected before being written.
    pub preference_debounce: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("ledger.db"),
            local_timezone: "Etc/UTC".to_owned(),
            preference_debounce: DEFAULT_PREFERENCE_DEBOUNCE,
        }
    }
}

impl LedgerConfig {
    /// Read the config from the environment, using the defaults for any
    /// variable that is not set.
    ///
    /// An unparsable debounce window is logged and replaced with the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let preference_debounce = match lookup(DEBOUNCE_VAR) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(millis) => Duration::from_millis(millis),
                Err(error) => {
                    tracing::warn!(
                        "Could not parse {DEBOUNCE_VAR}=\"{raw}\" ({error}), using the default of {:?}",
                        defaults.preference_debounce
                    );
                    defaults.preference_debounce
                }
            },
            None => defaults.preference_debounce,
        };

        Self {
            db_path: lookup(DB_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            local_timezone: lookup(TIMEZONE_VAR).unwrap_or(defaults.local_timezone),
            preference_debounce,
        }
    }

    /// A clock that reports times in [Self::local_timezone].
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the timezone name is not known.
    pub fn clock(&self) -> Result<SystemClock, Error> {
        SystemClock::in_timezone(&self.local_timezone)
            .ok_or_else(|| Error::InvalidTimezone(self.local_timezone.clone()))
    }

    /// Open the database at [Self::db_path] and create the ledger's tables.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file cannot be opened or initialised.
    pub fn open_connection(&self) -> Result<Connection, Error> {
        let connection = Connection::open(&self.db_path)?;
        initialize(&connection)?;

        Ok(connection)
    }
}
