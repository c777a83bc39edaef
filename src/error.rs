//! Defines the crate level error type.

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested record could not be found.
    ///
    /// For the record store this means the ID or timestamp does not match a
    /// record in the currently loaded view.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested record could not be found")]
    NotFound,

    /// An amount was negative, NaN or infinite.
    ///
    /// Records store the magnitude of money spent or earned, the direction is
    /// given by the income flag.
    #[error("{0} is not a valid amount, amounts must be finite and not negative")]
    InvalidAmount(f64),

    /// A timestamp could not be represented as nanoseconds since the Unix
    /// epoch in a signed 64-bit integer.
    #[error("the timestamp is outside the range that can be stored")]
    TimestampOutOfRange,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not convert JSON: {0}")]
    JsonError(String),

    /// The canonical timezone name did not match a known timezone.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a record that is not in the database.
    #[error("tried to delete a record that is not in the database")]
    DeleteMissingRecord,

    /// Tried to update a record that is not in the database.
    #[error("tried to update a record that is not in the database")]
    UpdateMissingRecord,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JsonError(value.to_string())
    }
}
