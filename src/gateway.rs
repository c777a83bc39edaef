//! Traits for the durable storage the ledger reads from and writes to.

use time::OffsetDateTime;

use crate::{
    Error,
    record::{DateKey, RawRecord},
};

/// Durable storage for every record.
///
/// Records are addressed by their creation timestamp. Each write is committed
/// before the method returns.
pub trait RecordGateway {
    /// Retrieve the records created on the day `key`, oldest first.
    fn query_by_date_key(&self, key: DateKey) -> Result<Vec<RawRecord>, Error>;

    /// Retrieve every record.
    ///
    /// Callers must not rely on the order of the returned records.
    fn query_all(&self) -> Result<Vec<RawRecord>, Error>;

    /// Add a record to the store.
    fn insert(&mut self, record: RawRecord) -> Result<(), Error>;

    /// Set the amount and comment of the record created at `timestamp`.
    ///
    /// # Errors
    /// Implementers should return [Error::UpdateMissingRecord] if there is no
    /// record with `timestamp`.
    fn update(
        &mut self,
        timestamp: OffsetDateTime,
        amount: f64,
        comment: &str,
    ) -> Result<(), Error>;

    /// Remove the record created at `timestamp`.
    ///
    /// # Errors
    /// Implementers should return [Error::DeleteMissingRecord] if there is no
    /// record with `timestamp`.
    fn delete(&mut self, timestamp: OffsetDateTime) -> Result<(), Error>;
}

/// Key/value storage for small blobs such as UI settings.
///
/// Methods take `&self` so a gateway can be shared with a background task.
pub trait PreferenceGateway: Send + Sync {
    /// Retrieve the bytes stored under `key`, if any.
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn set_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), Error>;
}
