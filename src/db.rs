//! Sets up the SQLite database that backs the ledger.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    sqlite::{create_preference_table, create_record_table},
};

/// Create the tables used by the ledger if they do not exist yet.
///
/// This is safe to call on every start up.
///
/// # Errors
/// Returns an [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_record_table(&transaction)?;
    create_preference_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
