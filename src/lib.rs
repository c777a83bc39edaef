//! Tally is the storage core of a personal income and expense tracker.
//!
//! The library keeps records of money earned and spent, persists them to a
//! SQLite database and serves two views of them:
//! - today, the records created on the current day,
//! - and total, every record grouped by calendar month.
//!
//! It also remembers where the user last dragged the floating "add record"
//! button.
//!
//! Start with [Ledger::open], or build a [RecordStore] and [PreferenceStore]
//! on your own [RecordGateway] and [PreferenceGateway].

#![warn(missing_docs)]

mod clock;
mod config;
mod db;
mod error;
mod gateway;
mod ledger;
mod logging;
mod preferences;
pub mod record;
pub mod sqlite;
mod store;
#[cfg(test)]
mod test_utils;

pub use clock::{Clock, SystemClock};
pub use config::{DB_PATH_VAR, DEBOUNCE_VAR, DEFAULT_PREFERENCE_DEBOUNCE, LedgerConfig, TIMEZONE_VAR};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use gateway::{PreferenceGateway, RecordGateway};
pub use ledger::Ledger;
pub use logging::init_logging;
pub use preferences::{BUTTON_POSITION_KEY, ButtonPosition, PreferenceStore};
pub use store::{RecordStore, Selection, View};
