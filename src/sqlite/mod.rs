//! SQLite implementations of the gateways.

mod preference;
mod record;

pub use preference::{SQLitePreferenceGateway, create_preference_table};
pub use record::{SQLiteRecordGateway, create_record_table, map_record_row};
