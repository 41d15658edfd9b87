//! SQLite implementation of the sync destination.

mod destination;

pub use destination::{load_table_columns, SqliteDestination};
