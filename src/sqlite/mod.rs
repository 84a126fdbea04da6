// SQLite backend - implements the driver traits on top of rusqlite
//
// - config: connection options and the connection factory
// - connection: connection and prepared statement
// - params: SqlValue to rusqlite value conversion
// - query: result extraction into a materialized row stream

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use rusqlite;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::{SharedSqliteConnection, SqliteConnection, SqliteStatement};
pub use params::sql_value_to_sqlite_value;
pub use query::{SqliteRows, build_result_set};
