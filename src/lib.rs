//! Named-placeholder SQL templates with scoped statement execution.
//!
//! Build SQL from fragments containing `{{name}}` placeholders, bind values by name or
//! position, and run it through a [`SqlExecutor`]. Every connection, statement and cursor an
//! executor call opens is released before the call returns, in reverse order of
//! acquisition, whether the call succeeds or fails.
//!
//! ```rust,no_run
//! use sql_template::prelude::*;
//!
//! # fn demo() -> SqlResult<()> {
//! let db = SqlExecutor::sqlite(&SqliteOptions::new("app.db".into()))?;
//!
//! let names = db.query(
//!     |t| {
//!         t.sql("select name from users");
//!         t.sql_with("where team={{team}}", [42])?;
//!         Ok(())
//!     },
//!     |row: &RowCursor| -> SqlResult<String> { Ok(row.get_string(1)?.unwrap_or_default()) },
//! )?;
//! # let _ = names;
//! # Ok(())
//! # }
//! ```
//!
//! Other backends implement the traits in [`driver`] and hand the executor a
//! [`ConnectionFactory`].

pub mod closer;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod template;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use closer::ResourceCloser;
pub use cursor::{ResultProcessor, RowCursor, RowMapper};
pub use driver::{Connection, ConnectionFactory, ReleasePolicy, ResultStream, Statement};
pub use error::{SqlResult, SqlTemplateError};
pub use executor::{SqlExecutor, set_global_factory};
pub use template::{BindKey, DeferredBinding, Template};
pub use types::{SqlValue, ToSqlValue};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder, SqliteStatement};
