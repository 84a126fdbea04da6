//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::closer::ResourceCloser;
pub use crate::cursor::{ResultProcessor, RowCursor, RowMapper};
pub use crate::driver::{Connection, ConnectionFactory, ReleasePolicy, ResultStream, Statement};
pub use crate::error::{SqlResult, SqlTemplateError};
pub use crate::executor::{SqlExecutor, set_global_factory};
pub use crate::template::{BindKey, Template};
pub use crate::types::{SqlValue, ToSqlValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder, SqliteStatement};
