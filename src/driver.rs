//! Driver boundary.
//!
//! The executor only talks to a database through these traits. A backend supplies a
//! [`ConnectionFactory`] and the connection, statement and result stream types behind it;
//! the built-in `SQLite` backend lives in [`crate::sqlite`].

use std::any::Any;
use std::sync::Arc;

use crate::error::SqlResult;
use crate::types::SqlValue;

/// Produces one fresh connection per executor call.
///
/// Pooling, if wanted, belongs behind this function.
pub type ConnectionFactory = Arc<dyn Fn() -> SqlResult<Box<dyn Connection>> + Send + Sync>;

/// Whether the resource closer may close a connection it tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// Close the connection when the executor call finishes.
    #[default]
    Close,
    /// The connection's lifecycle is owned elsewhere; never close it.
    External,
}

/// An open database session that can prepare statements.
pub trait Connection {
    /// Prepare `sql` for binding and execution.
    ///
    /// # Errors
    /// Returns the driver failure when the statement cannot be prepared.
    fn prepare(&mut self, sql: &str) -> SqlResult<Box<dyn Statement>>;

    fn release_policy(&self) -> ReleasePolicy {
        ReleasePolicy::Close
    }

    /// Release the connection.
    ///
    /// # Errors
    /// Returns the driver failure raised while closing.
    fn close(&mut self) -> SqlResult<()>;
}

/// A prepared statement that accepts 1-based binds and runs once per executor call.
pub trait Statement {
    /// The SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    /// Bind `value` at the 1-based `position`.
    ///
    /// # Errors
    /// Returns an error if the position is out of range or the value is rejected.
    fn bind(&mut self, position: usize, value: SqlValue) -> SqlResult<()>;

    /// Run the statement. Returns `true` when it produced a result set.
    ///
    /// # Errors
    /// Returns the driver failure raised during execution.
    fn execute(&mut self) -> SqlResult<bool>;

    /// Run a DML/DDL statement and return the affected row count.
    ///
    /// # Errors
    /// Returns the driver failure raised during execution.
    fn execute_update(&mut self) -> SqlResult<usize>;

    /// Run a query and return its result stream.
    ///
    /// # Errors
    /// Returns the driver failure raised during execution.
    fn execute_query(&mut self) -> SqlResult<Box<dyn ResultStream>>;

    /// Release the statement.
    ///
    /// # Errors
    /// Returns the driver failure raised while closing.
    fn close(&mut self) -> SqlResult<()>;

    /// Downcast hook for driver-specific deferred bindings.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Forward-only stream over one query's rows.
pub trait ResultStream {
    /// Step to the next row. Returns `false` once exhausted.
    ///
    /// # Errors
    /// Returns the driver failure raised while stepping.
    fn next(&mut self) -> SqlResult<bool>;

    fn column_count(&self) -> usize;

    /// Name of the 0-based column `index`.
    fn column_name(&self, index: usize) -> Option<&str>;

    /// Value at the 0-based column `index` of the current row.
    ///
    /// # Errors
    /// Returns an error when there is no current row or the index is out of range.
    fn value(&self, index: usize) -> SqlResult<SqlValue>;

    /// Release the stream.
    ///
    /// # Errors
    /// Returns the driver failure raised while closing.
    fn close(&mut self) -> SqlResult<()>;
}
