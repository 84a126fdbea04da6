use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::driver::{Connection, ReleasePolicy, ResultStream, Statement};
use crate::error::{SqlResult, SqlTemplateError};
use crate::types::SqlValue;

use super::config::SqliteOptions;
use super::params::sql_value_to_sqlite_value;
use super::query::build_result_set;

/// Handle shared between a connection and the statements prepared on it.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

fn lock(handle: &SharedSqliteConnection) -> MutexGuard<'_, rusqlite::Connection> {
    // A panic while holding the lock leaves rusqlite in a usable state.
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open a raw rusqlite connection for `opts`.
///
/// # Errors
/// Returns the rusqlite error if the database cannot be opened or configured.
pub(crate) fn open_raw(opts: &SqliteOptions) -> SqlResult<rusqlite::Connection> {
    let conn = if opts.is_in_memory() {
        rusqlite::Connection::open_in_memory()?
    } else {
        rusqlite::Connection::open(&opts.db_path)?
    };
    conn.busy_timeout(Duration::from_millis(opts.busy_timeout_ms))?;
    tracing::trace!(db_path = %opts.db_path, "opened sqlite connection");
    Ok(conn)
}

/// `SQLite` connection handed out by a [`SqliteOptions`] factory.
pub struct SqliteConnection {
    handle: Option<SharedSqliteConnection>,
    policy: ReleasePolicy,
}

impl SqliteConnection {
    /// Open a connection that is closed when the executor call finishes.
    ///
    /// # Errors
    /// Returns the rusqlite error if the database cannot be opened.
    pub fn open(opts: &SqliteOptions) -> SqlResult<Self> {
        Ok(Self {
            handle: Some(Arc::new(Mutex::new(open_raw(opts)?))),
            policy: ReleasePolicy::Close,
        })
    }

    /// Lend an existing handle. Its lifecycle stays with the caller.
    #[must_use]
    pub fn shared(handle: SharedSqliteConnection) -> Self {
        Self {
            handle: Some(handle),
            policy: ReleasePolicy::External,
        }
    }

    fn handle(&self) -> SqlResult<&SharedSqliteConnection> {
        self.handle
            .as_ref()
            .ok_or_else(|| SqlTemplateError::ConnectionError("sqlite connection is closed".into()))
    }
}

impl Connection for SqliteConnection {
    fn prepare(&mut self, sql: &str) -> SqlResult<Box<dyn Statement>> {
        let handle = self.handle()?;
        let param_count = {
            let conn = lock(handle);
            let stmt = conn.prepare_cached(sql)?;
            stmt.parameter_count()
        };
        Ok(Box::new(SqliteStatement {
            handle: Some(Arc::clone(handle)),
            sql: sql.to_string(),
            params: vec![Value::Null; param_count],
        }))
    }

    fn release_policy(&self) -> ReleasePolicy {
        self.policy
    }

    fn close(&mut self) -> SqlResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match Arc::try_unwrap(handle) {
            Ok(mutex) => {
                let conn = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
                conn.close().map_err(|(_, e)| e.into())
            }
            Err(_still_shared) => {
                tracing::trace!("sqlite handle still referenced; dropping this reference only");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("open", &self.handle.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Prepared `SQLite` statement.
///
/// The compiled statement lives in the connection's statement cache; this type keeps the SQL
/// text and the bound values until execution.
pub struct SqliteStatement {
    handle: Option<SharedSqliteConnection>,
    sql: String,
    params: Vec<Value>,
}

impl SqliteStatement {
    /// Bind a rusqlite value directly, bypassing [`SqlValue`] conversion.
    ///
    /// Meant for deferred bindings that downcast through [`Statement::as_any_mut`].
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `position` is not a parameter of this statement.
    pub fn bind_native(&mut self, position: usize, value: Value) -> SqlResult<()> {
        let count = self.params.len();
        let slot = position
            .checked_sub(1)
            .and_then(|idx| self.params.get_mut(idx))
            .ok_or_else(|| {
                SqlTemplateError::InvalidArgument(format!(
                    "parameter position {position} out of range 1..={count}"
                ))
            })?;
        *slot = value;
        Ok(())
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn handle(&self) -> SqlResult<&SharedSqliteConnection> {
        self.handle
            .as_ref()
            .ok_or_else(|| SqlTemplateError::ExecutionError("sqlite statement is closed".into()))
    }
}

impl Statement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, position: usize, value: SqlValue) -> SqlResult<()> {
        self.bind_native(position, sql_value_to_sqlite_value(value))
    }

    fn execute(&mut self) -> SqlResult<bool> {
        let conn = lock(self.handle()?);
        let mut stmt = conn.prepare_cached(&self.sql)?;
        if stmt.column_count() > 0 {
            let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
            rows.next()?;
            Ok(true)
        } else {
            stmt.execute(params_from_iter(self.params.iter()))?;
            Ok(false)
        }
    }

    fn execute_update(&mut self) -> SqlResult<usize> {
        let conn = lock(self.handle()?);
        let mut stmt = conn.prepare_cached(&self.sql)?;
        Ok(stmt.execute(params_from_iter(self.params.iter()))?)
    }

    fn execute_query(&mut self) -> SqlResult<Box<dyn ResultStream>> {
        let conn = lock(self.handle()?);
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let rows = build_result_set(&mut stmt, &self.params)?;
        Ok(Box::new(rows))
    }

    fn close(&mut self) -> SqlResult<()> {
        self.handle = None;
        self.params.clear();
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for SqliteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
