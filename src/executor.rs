//! The execution pipeline: build a template, then connect, prepare, bind, execute and
//! shape the result inside one resource scope.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::closer::ResourceCloser;
use crate::cursor::{ResultProcessor, RowCursor, RowMapper};
use crate::driver::{Connection, ConnectionFactory, Statement};
use crate::error::{SqlResult, SqlTemplateError};
use crate::template::Template;
use crate::types::ToSqlValue;

static GLOBAL_FACTORY: OnceLock<ConnectionFactory> = OnceLock::new();

/// Install the process-wide default connection factory used by [`SqlExecutor::global`].
///
/// Prefer handing factories to [`SqlExecutor::new`]; the global form is meant for the top of
/// an application.
///
/// # Errors
/// Returns `IllegalState` if a default factory was already installed.
pub fn set_global_factory<F>(factory: F) -> SqlResult<()>
where
    F: Fn() -> SqlResult<Box<dyn Connection>> + Send + Sync + 'static,
{
    GLOBAL_FACTORY
        .set(Arc::new(factory))
        .map_err(|_| SqlTemplateError::IllegalState("global connection factory already set".into()))
}

/// Runs templates against connections from a factory, releasing every resource it opens.
///
/// ```rust,no_run
/// use sql_template::prelude::*;
///
/// # fn demo() -> SqlResult<()> {
/// let db = SqlExecutor::sqlite(&SqliteOptions::new("app.db".into()))?;
/// db.execute_sql("create table test (name varchar(10), age int)")?;
/// db.execute_update_with("insert into test (name,age) values ({{name}}, {{age}})", [
///     SqlValue::from("homer"),
///     SqlValue::from(7),
/// ])?;
///
/// let age = db.query_int(|t| {
///     t.sql_with("select age from test where name={{name}}", ["homer"])?;
///     Ok(())
/// })?;
/// assert_eq!(age, 7);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqlExecutor {
    factory: ConnectionFactory,
}

impl SqlExecutor {
    /// Executor calling `factory` once per operation for a fresh connection.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> SqlResult<Box<dyn Connection>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    #[must_use]
    pub fn from_factory(factory: ConnectionFactory) -> Self {
        Self { factory }
    }

    /// Executor over the process-wide default factory.
    ///
    /// # Errors
    /// Returns `IllegalState` until [`set_global_factory`] has been called.
    pub fn global() -> SqlResult<Self> {
        GLOBAL_FACTORY
            .get()
            .map(|factory| Self::from_factory(Arc::clone(factory)))
            .ok_or_else(|| SqlTemplateError::IllegalState("global connection factory not set".into()))
    }

    fn build<B>(configure: B) -> SqlResult<(Template, String)>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
    {
        let mut template = Template::new();
        configure(&mut template)?;
        let sql = template.render();
        Ok((template, sql))
    }

    /// Open a connection, prepare `sql` on it and bind the template, registering both.
    fn prepare<'c>(
        &self,
        closer: &'c mut ResourceCloser,
        template: &mut Template,
        sql: &str,
    ) -> SqlResult<&'c mut dyn Statement> {
        let connection = closer.register_connection((self.factory)()?);
        let statement = connection.prepare(sql)?;
        let statement = closer.register_statement(statement);
        tracing::debug!(sql, params = ?template.resolved_values(), "executing statement");
        template.bind_to(statement)?;
        Ok(statement)
    }

    /// Run a query, mapping each row in cursor order.
    ///
    /// # Errors
    /// Returns the first failure from building, connecting, preparing, binding, executing or
    /// mapping; a release failure is returned only when everything else succeeded.
    pub fn query<T, B, M>(&self, configure: B, mut mapper: M) -> SqlResult<Vec<T>>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
        M: RowMapper<T>,
    {
        let (mut template, sql) = Self::build(configure)?;
        ResourceCloser::scope(|closer| {
            let stream = self.prepare(closer, &mut template, &sql)?.execute_query()?;
            let cursor = closer.register_cursor(RowCursor::new(stream));
            let mut results = Vec::new();
            while cursor.advance()? {
                results.push(mapper.map_row(cursor)?);
            }
            Ok(results)
        })
    }

    /// First mapped row, or `None` when the query returns nothing.
    ///
    /// # Errors
    /// See [`query`](SqlExecutor::query).
    pub fn query_first<T, B, M>(&self, configure: B, mapper: M) -> SqlResult<Option<T>>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
        M: RowMapper<T>,
    {
        Ok(self.query(configure, mapper)?.into_iter().next())
    }

    /// Column 1 of the first row as a string.
    ///
    /// # Errors
    /// Returns `NoResult` when there is no row or the value is NULL.
    pub fn query_string<B>(&self, configure: B) -> SqlResult<String>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
    {
        match self.query_first(configure, |row: &RowCursor| row.get_string(1))? {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(SqlTemplateError::NoResult(
                "query_string expected a non-null result".into(),
            )),
            None => Err(SqlTemplateError::NoResult(
                "query_string expected a result".into(),
            )),
        }
    }

    /// Column 1 of the first row as an int. NULL reads as `0`.
    ///
    /// # Errors
    /// Returns `NoResult` when there is no row.
    pub fn query_int<B>(&self, configure: B) -> SqlResult<i32>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
    {
        self.query_first(configure, |row: &RowCursor| -> SqlResult<i32> {
            Ok(row.get_int(1)?.unwrap_or(0))
        })?
        .ok_or_else(|| SqlTemplateError::NoResult("query_int expected a result".into()))
    }

    /// Hand the whole, not yet advanced, result to `processor`.
    ///
    /// # Errors
    /// See [`query`](SqlExecutor::query).
    pub fn query_result<T, B, P>(&self, configure: B, processor: P) -> SqlResult<T>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
        P: ResultProcessor<T>,
    {
        let (mut template, sql) = Self::build(configure)?;
        ResourceCloser::scope(|closer| {
            let stream = self.prepare(closer, &mut template, &sql)?.execute_query()?;
            let cursor = closer.register_cursor(RowCursor::new(stream));
            processor.process(cursor)
        })
    }

    /// Run a statement; `true` means it produced a result set.
    ///
    /// # Errors
    /// See [`query`](SqlExecutor::query).
    pub fn execute<B>(&self, configure: B) -> SqlResult<bool>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
    {
        let (mut template, sql) = Self::build(configure)?;
        ResourceCloser::scope(|closer| self.prepare(closer, &mut template, &sql)?.execute())
    }

    /// Run a DML/DDL statement and return the affected row count.
    ///
    /// # Errors
    /// See [`query`](SqlExecutor::query).
    pub fn execute_update<B>(&self, configure: B) -> SqlResult<usize>
    where
        B: FnOnce(&mut Template) -> SqlResult<()>,
    {
        let (mut template, sql) = Self::build(configure)?;
        ResourceCloser::scope(|closer| {
            self.prepare(closer, &mut template, &sql)?
                .execute_update()
        })
    }

    /// # Errors
    /// See [`execute`](SqlExecutor::execute).
    pub fn execute_sql(&self, sql: &str) -> SqlResult<bool> {
        self.execute(|t| {
            t.sql(sql);
            Ok(())
        })
    }

    /// Run `sql`, binding `values` to positions 1..n.
    ///
    /// # Errors
    /// See [`execute`](SqlExecutor::execute).
    pub fn execute_with<I, V>(&self, sql: &str, values: I) -> SqlResult<bool>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.execute(|t| {
            bind_positional(t.sql(sql), values);
            Ok(())
        })
    }

    /// # Errors
    /// See [`execute_update`](SqlExecutor::execute_update).
    pub fn execute_update_sql(&self, sql: &str) -> SqlResult<usize> {
        self.execute_update(|t| {
            t.sql(sql);
            Ok(())
        })
    }

    /// Run a DML statement from `sql`, binding `values` to positions 1..n.
    ///
    /// # Errors
    /// See [`execute_update`](SqlExecutor::execute_update).
    pub fn execute_update_with<I, V>(&self, sql: &str, values: I) -> SqlResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.execute_update(|t| {
            bind_positional(t.sql(sql), values);
            Ok(())
        })
    }
}

fn bind_positional<I, V>(template: &mut Template, values: I)
where
    I: IntoIterator<Item = V>,
    V: ToSqlValue,
{
    for (i, value) in values.into_iter().enumerate() {
        template.bind(i + 1, value);
    }
}

impl fmt::Debug for SqlExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlExecutor").finish_non_exhaustive()
    }
}
