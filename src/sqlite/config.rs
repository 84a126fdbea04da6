use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::driver::{Connection, ConnectionFactory};
use crate::error::SqlResult;
use crate::executor::SqlExecutor;

use super::connection::{SqliteConnection, open_raw};

const IN_MEMORY: &str = ":memory:";

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Open one connection up front and lend it to every call instead of opening per call.
    pub shared: bool,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            db_path: IN_MEMORY.to_string(),
            shared: false,
            busy_timeout_ms: 5_000,
        }
    }
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            ..Self::default()
        }
    }

    /// A private in-memory database.
    ///
    /// Every `SQLite` in-memory connection is its own database, so these options are shared:
    /// all calls see the same tables.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            shared: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_empty() || self.db_path == IN_MEMORY
    }

    /// Build a connection factory for these options.
    ///
    /// # Errors
    /// For shared options, returns the rusqlite error if the lent connection cannot be opened.
    pub fn factory(&self) -> SqlResult<ConnectionFactory> {
        let factory: ConnectionFactory = if self.shared {
            let handle = Arc::new(Mutex::new(open_raw(self)?));
            Arc::new(move || -> SqlResult<Box<dyn Connection>> {
                Ok(Box::new(SqliteConnection::shared(Arc::clone(&handle))))
            })
        } else {
            let opts = self.clone();
            Arc::new(move || -> SqlResult<Box<dyn Connection>> {
                Ok(Box::new(SqliteConnection::open(&opts)?))
            })
        };
        Ok(factory)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.opts.shared = shared;
        self
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.opts.busy_timeout_ms = busy_timeout_ms;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build an executor over these options.
    ///
    /// # Errors
    /// See [`SqliteOptions::factory`].
    pub fn build(self) -> SqlResult<SqlExecutor> {
        SqlExecutor::sqlite(&self.finish())
    }
}

impl SqlExecutor {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Executor opening `SQLite` connections per `opts`.
    ///
    /// # Errors
    /// See [`SqliteOptions::factory`].
    pub fn sqlite(opts: &SqliteOptions) -> SqlResult<Self> {
        Ok(Self::from_factory(opts.factory()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let opts: SqliteOptions = serde_json::from_str(r#"{"db_path": "app.db"}"#).unwrap();
        assert_eq!(opts, SqliteOptions::new("app.db".into()));
        assert!(!opts.shared);
        assert_eq!(opts.busy_timeout_ms, 5_000);

        let opts: SqliteOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.is_in_memory());
    }

    #[test]
    fn builder_sets_every_option() {
        let opts = SqlExecutor::sqlite_builder("x.db".into())
            .shared(true)
            .busy_timeout_ms(10)
            .finish();
        assert_eq!(
            opts,
            SqliteOptions {
                db_path: "x.db".into(),
                shared: true,
                busy_timeout_ms: 10,
            }
        );
    }

    #[test]
    fn shared_factory_lends_one_database() {
        let factory = SqliteOptions::in_memory().factory().unwrap();
        let mut first = factory().unwrap();
        let mut create = first.prepare("create table t (a int)").unwrap();
        create.execute().unwrap();
        create.close().unwrap();

        // a second call sees the table created through the first
        let mut second = factory().unwrap();
        assert!(second.prepare("select a from t").is_ok());
    }
}
