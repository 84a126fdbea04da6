//! Scoped tracking of opened database resources.
//!
//! Resources are pushed as they are acquired and released in reverse order when the scope
//! ends: cursors first, then statements, then connections. A failed release does not stop the
//! remaining ones; every failure is logged and the first is reported.

use crate::cursor::RowCursor;
use crate::driver::{Connection, ReleasePolicy, Statement};
use crate::error::SqlResult;
use crate::error::SqlTemplateError;

/// Resources opened during one executor call, released together when it ends.
#[derive(Default)]
pub struct ResourceCloser {
    connections: Vec<Box<dyn Connection>>,
    statements: Vec<Box<dyn Statement>>,
    cursors: Vec<RowCursor>,
    failures: Vec<SqlTemplateError>,
}

impl ResourceCloser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` with a fresh closer and release everything it registered.
    ///
    /// A failure from `body` takes precedence; a release failure is only returned when the
    /// body itself succeeded.
    ///
    /// # Errors
    /// Returns the body's error, or else the first release failure.
    pub fn scope<T, F>(body: F) -> SqlResult<T>
    where
        F: FnOnce(&mut ResourceCloser) -> SqlResult<T>,
    {
        let mut closer = ResourceCloser::new();
        let outcome = body(&mut closer);
        let released = closer.close();
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                tracing::debug!(
                    error = %release_err,
                    "release failure suppressed by earlier operation failure"
                );
                Err(err)
            }
        }
    }

    pub fn register_connection(&mut self, connection: Box<dyn Connection>) -> &mut dyn Connection {
        let idx = self.connections.len();
        self.connections.push(connection);
        &mut *self.connections[idx]
    }

    pub fn register_statement(&mut self, statement: Box<dyn Statement>) -> &mut dyn Statement {
        let idx = self.statements.len();
        self.statements.push(statement);
        &mut *self.statements[idx]
    }

    /// Track a cursor together with the result stream it owns.
    pub fn register_cursor(&mut self, cursor: RowCursor) -> &mut RowCursor {
        let idx = self.cursors.len();
        self.cursors.push(cursor);
        &mut self.cursors[idx]
    }

    /// Number of resources still awaiting release.
    #[must_use]
    pub fn open_resources(&self) -> usize {
        self.connections.len() + self.statements.len() + self.cursors.len()
    }

    /// Release every tracked resource.
    ///
    /// # Errors
    /// Returns the first release failure after every resource has had a release attempt.
    pub fn close(mut self) -> SqlResult<()> {
        self.release_all();
        let failures = std::mem::take(&mut self.failures);
        for failure in &failures {
            tracing::warn!(error = %failure, "problem closing resource");
        }
        match failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    fn release_all(&mut self) {
        while let Some(mut cursor) = self.cursors.pop() {
            tracing::trace!(kind = "cursor", "closing");
            if let Err(e) = cursor.close() {
                self.failures.push(e);
            }
        }

        while let Some(mut statement) = self.statements.pop() {
            tracing::trace!(kind = "statement", sql = statement.sql(), "closing");
            if let Err(e) = statement.close() {
                self.failures.push(e);
            }
        }

        while let Some(mut connection) = self.connections.pop() {
            if connection.release_policy() == ReleasePolicy::External {
                tracing::trace!(kind = "connection", "externally managed; not closing");
                continue;
            }
            tracing::trace!(kind = "connection", "closing");
            if let Err(e) = connection.close() {
                self.failures.push(e);
            }
        }
    }
}

impl Drop for ResourceCloser {
    fn drop(&mut self) {
        // Only reached with resources left when `close` was skipped, e.g. a panicking mapper.
        if self.open_resources() == 0 {
            return;
        }
        self.release_all();
        for failure in self.failures.drain(..) {
            tracing::warn!(error = %failure, "problem closing resource");
        }
    }
}
