use thiserror::Error;

/// Result alias used throughout the crate.
pub type SqlResult<T> = Result<T, SqlTemplateError>;

#[derive(Debug, Error)]
pub enum SqlTemplateError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Failure raised by a driver backend other than the built-in ones.
    #[error("Driver error: {message}")]
    Driver {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("expected {expected} bind values but got {actual} sql=<{sql}>")]
    BindArity {
        expected: usize,
        actual: usize,
        sql: String,
    },

    #[error("No result: {0}")]
    NoResult(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlTemplateError {
    /// Wrap a driver-native failure, keeping it as the error source.
    pub fn driver(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::NoResult(_))
    }

    #[must_use]
    pub fn is_bind_arity(&self) -> bool {
        matches!(self, Self::BindArity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn bind_arity_message_names_counts_and_sql() {
        let err = SqlTemplateError::BindArity {
            expected: 1,
            actual: 2,
            sql: "a={{x}}".into(),
        };
        assert_eq!(
            err.to_string(),
            "expected 1 bind values but got 2 sql=<a={{x}}>"
        );
        assert!(err.is_bind_arity());
        assert!(!err.is_no_result());
    }

    #[test]
    fn driver_error_keeps_source() {
        let io = std::io::Error::other("socket closed");
        let err = SqlTemplateError::driver("connect failed", io);
        assert_eq!(err.to_string(), "Driver error: connect failed");
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("socket closed".to_string())
        );
    }
}
