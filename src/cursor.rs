//! Forward-only row access and the callbacks that consume it.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::driver::ResultStream;
use crate::error::{SqlResult, SqlTemplateError};
use crate::types::SqlValue;

/// Forward-only view over one query's rows.
///
/// Call [`advance`](RowCursor::advance) before every read. Column indexes are 1-based and
/// every accessor returns `Ok(None)` for SQL NULL.
pub struct RowCursor {
    stream: Box<dyn ResultStream>,
    // Internal cache for faster column lookups by name
    column_index_cache: HashMap<String, usize>,
    on_row: bool,
    exhausted: bool,
}

impl RowCursor {
    #[must_use]
    pub fn new(stream: Box<dyn ResultStream>) -> Self {
        let column_index_cache = (0..stream.column_count())
            .filter_map(|i| stream.column_name(i).map(|name| (name.to_string(), i + 1)))
            .collect();
        Self {
            stream,
            column_index_cache,
            on_row: false,
            exhausted: false,
        }
    }

    /// Step to the next row. Returns `false` once the stream is exhausted.
    ///
    /// # Errors
    /// Returns the backend failure raised while stepping.
    pub fn advance(&mut self) -> SqlResult<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let has_row = self.stream.next()?;
        self.on_row = has_row;
        self.exhausted = !has_row;
        Ok(has_row)
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.stream.column_count()
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        (0..self.stream.column_count())
            .map(|i| self.stream.column_name(i).unwrap_or_default().to_string())
            .collect()
    }

    /// 1-based index of the column called `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(name) {
            return Some(idx);
        }
        self.column_names()
            .iter()
            .position(|col| col.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
    }

    /// Raw value of `column` in the current row.
    ///
    /// # Errors
    /// Returns `ExecutionError` when the cursor is not on a row and `InvalidArgument` when
    /// `column` is 0 or past the last column.
    pub fn get_value(&self, column: usize) -> SqlResult<Option<SqlValue>> {
        if !self.on_row {
            return Err(SqlTemplateError::ExecutionError(
                "cursor is not positioned on a row; call advance() first".into(),
            ));
        }
        let count = self.stream.column_count();
        if column == 0 || column > count {
            return Err(SqlTemplateError::InvalidArgument(format!(
                "column index {column} out of range 1..={count}"
            )));
        }
        let value = self.stream.value(column - 1)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for non-UTF-8 blobs.
    pub fn get_string(&self, column: usize) -> SqlResult<Option<String>> {
        self.convert(column, "string", |value| match value {
            SqlValue::Text(s) => Some(s),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Timestamp(ts) => Some(ts.format("%F %T%.f").to_string()),
            SqlValue::JSON(json) => Some(json.to_string()),
            SqlValue::Blob(bytes) => String::from_utf8(bytes).ok(),
            SqlValue::Null => None,
        })
    }

    /// # Errors
    /// See [`get_long`](RowCursor::get_long); also `ConversionError` when the value does not
    /// fit in an `i32`.
    pub fn get_int(&self, column: usize) -> SqlResult<Option<i32>> {
        match self.get_long(column)? {
            None => Ok(None),
            Some(v) => i32::try_from(v).map(Some).map_err(|_| {
                SqlTemplateError::ConversionError(format!(
                    "column {column} value {v} does not fit in an int"
                ))
            }),
        }
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for non-numeric values.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_long(&self, column: usize) -> SqlResult<Option<i64>> {
        self.convert(column, "long", |value| match value {
            SqlValue::Int(i) => Some(i),
            SqlValue::Float(f) => Some(f as i64),
            SqlValue::Bool(b) => Some(i64::from(b)),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for non-numeric values.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_double(&self, column: usize) -> SqlResult<Option<f64>> {
        self.convert(column, "double", |value| match value {
            SqlValue::Int(i) => Some(i as f64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            other => other.as_float(),
        })
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for values other than
    /// booleans, 0/1 and `true`/`false` text.
    pub fn get_bool(&self, column: usize) -> SqlResult<Option<bool>> {
        self.convert(column, "bool", |value| match value {
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            other => other.as_bool().copied(),
        })
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value).
    pub fn get_bytes(&self, column: usize) -> SqlResult<Option<Vec<u8>>> {
        self.convert(column, "bytes", |value| match value {
            SqlValue::Text(s) => Some(s.into_bytes()),
            other => other.as_blob().map(<[u8]>::to_vec),
        })
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for unparseable text.
    pub fn get_timestamp(&self, column: usize) -> SqlResult<Option<NaiveDateTime>> {
        self.convert(column, "timestamp", |value| value.as_timestamp())
    }

    /// # Errors
    /// See [`get_value`](RowCursor::get_value); also `ConversionError` for text that is not
    /// valid JSON.
    pub fn get_json(&self, column: usize) -> SqlResult<Option<JsonValue>> {
        self.convert(column, "json", |value| match value {
            SqlValue::JSON(json) => Some(json),
            SqlValue::Text(s) => serde_json::from_str(&s).ok(),
            SqlValue::Int(i) => Some(JsonValue::from(i)),
            SqlValue::Float(f) => Some(JsonValue::from(f)),
            SqlValue::Bool(b) => Some(JsonValue::from(b)),
            _ => None,
        })
    }

    fn convert<T>(
        &self,
        column: usize,
        kind: &str,
        f: impl FnOnce(SqlValue) -> Option<T>,
    ) -> SqlResult<Option<T>> {
        let Some(value) = self.get_value(column)? else {
            return Ok(None);
        };
        let shown = format!("{value:?}");
        f(value).map(Some).ok_or_else(|| {
            SqlTemplateError::ConversionError(format!("cannot read column {column} as {kind}: {shown}"))
        })
    }

    pub(crate) fn close(&mut self) -> SqlResult<()> {
        self.on_row = false;
        self.exhausted = true;
        self.stream.close()
    }
}

/// Maps the cursor's current row to a value. Invoked once per row.
pub trait RowMapper<T> {
    /// # Errors
    /// Any error aborts the query and is returned to the caller unchanged.
    fn map_row(&mut self, row: &RowCursor) -> SqlResult<T>;
}

impl<T, F> RowMapper<T> for F
where
    F: FnMut(&RowCursor) -> SqlResult<T>,
{
    fn map_row(&mut self, row: &RowCursor) -> SqlResult<T> {
        self(row)
    }
}

/// Consumes a whole, not yet advanced, result stream.
pub trait ResultProcessor<T> {
    /// # Errors
    /// Any error aborts the query and is returned to the caller unchanged.
    fn process(self, rows: &mut RowCursor) -> SqlResult<T>;
}

impl<T, F> ResultProcessor<T> for F
where
    F: FnOnce(&mut RowCursor) -> SqlResult<T>,
{
    fn process(self, rows: &mut RowCursor) -> SqlResult<T> {
        self(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecStream {
        columns: Vec<&'static str>,
        rows: Vec<Vec<SqlValue>>,
        pos: Option<usize>,
    }

    impl ResultStream for VecStream {
        fn next(&mut self) -> SqlResult<bool> {
            let next = self.pos.map_or(0, |p| p + 1);
            self.pos = Some(next);
            Ok(next < self.rows.len())
        }

        fn column_count(&self) -> usize {
            self.columns.len()
        }

        fn column_name(&self, index: usize) -> Option<&str> {
            self.columns.get(index).copied()
        }

        fn value(&self, index: usize) -> SqlResult<SqlValue> {
            self.pos
                .and_then(|p| self.rows.get(p))
                .and_then(|row| row.get(index))
                .cloned()
                .ok_or_else(|| SqlTemplateError::ExecutionError("no row".into()))
        }

        fn close(&mut self) -> SqlResult<()> {
            Ok(())
        }
    }

    fn cursor(rows: Vec<Vec<SqlValue>>) -> RowCursor {
        RowCursor::new(Box::new(VecStream {
            columns: vec!["name", "age"],
            rows,
            pos: None,
        }))
    }

    #[test]
    fn reads_require_advance() {
        let mut c = cursor(vec![vec![SqlValue::Text("homer".into()), SqlValue::Int(7)]]);
        let err = c.get_string(1).unwrap_err();
        assert!(matches!(err, SqlTemplateError::ExecutionError(_)));

        assert!(c.advance().unwrap());
        assert_eq!(c.get_string(1).unwrap().as_deref(), Some("homer"));
        assert_eq!(c.get_int(2).unwrap(), Some(7));

        assert!(!c.advance().unwrap());
        assert!(!c.advance().unwrap());
        assert!(c.get_int(2).is_err());
    }

    #[test]
    fn null_reads_as_none() {
        let mut c = cursor(vec![vec![SqlValue::Null, SqlValue::Null]]);
        assert!(c.advance().unwrap());
        assert_eq!(c.get_string(1).unwrap(), None);
        assert_eq!(c.get_int(2).unwrap(), None);
        assert_eq!(c.get_json(2).unwrap(), None);
    }

    #[test]
    fn column_index_out_of_range_is_invalid_argument() {
        let mut c = cursor(vec![vec![SqlValue::Int(1), SqlValue::Int(2)]]);
        c.advance().unwrap();
        assert!(matches!(
            c.get_value(0),
            Err(SqlTemplateError::InvalidArgument(_))
        ));
        assert!(matches!(
            c.get_value(3),
            Err(SqlTemplateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn converts_between_scalar_kinds() {
        let mut c = cursor(vec![vec![
            SqlValue::Text(" 42 ".into()),
            SqlValue::Int(i64::from(i32::MAX) + 1),
        ]]);
        c.advance().unwrap();
        assert_eq!(c.get_long(1).unwrap(), Some(42));
        assert_eq!(c.get_double(1).unwrap(), Some(42.0));
        assert_eq!(c.get_string(2).unwrap().as_deref(), Some("2147483648"));
        assert!(matches!(
            c.get_int(2),
            Err(SqlTemplateError::ConversionError(_))
        ));
        assert!(matches!(
            c.get_timestamp(1),
            Err(SqlTemplateError::ConversionError(_))
        ));
    }

    #[test]
    fn reads_floats_and_blobs() {
        let mut c = cursor(vec![vec![SqlValue::Float(2.5), SqlValue::Blob(vec![0xde, 0xad])]]);
        c.advance().unwrap();
        assert_eq!(c.get_double(1).unwrap(), Some(2.5));
        assert_eq!(c.get_long(1).unwrap(), Some(2));
        assert_eq!(c.get_bytes(2).unwrap(), Some(vec![0xde, 0xad]));
        assert!(matches!(
            c.get_bytes(1),
            Err(SqlTemplateError::ConversionError(_))
        ));
        assert!(matches!(
            c.get_double(2),
            Err(SqlTemplateError::ConversionError(_))
        ));
    }

    #[test]
    fn column_lookup_by_name() {
        let c = cursor(Vec::new());
        assert_eq!(c.column_index("age"), Some(2));
        assert_eq!(c.column_index("AGE"), Some(2));
        assert_eq!(c.column_index("missing"), None);
        assert_eq!(c.column_names(), vec!["name".to_string(), "age".to_string()]);
    }
}
