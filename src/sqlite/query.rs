use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::driver::ResultStream;
use crate::error::{SqlResult, SqlTemplateError};
use crate::types::SqlValue;

/// Extract a `SqlValue` from a `SQLite` row.
///
/// # Errors
/// Returns the rusqlite error if the column cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row<'_>, idx: usize) -> SqlResult<SqlValue> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

/// Run a prepared query and materialize every row.
///
/// # Errors
/// Returns the rusqlite error raised while binding, stepping or reading values.
pub fn build_result_set(stmt: &mut Statement<'_>, params: &[Value]) -> SqlResult<SqliteRows> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result = SqliteRows::new(Arc::new(column_names));

    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result.rows.push(row_values);
    }

    Ok(result)
}

/// Fully read `SQLite` result, streamed back one row at a time.
#[derive(Debug, Clone, Default)]
pub struct SqliteRows {
    column_names: Arc<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    position: Option<usize>,
}

impl SqliteRows {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>) -> Self {
        Self {
            column_names,
            rows: Vec::new(),
            position: None,
        }
    }
}

impl ResultStream for SqliteRows {
    fn next(&mut self) -> SqlResult<bool> {
        let next = self.position.map_or(0, |p| p + 1).min(self.rows.len());
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn column_count(&self) -> usize {
        self.column_names.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.column_names.get(index).map(String::as_str)
    }

    fn value(&self, index: usize) -> SqlResult<SqlValue> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| SqlTemplateError::ExecutionError("no current row".into()))?;
        row.get(index).cloned().ok_or_else(|| {
            SqlTemplateError::InvalidArgument(format!("column index {index} out of range"))
        })
    }

    fn close(&mut self) -> SqlResult<()> {
        self.rows.clear();
        self.position = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_rows_in_order() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "create table t (id integer, name text, score real, data blob);
             insert into t values (1, 'a', 1.5, x'0102');
             insert into t values (2, null, null, null);",
        )
        .unwrap();
        let mut stmt = conn
            .prepare("select id, name, score, data from t where id >= ? order by id")
            .unwrap();
        let mut rows = build_result_set(&mut stmt, &[Value::Integer(1)]).unwrap();

        assert_eq!(rows.column_count(), 4);
        assert_eq!(rows.column_name(1), Some("name"));

        assert!(rows.next().unwrap());
        assert_eq!(rows.value(0).unwrap(), SqlValue::Int(1));
        assert_eq!(rows.value(2).unwrap(), SqlValue::Float(1.5));
        assert_eq!(rows.value(3).unwrap(), SqlValue::Blob(vec![1, 2]));

        assert!(rows.next().unwrap());
        assert_eq!(rows.value(1).unwrap(), SqlValue::Null);

        assert!(!rows.next().unwrap());
        assert!(!rows.next().unwrap());
        assert!(rows.value(0).is_err());
    }

    #[test]
    fn value_before_first_row_fails() {
        let rows = SqliteRows::new(Arc::new(vec!["a".into()]));
        assert!(matches!(
            rows.value(0),
            Err(SqlTemplateError::ExecutionError(_))
        ));
    }
}
