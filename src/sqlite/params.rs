use rusqlite::types::Value;

use crate::types::SqlValue;

/// Convert a bound [`SqlValue`] to the value rusqlite stores.
///
/// `SQLite` has no boolean, timestamp or JSON storage class: booleans become 0/1 and
/// timestamps and JSON are stored as text.
#[must_use]
pub fn sql_value_to_sqlite_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(i),
        SqlValue::Float(f) => Value::Real(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Bool(b) => Value::Integer(i64::from(b)),
        SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        SqlValue::Null => Value::Null,
        SqlValue::JSON(jval) => Value::Text(jval.to_string()),
        SqlValue::Blob(bytes) => Value::Blob(bytes),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn storage_classes() {
        assert_eq!(sql_value_to_sqlite_value(SqlValue::Bool(true)), Value::Integer(1));
        assert_eq!(sql_value_to_sqlite_value(SqlValue::Bool(false)), Value::Integer(0));
        assert_eq!(sql_value_to_sqlite_value(SqlValue::Null), Value::Null);
        assert_eq!(
            sql_value_to_sqlite_value(SqlValue::Blob(vec![1, 2])),
            Value::Blob(vec![1, 2])
        );
    }

    #[test]
    fn timestamps_and_json_become_text() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap();
        assert_eq!(
            sql_value_to_sqlite_value(SqlValue::Timestamp(ts)),
            Value::Text("2024-03-01 12:30:05".into())
        );
        assert_eq!(
            sql_value_to_sqlite_value(SqlValue::JSON(json!({"a": 1}))),
            Value::Text(r#"{"a":1}"#.into())
        );
    }
}
