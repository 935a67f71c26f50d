use rusqlite::types::Value;
use rusqlite::ToSql;

use crate::error::EngineError;
use crate::types::SqlValue;

/// Bind engine values to SQLite types.
///
/// # Errors
/// Currently infallible; the `Result` keeps the conversion seam uniform
/// with the Postgres side.
pub fn convert_params(params: &[SqlValue]) -> Result<Vec<Value>, EngineError> {
    let mut converted = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            SqlValue::Int(i) => Value::Integer(*i),
            SqlValue::Float(f) => Value::Real(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
            SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
            SqlValue::Null => Value::Null,
            SqlValue::Json(jsval) => Value::Text(jsval.to_string()),
            SqlValue::Blob(bytes) => Value::Blob(bytes.clone()),
        };
        converted.push(v);
    }
    Ok(converted)
}

pub(crate) fn values_as_tosql(values: &[Value]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}
