use rusqlite::types::Value;
use rusqlite::{Row, Statement, ToSql};

use crate::error::EngineError;
use crate::results::QueryResult;
use crate::types::SqlValue;

/// Extract a [`SqlValue`] from a SQLite row.
///
/// # Errors
/// Returns `EngineError::Sqlite` if the value cannot be read.
pub fn extract_value(row: &Row, idx: usize) -> Result<SqlValue, EngineError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

/// Run a prepared row-returning statement and accumulate every row into
/// one result set.
///
/// # Errors
/// Returns `EngineError::Sqlite` from execution or row reads.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<QueryResult, EngineError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    let mut result_set = QueryResult::with_columns(column_names);
    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        result_set.push_row(row_values);
    }
    Ok(result_set)
}
