use serde::Serialize;

use crate::types::SqlValue;

/// The accumulated result of one executed query.
///
/// Immutable once handed to subscribers; emitted exactly once per
/// successfully executed query. Row-returning statements carry `columns`
/// and `rows`; DML statements carry only `rows_affected`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Ordered column names, empty for DML.
    pub columns: Vec<String>,
    /// Ordered rows, each one value per column.
    pub rows: Vec<Vec<SqlValue>>,
    /// Number of rows returned or affected.
    pub rows_affected: usize,
}

impl QueryResult {
    /// Create an empty result set with known column names.
    #[must_use]
    pub fn with_columns(columns: Vec<String>) -> Self {
        QueryResult {
            columns,
            rows: Vec::new(),
            rows_affected: 0,
        }
    }

    /// Create a result for a DML statement that returned no rows.
    #[must_use]
    pub fn from_rows_affected(rows_affected: usize) -> Self {
        QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        }
    }

    /// Append a row; keeps `rows_affected` in step for SELECTs.
    pub fn push_row(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
        self.rows_affected += 1;
    }

    /// Index of a column by name, if present.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == column_name)
    }

    /// Value at `(row, column_name)`, if both exist.
    #[must_use]
    pub fn get(&self, row: usize, column_name: &str) -> Option<&SqlValue> {
        let idx = self.column_index(column_name)?;
        self.rows.get(row)?.get(idx)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup() {
        let mut rs = QueryResult::with_columns(vec!["a".into(), "b".into()]);
        rs.push_row(vec![SqlValue::Int(1), SqlValue::Text("x".into())]);
        assert_eq!(rs.rows_affected, 1);
        assert_eq!(rs.get(0, "b").and_then(SqlValue::as_text), Some("x"));
        assert!(rs.get(0, "missing").is_none());
        assert!(rs.get(1, "a").is_none());
    }
}
