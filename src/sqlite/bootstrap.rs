use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bootstrap::{BootstrapStrategy, BoxedConnection, DriverBootstrap, DriverConnection};
use crate::error::{EngineError, ErrorClass};
use crate::results::QueryResult;
use crate::types::{ConnectTarget, PlaceholderStyle, SqlValue};

use super::params::{convert_params, values_as_tosql};
use super::query::build_result_set;

/// Default resolution strategy for the SQLite driver.
pub struct SqliteStrategy;

impl BootstrapStrategy for SqliteStrategy {
    fn resolve(&self) -> Result<Arc<dyn DriverBootstrap>, EngineError> {
        Ok(Arc::new(SqliteBootstrap))
    }
}

/// SQLite driver entry point. The database file is created on first
/// connect if absent.
pub struct SqliteBootstrap;

#[async_trait]
impl DriverBootstrap for SqliteBootstrap {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<BoxedConnection, EngineError> {
        let ConnectTarget::File(path) = target else {
            return Err(EngineError::Unsupported(
                "server-based connect is not supported by the sqlite backend".to_string(),
            ));
        };
        let path = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<rusqlite::Connection, EngineError> {
            let conn = rusqlite::Connection::open(path)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(conn)
        })
        .await
        .map_err(|e| EngineError::Other(format!("sqlite open task failed: {e}")))??;

        Ok(Box::new(SqliteConnection {
            conn: Arc::new(Mutex::new(conn)),
        }))
    }

    fn classify(&self, error: &EngineError) -> ErrorClass {
        match error {
            EngineError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => {
                match failure.code {
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                        ErrorClass::Transient
                    }
                    _ => ErrorClass::Query,
                }
            }
            EngineError::ConnectionError(_) => ErrorClass::Transient,
            _ => ErrorClass::Query,
        }
    }
}

/// One pooled SQLite session. The connection lives behind a mutex and is
/// exercised on the blocking thread pool; the engine's pool already hands
/// it to one dispatch task at a time, so the lock is uncontended.
struct SqliteConnection {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, EngineError> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let values = convert_params(params)?;
        tokio::task::spawn_blocking(move || {
            let guard = match conn.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut stmt = guard.prepare(&sql)?;
            if stmt.column_count() == 0 {
                let refs = values_as_tosql(&values);
                let affected = stmt.execute(&refs[..])?;
                Ok(QueryResult::from_rows_affected(affected))
            } else {
                build_result_set(&mut stmt, &values)
            }
        })
        .await
        .map_err(|e| EngineError::Other(format!("sqlite execute task failed: {e}")))?
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        // dropping the last Arc closes the underlying handle
        Ok(())
    }
}
