use std::error::Error as _;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::NoTls;

use crate::bootstrap::{BootstrapStrategy, BoxedConnection, DriverBootstrap, DriverConnection};
use crate::error::{EngineError, ErrorClass};
use crate::results::QueryResult;
use crate::types::{ConnectTarget, PlaceholderStyle, SqlValue};

use super::params::Params;
use super::query::build_result_set;

/// Default resolution strategy for the PostgreSQL driver.
pub struct PostgresStrategy;

impl BootstrapStrategy for PostgresStrategy {
    fn resolve(&self) -> Result<Arc<dyn DriverBootstrap>, EngineError> {
        Ok(Arc::new(PostgresBootstrap))
    }
}

/// PostgreSQL driver entry point.
pub struct PostgresBootstrap;

#[async_trait]
impl DriverBootstrap for PostgresBootstrap {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<BoxedConnection, EngineError> {
        let ConnectTarget::Server {
            host,
            port,
            user,
            password,
            dbname,
        } = target
        else {
            return Err(EngineError::Unsupported(
                "file-based connect is not supported by the postgres backend".to_string(),
            ));
        };
        if host.is_empty() {
            return Err(EngineError::ConfigError("host is required".to_string()));
        }
        if dbname.is_empty() {
            return Err(EngineError::ConfigError("dbname is required".to_string()));
        }

        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .port(*port)
            .user(user)
            .password(password)
            .dbname(dbname);
        let (client, connection) = config.connect(NoTls).await?;
        // the connection future carries the socket I/O and must be polled
        let io = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "postgres connection task ended");
            }
        });
        Ok(Box::new(PostgresConnection { client, io }))
    }

    fn classify(&self, error: &EngineError) -> ErrorClass {
        match error {
            EngineError::Postgres(err) => {
                if err.is_closed() || has_io_cause(err) {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Query
                }
            }
            EngineError::ConnectionError(_) => ErrorClass::Transient,
            _ => ErrorClass::Query,
        }
    }
}

fn has_io_cause(err: &tokio_postgres::Error) -> bool {
    let mut cause = err.source();
    while let Some(current) = cause {
        if current.is::<std::io::Error>() {
            return true;
        }
        cause = current.source();
    }
    false
}

struct PostgresConnection {
    client: tokio_postgres::Client,
    io: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, EngineError> {
        let stmt = self.client.prepare(sql).await?;
        let converted = Params::convert(params);
        if stmt.columns().is_empty() {
            let affected = self.client.execute(&stmt, converted.as_refs()).await?;
            let affected = usize::try_from(affected).map_err(|e| {
                EngineError::ExecutionError(format!("affected-rows conversion error: {e}"))
            })?;
            Ok(QueryResult::from_rows_affected(affected))
        } else {
            let rows = self.client.query(&stmt, converted.as_refs()).await?;
            build_result_set(&stmt, &rows)
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        // dropping the client ends the session; stop the I/O task with it
        self.io.abort();
        Ok(())
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.io.abort();
    }
}
