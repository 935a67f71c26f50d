use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{EngineError, ErrorClass};
use crate::results::QueryResult;
use crate::types::{ConnectTarget, PlaceholderStyle, SqlValue};

/// One live database session, exclusively owned by the pool.
#[async_trait]
pub trait DriverConnection: Send {
    /// Run one statement and drain every result page into a single
    /// accumulated [`QueryResult`].
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, EngineError>;

    /// Best-effort close; failures are swallowed by callers.
    async fn close(&mut self) -> Result<(), EngineError>;
}

impl std::fmt::Debug for dyn DriverConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DriverConnection")
    }
}

pub type BoxedConnection = Box<dyn DriverConnection>;

/// Narrow per-backend entry point: opens connections and classifies their
/// failures. Injectable, so tests can substitute a scripted driver.
#[async_trait]
pub trait DriverBootstrap: Send + Sync {
    /// Placeholder syntax the named-parameter translator should emit.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Open one connection to `target`. The unsupported [`ConnectTarget`]
    /// variant fails immediately with `EngineError::Unsupported`.
    async fn connect(&self, target: &ConnectTarget) -> Result<BoxedConnection, EngineError>;

    /// Typed failure classification consumed by the dispatch loop.
    fn classify(&self, error: &EngineError) -> ErrorClass;
}

/// One way of producing a usable driver entry point.
pub trait BootstrapStrategy: Send + Sync {
    fn resolve(&self) -> Result<Arc<dyn DriverBootstrap>, EngineError>;
}

/// Ordered strategy list, tried first-to-last; the first success is
/// memoized behind a mutex and reused for every subsequent connect and
/// reconnect on this engine instance.
pub(crate) struct BootstrapResolver {
    strategies: Vec<Box<dyn BootstrapStrategy>>,
    resolved: Mutex<Option<Arc<dyn DriverBootstrap>>>,
}

impl BootstrapResolver {
    pub(crate) fn new(strategies: Vec<Box<dyn BootstrapStrategy>>) -> Self {
        BootstrapResolver {
            strategies,
            resolved: Mutex::new(None),
        }
    }

    pub(crate) fn resolve(&self) -> Result<Arc<dyn DriverBootstrap>, EngineError> {
        let mut memo = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bootstrap) = memo.as_ref() {
            return Ok(bootstrap.clone());
        }
        let mut last_err = EngineError::ConfigError("no bootstrap strategies supplied".to_string());
        for strategy in &self.strategies {
            match strategy.resolve() {
                Ok(bootstrap) => {
                    *memo = Some(bootstrap.clone());
                    return Ok(bootstrap);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "bootstrap strategy failed, trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
