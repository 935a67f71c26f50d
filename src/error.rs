use thiserror::Error;

/// Unified error type for the engine and both backends.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("parameter binding error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("other engine error: {0}")]
    Other(String),
}

/// How the dispatch loop should react to a failure.
///
/// Classification is supplied by the backend bootstrap so the loop never
/// inspects backend-specific error shapes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Recoverable connectivity loss: close, reconnect, re-queue. Never
    /// surfaced to subscribers.
    Transient,
    /// Query-level failure (malformed SQL, binding, result read): surfaced
    /// exactly once via the error event, never retried.
    Query,
    /// Unrecoverable setup failure; only meaningful during connect.
    Fatal,
}
