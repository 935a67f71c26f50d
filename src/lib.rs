//! Asynchronous, connection-pooled SQL execution engine.
//!
//! One facade ([`SqlEngine`]) over two interchangeable backends: networked
//! PostgreSQL (`tokio-postgres`) and embedded SQLite (`rusqlite`). Callers
//! submit queries from any thread without blocking; execution is serialized
//! or parallelized per call; transient connectivity loss is survived by
//! reconnecting and re-queuing; results and errors are delivered through
//! subscriber callbacks matched by correlation id.
//!
//! ```no_run
//! use sql_relay::{EngineSettings, SqlEngine, SqlValue};
//!
//! # async fn run() -> Result<(), sql_relay::EngineError> {
//! let engine = SqlEngine::sqlite(EngineSettings::default().with_pool_size(2));
//! engine.on_data(|result, id| println!("{id}: {} rows", result.rows_affected));
//! engine.connect_file("app.db").await?;
//! engine.query("SELECT * FROM t WHERE a = ?", vec![SqlValue::Int(1)]);
//! engine.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod backlog;
mod dispatch;
mod engine;
mod events;
mod gate;
mod pool;

pub mod bootstrap;
pub mod error;
pub mod postgres;
pub mod query;
pub mod results;
pub mod sqlite;
pub mod translation;
pub mod types;

pub use engine::{EngineSettings, SqlEngine};
pub use error::{EngineError, ErrorClass};
pub use pool::PoolStatus;
pub use query::{CorrelationId, NamedParams, QueryParams};
pub use results::QueryResult;
pub use types::{ConnectTarget, PlaceholderStyle, SqlValue};
