use std::collections::HashMap;

use crate::types::SqlValue;

/// Opaque token returned on submission; matches later asynchronous events
/// to their originating query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub(crate) u64);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Name-to-value bindings for `:name` placeholders.
pub type NamedParams = HashMap<String, SqlValue>;

/// Parameters for one query: positional or named, never both.
#[derive(Debug, Clone)]
pub enum QueryParams {
    Positional(Vec<SqlValue>),
    Named(NamedParams),
}

impl QueryParams {
    #[must_use]
    pub fn none() -> Self {
        QueryParams::Positional(Vec::new())
    }
}

/// A pending query awaiting dispatch.
///
/// Created once at submission and consumed exactly once: either executed to
/// completion, or re-inserted at the backlog's front after a transient
/// failure. Never duplicated.
#[derive(Debug, Clone)]
pub struct QueuedQuery {
    pub id: CorrelationId,
    pub sql: String,
    pub params: QueryParams,
    pub parallel: bool,
}

impl QueuedQuery {
    pub fn new(
        id: CorrelationId,
        sql: impl Into<String>,
        params: QueryParams,
        parallel: bool,
    ) -> Self {
        QueuedQuery {
            id,
            sql: sql.into(),
            params,
            parallel,
        }
    }
}
