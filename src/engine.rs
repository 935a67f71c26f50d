use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backlog::Backlog;
use crate::bootstrap::{BootstrapResolver, BootstrapStrategy};
use crate::dispatch::{spawn_dispatch, spawn_sweeper, Session};
use crate::error::EngineError;
use crate::events::EventHub;
use crate::gate::ParallelGate;
use crate::pool::{ConnectionPool, PoolStatus};
use crate::query::{CorrelationId, NamedParams, QueryParams, QueuedQuery};
use crate::results::QueryResult;
use crate::types::{ConnectTarget, SqlValue};

/// Tunables fixed at engine construction.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Number of connections opened at connect(); fixed for the session.
    pub pool_size: usize,
    /// Fixed delay between reconnect attempts after transient loss.
    pub reconnect_delay: Duration,
    /// Period of the background task that re-drives the dispatch loop.
    pub sweep_period: Duration,
    /// How long disconnect() waits for in-flight tasks before proceeding.
    pub shutdown_grace: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            pool_size: 4,
            reconnect_delay: Duration::from_secs(1),
            sweep_period: Duration::from_millis(250),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }
}

/// Asynchronous, connection-pooled SQL execution facade.
///
/// Submissions never block and never throw for execution outcomes; results
/// and errors arrive through the subscription callbacks, matched by
/// correlation id. Cheap to clone.
#[derive(Clone)]
pub struct SqlEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    resolver: BootstrapResolver,
    settings: EngineSettings,
    backlog: Arc<Backlog>,
    gate: ParallelGate,
    events: Arc<EventHub>,
    next_id: AtomicU64,
    session: Mutex<Option<Arc<Session>>>,
}

impl SqlEngine {
    /// Engine over the networked PostgreSQL backend.
    #[must_use]
    pub fn postgres(settings: EngineSettings) -> Self {
        Self::with_strategies(
            vec![Box::new(crate::postgres::PostgresStrategy)],
            settings,
        )
    }

    /// Engine over the embedded SQLite backend.
    #[must_use]
    pub fn sqlite(settings: EngineSettings) -> Self {
        Self::with_strategies(vec![Box::new(crate::sqlite::SqliteStrategy)], settings)
    }

    /// Engine over an explicit bootstrap strategy list, tried in order.
    /// This is also the substitution point for driver doubles in tests.
    #[must_use]
    pub fn with_strategies(
        strategies: Vec<Box<dyn BootstrapStrategy>>,
        settings: EngineSettings,
    ) -> Self {
        SqlEngine {
            inner: Arc::new(EngineInner {
                resolver: BootstrapResolver::new(strategies),
                settings,
                backlog: Arc::new(Backlog::new()),
                gate: ParallelGate::new(),
                events: Arc::new(EventHub::new()),
                next_id: AtomicU64::new(0),
                session: Mutex::new(None),
            }),
        }
    }

    /// Open exactly `pool_size` connections to `target` and start
    /// dispatching. Any single connection failure aborts the whole connect
    /// with no partial pool.
    ///
    /// # Errors
    /// `ConnectionError` when already connected, `ConfigError` for a zero
    /// pool size, otherwise whatever the backend's connect failed with.
    pub async fn connect(&self, target: ConnectTarget) -> Result<(), EngineError> {
        if self.is_connected() {
            return Err(EngineError::ConnectionError(
                "engine is already connected".to_string(),
            ));
        }
        if self.inner.settings.pool_size == 0 {
            return Err(EngineError::ConfigError(
                "pool_size must be at least 1".to_string(),
            ));
        }

        let bootstrap = self.inner.resolver.resolve()?;
        let mut connections = Vec::with_capacity(self.inner.settings.pool_size);
        for _ in 0..self.inner.settings.pool_size {
            match bootstrap.connect(&target).await {
                Ok(conn) => connections.push(conn),
                Err(err) => {
                    for mut opened in connections {
                        let _ = opened.close().await;
                    }
                    return Err(err);
                }
            }
        }

        let session = Arc::new(Session {
            pool: ConnectionPool::new(connections),
            backlog: self.inner.backlog.clone(),
            gate: self.inner.gate.clone(),
            events: self.inner.events.clone(),
            bootstrap,
            target,
            settings: self.inner.settings,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            handle: Handle::current(),
        });

        {
            let mut slot = self.lock_session();
            if slot.is_some() {
                // lost a connect race; tear down what we just opened
                drop(slot);
                for mut opened in session.pool.drain() {
                    let _ = opened.close().await;
                }
                return Err(EngineError::ConnectionError(
                    "engine is already connected".to_string(),
                ));
            }
            *slot = Some(session.clone());
        }

        spawn_sweeper(&session);
        if !self.inner.backlog.is_empty() {
            // queries submitted while disconnected are still pending
            spawn_dispatch(&session);
        }
        self.inner.events.emit_connect();
        Ok(())
    }

    /// Convenience for [`ConnectTarget::Server`].
    ///
    /// # Errors
    /// See [`SqlEngine::connect`].
    pub async fn connect_server(
        &self,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.connect(ConnectTarget::Server {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            dbname: dbname.into(),
        })
        .await
    }

    /// Convenience for [`ConnectTarget::File`].
    ///
    /// # Errors
    /// See [`SqlEngine::connect`].
    pub async fn connect_file(
        &self,
        path: impl Into<std::path::PathBuf>,
    ) -> Result<(), EngineError> {
        self.connect(ConnectTarget::File(path.into())).await
    }

    /// Stop dispatching and close every connection. Idempotent.
    ///
    /// In-flight tasks get `shutdown_grace` to finish, then teardown
    /// proceeds regardless. Pending backlog entries are discarded without
    /// notification: queries that never dispatched have no delivery
    /// guarantee. Close failures are swallowed.
    pub async fn disconnect(&self) {
        let Some(session) = self.lock_session().take() else {
            return;
        };
        session.cancel.cancel();
        session.tracker.close();
        if tokio::time::timeout(session.settings.shutdown_grace, session.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!("shutdown grace elapsed with dispatch tasks still running");
        }
        self.inner.backlog.clear();
        for mut conn in session.pool.drain() {
            if let Err(err) = conn.close().await {
                tracing::debug!(error = %err, "connection close failed during disconnect");
            }
        }
        self.inner.events.emit_disconnect();
    }

    /// Queue a serialized query with positional parameters. Non-blocking;
    /// the result arrives via `on_data`/`on_error` under the returned id.
    pub fn query(&self, sql: impl Into<String>, params: Vec<SqlValue>) -> CorrelationId {
        self.submit(sql.into(), QueryParams::Positional(params), false)
    }

    /// Queue a query that may run concurrently with others, bypassing the
    /// serialization gate.
    pub fn parallel_query(
        &self,
        sql: impl Into<String>,
        params: Vec<SqlValue>,
    ) -> CorrelationId {
        self.submit(sql.into(), QueryParams::Positional(params), true)
    }

    /// Queue a serialized query with `:name` parameters.
    pub fn query_named(&self, sql: impl Into<String>, params: NamedParams) -> CorrelationId {
        self.submit(sql.into(), QueryParams::Named(params), false)
    }

    /// Queue a parallel query with `:name` parameters.
    pub fn parallel_query_named(
        &self,
        sql: impl Into<String>,
        params: NamedParams,
    ) -> CorrelationId {
        self.submit(sql.into(), QueryParams::Named(params), true)
    }

    fn submit(&self, sql: String, params: QueryParams, parallel: bool) -> CorrelationId {
        let id = CorrelationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner
            .backlog
            .push_back(QueuedQuery::new(id, sql, params, parallel));
        if let Some(session) = self.lock_session().clone() {
            spawn_dispatch(&session);
        }
        id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock_session().is_some()
    }

    /// Whether any connection is currently executing a query.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|session| session.pool.is_busy())
    }

    /// Pool occupancy snapshot; `None` while disconnected.
    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.lock_session()
            .as_ref()
            .map(|session| session.pool.status())
    }

    /// Number of queries waiting for dispatch.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.inner.backlog.len()
    }

    /// Subscribe to successful connects.
    pub fn on_connect(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.events.subscribe_connect(Box::new(handler));
    }

    /// Subscribe to disconnects.
    pub fn on_disconnect(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.events.subscribe_disconnect(Box::new(handler));
    }

    /// Subscribe to query results. Handlers run synchronously on the
    /// dispatch task and must be fast and non-blocking.
    pub fn on_data(
        &self,
        handler: impl Fn(&QueryResult, CorrelationId) + Send + Sync + 'static,
    ) {
        self.inner.events.subscribe_data(Box::new(handler));
    }

    /// Subscribe to terminal query errors. Same threading caveat as
    /// [`SqlEngine::on_data`].
    pub fn on_error(
        &self,
        handler: impl Fn(&EngineError, CorrelationId) + Send + Sync + 'static,
    ) {
        self.inner.events.subscribe_error(Box::new(handler));
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Arc<Session>>> {
        match self.inner.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
