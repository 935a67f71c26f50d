use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backlog::Backlog;
use crate::bootstrap::{BoxedConnection, DriverBootstrap, DriverConnection};
use crate::engine::EngineSettings;
use crate::error::ErrorClass;
use crate::events::EventHub;
use crate::gate::ParallelGate;
use crate::pool::ConnectionPool;
use crate::query::{QueryParams, QueuedQuery};
use crate::translation::{bind_named, translate_named};
use crate::types::{ConnectTarget, PlaceholderStyle, SqlValue};

/// Everything one connected session shares across dispatch tasks.
pub(crate) struct Session {
    pub(crate) pool: ConnectionPool,
    pub(crate) backlog: Arc<Backlog>,
    pub(crate) gate: ParallelGate,
    pub(crate) events: Arc<EventHub>,
    pub(crate) bootstrap: Arc<dyn DriverBootstrap>,
    pub(crate) target: ConnectTarget,
    pub(crate) settings: EngineSettings,
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: TaskTracker,
    pub(crate) handle: Handle,
}

/// Submit one dispatch-loop task to the runtime.
pub(crate) fn spawn_dispatch(session: &Arc<Session>) {
    let s = session.clone();
    session
        .tracker
        .spawn_on(async move { run_dispatch_loop(s).await }, &session.handle);
}

/// Periodic safety net: re-drives the dispatch loop on a fixed period so
/// the backlog drains even when every earlier task found no free
/// connection.
pub(crate) fn spawn_sweeper(session: &Arc<Session>) {
    let s = session.clone();
    session.tracker.spawn_on(
        async move {
            let mut tick = tokio::time::interval(s.settings.sweep_period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = s.cancel.cancelled() => return,
                    _ = tick.tick() => {
                        if !s.backlog.is_empty() {
                            run_dispatch_loop(s.clone()).await;
                        }
                    }
                }
            }
        },
        &session.handle,
    );
}

enum StepOutcome {
    Completed,
    Failed,
    ConnectionLost,
    Cancelled,
}

/// The per-connection work cycle.
///
/// Checks out one free connection and drains the backlog on it until the
/// backlog is empty, the gate is contended, or the connection is lost.
/// Stopping early is fine: whichever task holds the gate is making
/// progress, and the sweeper retries on its fixed period.
pub(crate) async fn run_dispatch_loop(session: Arc<Session>) {
    let Some(mut conn) = session.pool.checkout() else {
        return;
    };
    loop {
        if session.cancel.is_cancelled() {
            session.pool.release(conn);
            return;
        }
        let Some(gate) = session.gate.try_acquire() else {
            // a serialized query is in flight elsewhere
            session.pool.release(conn);
            return;
        };
        let Some(item) = session.backlog.pop_front() else {
            drop(gate);
            session.pool.release(conn);
            return;
        };
        // A parallel query releases the gate immediately so other dispatch
        // attempts are not blocked behind this one's I/O.
        let gate = if item.parallel { None } else { Some(gate) };
        match execute_one(&session, conn.as_mut(), &item).await {
            StepOutcome::Completed | StepOutcome::Failed => drop(gate),
            StepOutcome::Cancelled => {
                session.pool.release(conn);
                return;
            }
            StepOutcome::ConnectionLost => {
                if let Err(err) = conn.close().await {
                    tracing::debug!(error = %err, "closing broken connection failed");
                }
                session.backlog.push_front(item);
                spawn_dispatch(&session);
                drop(gate);
                session.pool.begin_reconnect();
                if let Some(replacement) = reconnect(&session).await {
                    session.pool.adopt(replacement);
                    spawn_dispatch(&session);
                }
                return;
            }
        }
    }
}

async fn execute_one(
    session: &Arc<Session>,
    conn: &mut dyn DriverConnection,
    item: &QueuedQuery,
) -> StepOutcome {
    let (sql, params) = match prepare(item, session.bootstrap.placeholder_style()) {
        Ok(prepared) => prepared,
        Err(err) => {
            session.events.emit_error(&err, item.id);
            return StepOutcome::Failed;
        }
    };

    let result = tokio::select! {
        () = session.cancel.cancelled() => return StepOutcome::Cancelled,
        res = conn.execute(&sql, &params) => res,
    };

    match result {
        Ok(result) => {
            if session.cancel.is_cancelled() {
                // engine shut down mid-execute; nothing may be emitted
                return StepOutcome::Cancelled;
            }
            session.events.emit_data(&result, item.id);
            StepOutcome::Completed
        }
        Err(err) => match session.bootstrap.classify(&err) {
            ErrorClass::Transient => {
                tracing::warn!(id = %item.id, error = %err, "transient connectivity loss, reconnecting");
                StepOutcome::ConnectionLost
            }
            ErrorClass::Query | ErrorClass::Fatal => {
                session.events.emit_error(&err, item.id);
                StepOutcome::Failed
            }
        },
    }
}

/// Translate and bind named parameters; positional queries pass through.
fn prepare(
    item: &QueuedQuery,
    style: PlaceholderStyle,
) -> Result<(String, Vec<SqlValue>), crate::error::EngineError> {
    match &item.params {
        QueryParams::Positional(values) => Ok((item.sql.clone(), values.clone())),
        QueryParams::Named(map) => {
            let translated = translate_named(&item.sql, style);
            let bound = bind_named(&translated.names, map)?;
            Ok((translated.text, bound))
        }
    }
}

/// Blocking, unbounded-retry reconnection with a fixed delay, abandoned
/// only when the session shuts down.
async fn reconnect(session: &Arc<Session>) -> Option<BoxedConnection> {
    loop {
        tokio::select! {
            () = session.cancel.cancelled() => return None,
            () = tokio::time::sleep(session.settings.reconnect_delay) => {}
        }
        match session.bootstrap.connect(&session.target).await {
            Ok(conn) => {
                tracing::info!("reconnected after transient failure");
                return Some(conn);
            }
            Err(err) => {
                tracing::warn!(error = %err, "reconnect attempt failed, retrying");
            }
        }
    }
}
