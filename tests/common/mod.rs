#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sql_relay::bootstrap::{
    BootstrapStrategy, BoxedConnection, DriverBootstrap, DriverConnection,
};
use sql_relay::{
    ConnectTarget, CorrelationId, EngineError, ErrorClass, PlaceholderStyle, QueryResult,
    SqlEngine, SqlValue,
};

/// What one execution attempt of a given SQL text should do.
pub enum Step {
    Ok,
    OkAfter(Duration),
    Transient,
    Fail,
}

struct ScriptState {
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    connects: AtomicUsize,
}

impl ScriptState {
    fn next_step(&self, sql: &str) -> Step {
        self.steps
            .lock()
            .unwrap()
            .get_mut(sql)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Ok)
    }
}

/// In-memory driver double with per-statement scripted outcomes.
///
/// Unscripted statements succeed immediately, echoing their SQL text back
/// as a one-row result.
#[derive(Clone)]
pub struct ScriptedBootstrap {
    state: Arc<ScriptState>,
}

impl ScriptedBootstrap {
    pub fn new() -> Self {
        ScriptedBootstrap {
            state: Arc::new(ScriptState {
                steps: Mutex::new(HashMap::new()),
                connects: AtomicUsize::new(0),
            }),
        }
    }

    pub fn script(&self, sql: &str, steps: Vec<Step>) {
        self.state
            .steps
            .lock()
            .unwrap()
            .insert(sql.to_string(), steps.into());
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverBootstrap for ScriptedBootstrap {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    async fn connect(&self, _target: &ConnectTarget) -> Result<BoxedConnection, EngineError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            state: self.state.clone(),
        }))
    }

    fn classify(&self, error: &EngineError) -> ErrorClass {
        match error {
            EngineError::ConnectionError(_) => ErrorClass::Transient,
            _ => ErrorClass::Query,
        }
    }
}

pub struct ScriptedStrategy(pub ScriptedBootstrap);

impl BootstrapStrategy for ScriptedStrategy {
    fn resolve(&self) -> Result<Arc<dyn DriverBootstrap>, EngineError> {
        Ok(Arc::new(self.0.clone()))
    }
}

struct ScriptedConnection {
    state: Arc<ScriptState>,
}

#[async_trait]
impl DriverConnection for ScriptedConnection {
    async fn execute(
        &mut self,
        sql: &str,
        _params: &[SqlValue],
    ) -> Result<QueryResult, EngineError> {
        match self.state.next_step(sql) {
            Step::Ok => Ok(echo(sql)),
            Step::OkAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(echo(sql))
            }
            Step::Transient => Err(EngineError::ConnectionError(
                "scripted transient failure".to_string(),
            )),
            Step::Fail => Err(EngineError::ExecutionError(
                "scripted query failure".to_string(),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

fn echo(sql: &str) -> QueryResult {
    let mut result = QueryResult::with_columns(vec!["sql".to_string()]);
    result.push_row(vec![SqlValue::Text(sql.to_string())]);
    result
}

/// An engine over the scripted driver, plus the bootstrap for scripting.
pub fn scripted_engine(settings: sql_relay::EngineSettings) -> (SqlEngine, ScriptedBootstrap) {
    let bootstrap = ScriptedBootstrap::new();
    let engine = SqlEngine::with_strategies(
        vec![Box::new(ScriptedStrategy(bootstrap.clone()))],
        settings,
    );
    (engine, bootstrap)
}

/// Delivered events in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Data(CorrelationId),
    Error(CorrelationId),
}

pub fn record_events(engine: &SqlEngine) -> Arc<Mutex<Vec<Delivered>>> {
    let log: Arc<Mutex<Vec<Delivered>>> = Arc::new(Mutex::new(Vec::new()));
    let data_log = log.clone();
    engine.on_data(move |_result, id| {
        data_log.lock().unwrap().push(Delivered::Data(id));
    });
    let error_log = log.clone();
    engine.on_error(move |_err, id| {
        error_log.lock().unwrap().push(Delivered::Error(id));
    });
    log
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Fast-cycling settings so retry/sweep paths finish quickly under test.
pub fn fast_settings(pool_size: usize) -> sql_relay::EngineSettings {
    sql_relay::EngineSettings {
        pool_size,
        reconnect_delay: Duration::from_millis(50),
        sweep_period: Duration::from_millis(50),
        shutdown_grace: Duration::from_secs(2),
    }
}

pub fn unused_target() -> ConnectTarget {
    ConnectTarget::File(std::path::PathBuf::from("scripted.db"))
}
