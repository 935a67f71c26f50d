use std::sync::RwLock;

use crate::error::EngineError;
use crate::query::CorrelationId;
use crate::results::QueryResult;

type LifecycleHandler = Box<dyn Fn() + Send + Sync>;
type DataHandler = Box<dyn Fn(&QueryResult, CorrelationId) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&EngineError, CorrelationId) + Send + Sync>;

/// Synchronous multi-subscriber event registry.
///
/// Subscribers run on the invoking dispatch task; a slow subscriber stalls
/// the dispatch loop, so handlers must be fast and non-blocking.
#[derive(Default)]
pub(crate) struct EventHub {
    on_connect: RwLock<Vec<LifecycleHandler>>,
    on_disconnect: RwLock<Vec<LifecycleHandler>>,
    on_data: RwLock<Vec<DataHandler>>,
    on_error: RwLock<Vec<ErrorHandler>>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe_connect(&self, handler: LifecycleHandler) {
        self.on_connect.write().unwrap_or_else(|e| e.into_inner()).push(handler);
    }

    pub(crate) fn subscribe_disconnect(&self, handler: LifecycleHandler) {
        self.on_disconnect.write().unwrap_or_else(|e| e.into_inner()).push(handler);
    }

    pub(crate) fn subscribe_data(&self, handler: DataHandler) {
        self.on_data.write().unwrap_or_else(|e| e.into_inner()).push(handler);
    }

    pub(crate) fn subscribe_error(&self, handler: ErrorHandler) {
        self.on_error.write().unwrap_or_else(|e| e.into_inner()).push(handler);
    }

    pub(crate) fn emit_connect(&self) {
        for handler in self.on_connect.read().unwrap_or_else(|e| e.into_inner()).iter() {
            handler();
        }
    }

    pub(crate) fn emit_disconnect(&self) {
        for handler in self.on_disconnect.read().unwrap_or_else(|e| e.into_inner()).iter() {
            handler();
        }
    }

    pub(crate) fn emit_data(&self, result: &QueryResult, id: CorrelationId) {
        for handler in self.on_data.read().unwrap_or_else(|e| e.into_inner()).iter() {
            handler(result, id);
        }
    }

    pub(crate) fn emit_error(&self, error: &EngineError, id: CorrelationId) {
        for handler in self.on_error.read().unwrap_or_else(|e| e.into_inner()).iter() {
            handler(error, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn all_subscribers_fire_in_registration_order() {
        let hub = EventHub::new();
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen = seen.clone();
            hub.subscribe_data(Box::new(move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        }
        hub.emit_data(&QueryResult::default(), CorrelationId(1));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
