use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Mutual-exclusion flag serializing non-parallel queries.
///
/// Acquired non-blocking at dispatch; held through execution and event
/// delivery for serialized queries, dropped immediately upon dequeue for
/// parallel ones.
#[derive(Clone)]
pub(crate) struct ParallelGate {
    inner: Arc<Mutex<()>>,
}

pub(crate) type GateGuard = OwnedMutexGuard<()>;

impl ParallelGate {
    pub(crate) fn new() -> Self {
        ParallelGate {
            inner: Arc::new(Mutex::new(())),
        }
    }

    /// Non-blocking acquire; `None` while a serialized query is in flight.
    pub(crate) fn try_acquire(&self) -> Option<GateGuard> {
        self.inner.clone().try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_until_dropped() {
        let gate = ParallelGate::new();
        let guard = gate.try_acquire().expect("gate starts free");
        assert!(gate.try_acquire().is_none());
        drop(guard);
        assert!(gate.try_acquire().is_some());
    }
}
