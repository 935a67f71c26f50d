use std::collections::VecDeque;
use std::sync::Mutex;

use crate::query::QueuedQuery;

/// Ordered, unbounded FIFO of pending queries.
///
/// `push_front` exists solely for the transient-failure path: the only item
/// ever re-inserted is the most recently popped head, so a re-queued query
/// regains its original position ahead of everything submitted after it.
#[derive(Debug, Default)]
pub(crate) struct Backlog {
    items: Mutex<VecDeque<QueuedQuery>>,
}

impl Backlog {
    pub(crate) fn new() -> Self {
        Backlog {
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push_back(&self, item: QueuedQuery) {
        self.lock().push_back(item);
    }

    pub(crate) fn push_front(&self, item: QueuedQuery) {
        self.lock().push_front(item);
    }

    pub(crate) fn pop_front(&self) -> Option<QueuedQuery> {
        self.lock().pop_front()
    }

    /// Drop every pending item without notifying callers.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedQuery>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
