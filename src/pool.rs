use std::sync::Mutex;

use crate::bootstrap::BoxedConnection;

/// Snapshot of pool occupancy, in the shape of deadpool's `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub free: usize,
    pub in_use: usize,
    pub capacity: usize,
}

struct PoolState {
    free: Vec<BoxedConnection>,
    in_use: usize,
}

/// Fixed-capacity set of live connections, partitioned free / in-use.
///
/// Both partitions live under one mutex so `free + in_use == capacity`
/// holds exactly at every observation point. The single exception is a
/// connection mid-reconnect: `begin_reconnect` removes it from both sets
/// until `adopt` returns its replacement to the free side.
pub(crate) struct ConnectionPool {
    state: Mutex<PoolState>,
    capacity: usize,
}

impl ConnectionPool {
    pub(crate) fn new(connections: Vec<BoxedConnection>) -> Self {
        let capacity = connections.len();
        ConnectionPool {
            state: Mutex::new(PoolState {
                free: connections,
                in_use: 0,
            }),
            capacity,
        }
    }

    /// Take one free connection; `None` when the pool is saturated.
    pub(crate) fn checkout(&self) -> Option<BoxedConnection> {
        let mut state = self.lock();
        let conn = state.free.pop()?;
        state.in_use += 1;
        Some(conn)
    }

    /// Return a checked-out connection to the free side.
    pub(crate) fn release(&self, conn: BoxedConnection) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        state.free.push(conn);
    }

    /// Account for a checked-out connection leaving the pool entirely while
    /// its replacement is being established.
    pub(crate) fn begin_reconnect(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
    }

    /// Place a freshly established replacement connection into the free set.
    pub(crate) fn adopt(&self, conn: BoxedConnection) {
        self.lock().free.push(conn);
    }

    /// Remove every free connection for teardown.
    pub(crate) fn drain(&self) -> Vec<BoxedConnection> {
        std::mem::take(&mut self.lock().free)
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.lock().in_use > 0
    }

    pub(crate) fn status(&self) -> PoolStatus {
        let state = self.lock();
        PoolStatus {
            free: state.free.len(),
            in_use: state.in_use,
            capacity: self.capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
