//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend list fixed at startup
//! - Track liveness per backend
//! - Select backends round-robin, skipping dead ones

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::load_balancer::backend::Backend;

/// Liveness flags and rotation cursor. Always mutated together.
#[derive(Debug)]
struct PoolState {
    /// Keyed by backend address; key set never changes after construction.
    alive: HashMap<String, bool>,
    /// Next index to try. Always in `[0, len)`, or 0 for an empty pool.
    cursor: usize,
}

/// Ordered set of backends with liveness tracking.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    state: Mutex<PoolState>,
}

impl BackendPool {
    /// Build a pool from configured addresses. Every backend starts alive.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backends: Vec<Arc<Backend>> = addresses
            .into_iter()
            .map(|a| Arc::new(Backend::new(a)))
            .collect();
        let alive = backends
            .iter()
            .map(|b| (b.address().to_string(), true))
            .collect();

        Self {
            backends,
            state: Mutex::new(PoolState { alive, cursor: 0 }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the next alive backend in round-robin order.
    ///
    /// Returns `None` when a full cycle finds no alive backend.
    pub fn next(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let mut state = self.lock();

        for i in 0..len {
            let index = (state.cursor + i) % len;
            let backend = &self.backends[index];
            if state.alive.get(backend.address()).copied().unwrap_or(false) {
                state.cursor = (index + 1) % len;
                return Some(backend.clone());
            }
        }
        None
    }

    /// Set liveness for one backend.
    ///
    /// Returns the previous flag, or `None` if `address` is not in the pool
    /// (in which case nothing changes).
    pub fn set_alive(&self, address: &str, alive: bool) -> Option<bool> {
        let mut state = self.lock();
        state
            .alive
            .get_mut(address)
            .map(|flag| std::mem::replace(flag, alive))
    }

    /// Current liveness of one backend.
    pub fn is_alive(&self, address: &str) -> Option<bool> {
        self.lock().alive.get(address).copied()
    }

    /// All backends in pool order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Address and liveness of every backend, in pool order.
    pub fn snapshot(&self) -> Vec<(String, bool)> {
        let state = self.lock();
        self.backends
            .iter()
            .map(|b| {
                let alive = state.alive.get(b.address()).copied().unwrap_or(false);
                (b.address().to_string(), alive)
            })
            .collect()
    }

    /// Number of backends currently alive.
    pub fn alive_count(&self) -> usize {
        self.lock().alive.values().filter(|alive| **alive).count()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
