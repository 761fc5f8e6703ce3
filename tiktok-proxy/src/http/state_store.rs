use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use rand::distr::Alphanumeric;
use rand::Rng;

const STATE_LENGTH: usize = 32;
const MAX_PENDING_STATES: usize = 10_000;

/// Anti-forgery `state` values handed out with authorization URLs. A state is
/// accepted once, and only until its TTL elapses.
pub struct StateStore {
    states: Arc<DashSet<String>>,
    ttl: Duration,
    capacity: usize,
}

impl StateStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_PENDING_STATES)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            states: Arc::new(DashSet::new()),
            ttl,
            capacity,
        }
    }

    /// Returns `None` while `capacity` states are outstanding.
    pub fn issue(&self) -> Option<String> {
        if self.states.len() >= self.capacity {
            return None;
        }


        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect();

        self.states.insert(state.clone());

        let states = Arc::clone(&self.states);
        let expired = state.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            states.remove(&expired);
        });

        Some(state)
    }

    pub fn consume(&self, state: &str) -> bool {
        self.states.remove(state).is_some()
    }
}
