//! Anti-forgery state tokens for the OAuth authorization-code flow.
//!
//! Every call to [`StateStore::issue`] hands out a fresh random token that is
//! remembered until it is either consumed by [`StateStore::verify`], expires,
//! or is evicted because `max_pending` newer logins were started after it. A
//! callback can therefore only be completed once, and only for a login that
//! this process started recently.
//!
//! When a fixed state is configured, that value is issued for every login and
//! accepted on every callback. This mirrors deployments where the redirect
//! is shared by several processes that cannot see each other's stores.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::utils;

pub const DEFAULT_MAX_PENDING: usize = 1024;

#[derive(Debug, Clone)]
pub struct StateStore {
    fixed: Option<String>,
    ttl: Duration,
    max_pending: usize,
    pending: Arc<Mutex<Pending>>,
}

/// Issued tokens plus their issue order.
///
/// All tokens share one TTL, so issue order is also expiry order and both
/// expiry and eviction only ever look at the front of `order`. Entries for
/// tokens that were already consumed stay in `order` until they reach the
/// front or the queue is compacted.
#[derive(Debug, Default)]
struct Pending {
    issued: HashMap<String, Instant>,
    order: VecDeque<(String, Instant)>,
}

impl Pending {
    fn prune(&mut self, ttl: Duration) {
        while let Some((_, issued_at)) = self.order.front() {
            if issued_at.elapsed() < ttl {
                break;
            }
            if let Some((token, _)) = self.order.pop_front() {
                self.issued.remove(&token);
            }
        }
    }

    fn evict_oldest(&mut self) -> bool {
        while let Some((token, _)) = self.order.pop_front() {
            if self.issued.remove(&token).is_some() {
                return true;
            }
        }
        false
    }

    fn compact(&mut self, max_pending: usize) {
        if self.order.len() > max_pending.saturating_mul(2) {
            let issued = &self.issued;
            self.order.retain(|(token, _)| issued.contains_key(token));
        }
    }
}

impl StateStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_limit(ttl, DEFAULT_MAX_PENDING)
    }

    pub fn with_limit(ttl: Duration, max_pending: usize) -> Self {
        StateStore {
            fixed: None,
            ttl,
            max_pending: max_pending.max(1),
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    pub fn fixed(state: impl Into<String>) -> Self {
        StateStore {
            fixed: Some(state.into()),
            ..StateStore::with_limit(Duration::ZERO, 1)
        }
    }

    pub async fn issue(&self) -> String {
        if let Some(fixed) = &self.fixed {
            return fixed.clone();
        }

        let token = utils::generate_state_token();
        let issued_at = Instant::now();

        let mut pending = self.pending.lock().await;
        pending.prune(self.ttl);
        while pending.issued.len() >= self.max_pending {
            if !pending.evict_oldest() {
                break;
            }
        }
        pending.issued.insert(token.clone(), issued_at);
        pending.order.push_back((token.clone(), issued_at));
        pending.compact(self.max_pending);
        token
    }

    /// Checks `state` against the issued tokens, consuming it on success.
    pub async fn verify(&self, state: &str) -> bool {
        if let Some(fixed) = &self.fixed {
            return utils::constant_time_eq(fixed, state);
        }

        let mut pending = self.pending.lock().await;
        pending.prune(self.ttl);
        pending.issued.remove(state).is_some()
    }

    pub async fn pending(&self) -> usize {
        let mut pending = self.pending.lock().await;
        pending.prune(self.ttl);
        pending.issued.len()
    }
}
