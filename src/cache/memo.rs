//! Remembers query outcomes for a while, so asking the same thing twice only hits the backend once.
use crate::backend::Client;
use crate::engine::binding::Params;
use crate::engine::{run, Flow, QueryOutcome};
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    flow: Flow,
    input: String,
    params: Params,
}

/// Outcomes with a backend failure are never stored: the next call should try again.
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<MemoKey, (Instant, QueryOutcome)>,
}

impl Default for QueryCache {
    fn default() -> Self {
        QueryCache::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        QueryCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn fetch<C: Client>(
        &mut self,
        client: &C,
        flow: &Flow,
        input: &str,
        params: &Params,
    ) -> QueryOutcome {
        self.get_or_run(flow, input, params, || run(client, flow, input, params))
    }

    pub fn get_or_run<F>(&mut self, flow: &Flow, input: &str, params: &Params, run: F) -> QueryOutcome
    where
        F: FnOnce() -> QueryOutcome,
    {
        let key = MemoKey {
            flow: flow.clone(),
            input: input.to_string(),
            params: params.clone(),
        };

        if let Some((stored_at, outcome)) = self.entries.get(&key) {
            if stored_at.elapsed() < self.ttl {
                debug!("Memo hit for {}", input);
                return outcome.clone();
            }
        }

        let outcome = run();

        if outcome.has_backend_failure() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, (Instant::now(), outcome.clone()));
        }

        outcome
    }

    /// Drops everything older than the TTL.
    pub fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
