//! Shared engine context.
//!
//! The core has exactly two pieces of mutable state shared between
//! concurrent pipelines: the linter's bounded per-component recent-result
//! cache and the consensus engine's specialist ledger. Both are owned here,
//! each behind its own mutex, and engines borrow the context through an
//! `Arc`. Everything else in the core is immutable per call.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::CoreConfig;
use crate::types::clamp01;

// A poisoned mutex means another pipeline panicked mid-update; the maps
// remain structurally valid, so recover the guard rather than wedging every
// subsequent caller.
fn recover<'a, T>(lock: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    lock.unwrap_or_else(PoisonError::into_inner)
}

/// Per-specialist trust and rolling outcome history.
#[derive(Debug, Clone)]
pub struct SpecialistRecord {
    pub trust: f64,
    pub outcomes: VecDeque<bool>,
}

impl Default for SpecialistRecord {
    fn default() -> Self {
        Self {
            trust: 0.5,
            outcomes: VecDeque::new(),
        }
    }
}

/// Owns the mutable state engines share, plus the configuration they read.
#[derive(Debug, Default)]
pub struct EngineContext {
    config: CoreConfig,
    specialists: Mutex<HashMap<String, SpecialistRecord>>,
    recent_results: Mutex<HashMap<String, VecDeque<String>>>,
}

impl EngineContext {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            specialists: Mutex::new(HashMap::new()),
            recent_results: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Most recent prior result recorded for a component.
    pub fn last_result(&self, component: &str) -> Option<String> {
        recover(self.recent_results.lock())
            .get(component)
            .and_then(|history| history.back().cloned())
    }

    /// Record a normalized result, evicting the oldest entry past the
    /// configured window.
    pub fn record_result(&self, component: &str, normalized: String) {
        let window = self.config.linter.memory_window;
        let mut cache = recover(self.recent_results.lock());
        let history = cache.entry(component.to_string()).or_default();
        history.push_back(normalized);
        while history.len() > window {
            history.pop_front();
        }
    }

    /// Running trust for a specialist; 0.5 when unknown.
    pub fn specialist_trust(&self, name: &str) -> f64 {
        recover(self.specialists.lock())
            .get(name)
            .map(|record| record.trust)
            .unwrap_or(0.5)
    }

    /// Success fraction over the outcome window; 0.5 with no history.
    pub fn specialist_track_record(&self, name: &str) -> f64 {
        recover(self.specialists.lock())
            .get(name)
            .filter(|record| !record.outcomes.is_empty())
            .map(|record| {
                let successes = record.outcomes.iter().filter(|o| **o).count();
                successes as f64 / record.outcomes.len() as f64
            })
            .unwrap_or(0.5)
    }

    /// Apply one trust/outcome update for a specialist.
    ///
    /// Success moves trust toward 1 and failure toward 0 by the EMA step
    /// `alpha`; the outcome window is bounded by `window`.
    pub fn update_specialist(&self, name: &str, success: bool, alpha: f64, window: usize) {
        let mut ledger = recover(self.specialists.lock());
        let record = ledger.entry(name.to_string()).or_default();
        record.trust = if success {
            clamp01(record.trust + alpha * (1.0 - record.trust))
        } else {
            clamp01(record.trust - alpha * record.trust)
        };
        record.outcomes.push_back(success);
        while record.outcomes.len() > window {
            record.outcomes.pop_front();
        }
    }
}
