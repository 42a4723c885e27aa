//! In-memory reference store — implements all four persistence traits
//! behind `Mutex<FxHashMap<...>>`. This is the "one adapter for local/dev
//! use" analogue of a mock broker: it demonstrates the trait boundary
//! without committing to a real backing store.
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! store.put("hash-a", &sequence)?;
//! assert_eq!(store.list("hash-a")?.len(), 1);
//! ```

use std::sync::Mutex;

use rustc_hash::FxHashMap;
use sentinel_core::{ActionSequence, EvaluationResult, HolisticPlan, PlannerConfiguration};

use crate::error::{Error, Result};
use crate::traits::{EvaluationStore, PlannerConfigStore, RecommendationStore, SequenceStore};

/// Backs every trait implementation on [`InMemoryStore`]. Panicking on a
/// poisoned lock would take down a caller that never touched the lock
/// itself, so every access maps poisoning to [`Error::LockPoisoned`]
/// instead.
fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<std::sync::MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| Error::LockPoisoned)
}

/// In-memory implementation of all four store traits, suitable for tests
/// and for the CLI's default (non-durable) backing store.
#[derive(Default)]
pub struct InMemoryStore {
    sequences: Mutex<FxHashMap<String, FxHashMap<String, ActionSequence>>>,
    evaluations: Mutex<FxHashMap<String, FxHashMap<String, EvaluationResult>>>,
    recommendations: Mutex<FxHashMap<String, HolisticPlan>>,
    config: Mutex<Option<PlannerConfiguration>>,
    /// Remaining forced failures, consumed one at a time by the next write
    /// or read on any of the four traits. Used to exercise the monitor's
    /// retry-on-transient-error path without a real backing store that can
    /// actually fail.
    fail_budget: Mutex<u32>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` store calls (across any of the four traits)
    /// return `Error::Unavailable`, then resume succeeding.
    pub fn fail_next(&self, count: u32) {
        *self.fail_budget.lock().expect("fail_budget mutex poisoned") = count;
    }

    fn consume_fail_budget(&self) -> Result<()> {
        let mut budget = lock(&self.fail_budget)?;
        if *budget > 0 {
            *budget -= 1;
            return Err(Error::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl SequenceStore for InMemoryStore {
    fn put(&self, portfolio_hash: &str, sequence: &ActionSequence) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.sequences)?
            .entry(portfolio_hash.to_string())
            .or_default()
            .insert(sequence.sequence_hash.clone(), sequence.clone());
        Ok(())
    }

    fn get(&self, portfolio_hash: &str, sequence_hash: &str) -> Result<Option<ActionSequence>> {
        self.consume_fail_budget()?;
        Ok(lock(&self.sequences)?
            .get(portfolio_hash)
            .and_then(|by_hash| by_hash.get(sequence_hash))
            .cloned())
    }

    fn list(&self, portfolio_hash: &str) -> Result<Vec<ActionSequence>> {
        self.consume_fail_budget()?;
        Ok(lock(&self.sequences)?
            .get(portfolio_hash)
            .map(|by_hash| by_hash.values().cloned().collect())
            .unwrap_or_default())
    }

    fn purge(&self, portfolio_hash: &str) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.sequences)?.remove(portfolio_hash);
        Ok(())
    }
}

impl EvaluationStore for InMemoryStore {
    fn put(&self, portfolio_hash: &str, evaluation: &EvaluationResult) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.evaluations)?
            .entry(portfolio_hash.to_string())
            .or_default()
            .insert(evaluation.sequence_hash.clone(), evaluation.clone());
        Ok(())
    }

    fn get(&self, portfolio_hash: &str, sequence_hash: &str) -> Result<Option<EvaluationResult>> {
        self.consume_fail_budget()?;
        Ok(lock(&self.evaluations)?
            .get(portfolio_hash)
            .and_then(|by_hash| by_hash.get(sequence_hash))
            .cloned())
    }

    fn purge(&self, portfolio_hash: &str) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.evaluations)?.remove(portfolio_hash);
        Ok(())
    }
}

impl RecommendationStore for InMemoryStore {
    fn put(&self, portfolio_hash: &str, plan: &HolisticPlan) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.recommendations)?.insert(portfolio_hash.to_string(), plan.clone());
        Ok(())
    }

    fn latest(&self, portfolio_hash: &str) -> Result<Option<HolisticPlan>> {
        self.consume_fail_budget()?;
        Ok(lock(&self.recommendations)?.get(portfolio_hash).cloned())
    }

    fn purge(&self, portfolio_hash: &str) -> Result<()> {
        self.consume_fail_budget()?;
        lock(&self.recommendations)?.remove(portfolio_hash);
        Ok(())
    }
}

impl PlannerConfigStore for InMemoryStore {
    fn get(&self) -> Result<Option<PlannerConfiguration>> {
        self.consume_fail_budget()?;
        Ok(lock(&self.config)?.clone())
    }

    fn set(&self, config: &PlannerConfiguration) -> Result<()> {
        self.consume_fail_budget()?;
        *lock(&self.config)? = Some(config.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.consume_fail_budget()?;
        *lock(&self.config)? = None;
        Ok(())
    }
}
