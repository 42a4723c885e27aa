//! The four store capabilities the planner needs: sequence, evaluation,
//! recommendation and planner-config. Each is a thin CRUD surface keyed by
//! the relevant content hashes, mirroring a broker trait that abstracts
//! over a capability without committing callers to a backing
//! implementation. A real backing store (SQLite, a remote cache) is an
//! external collaborator's job; this crate only defines the shape and
//! ships an in-memory reference adapter (`memory::InMemoryStore`) for
//! local development and tests.
//!
//! Every method is a logical transaction: a store either commits a write
//! in full or returns an error and leaves its prior state untouched.

use sentinel_core::{ActionSequence, EvaluationResult, HolisticPlan, PlannerConfiguration};

use crate::error::Result;

/// Cache of generated sequences, keyed by the portfolio hash they were
/// generated against and their own content-addressed sequence hash.
pub trait SequenceStore: Send + Sync {
    fn put(&self, portfolio_hash: &str, sequence: &ActionSequence) -> Result<()>;
    fn get(&self, portfolio_hash: &str, sequence_hash: &str) -> Result<Option<ActionSequence>>;
    fn list(&self, portfolio_hash: &str) -> Result<Vec<ActionSequence>>;

    /// Delete every sequence cached for `portfolio_hash`. Called by the
    /// invalidation monitor whenever the portfolio hash changes.
    fn purge(&self, portfolio_hash: &str) -> Result<()>;
}

/// Cache of `(sequence_hash, portfolio_hash) -> EvaluationResult`, avoiding
/// re-scoring a sequence that was already evaluated against this portfolio.
pub trait EvaluationStore: Send + Sync {
    fn put(&self, portfolio_hash: &str, evaluation: &EvaluationResult) -> Result<()>;
    fn get(&self, portfolio_hash: &str, sequence_hash: &str) -> Result<Option<EvaluationResult>>;

    /// Delete every cached evaluation for `portfolio_hash`.
    fn purge(&self, portfolio_hash: &str) -> Result<()>;
}

/// The plan(s) produced by the most recent planning run(s) against a given
/// portfolio hash — what a caller polls to find out "what should I do".
pub trait RecommendationStore: Send + Sync {
    fn put(&self, portfolio_hash: &str, plan: &HolisticPlan) -> Result<()>;
    fn latest(&self, portfolio_hash: &str) -> Result<Option<HolisticPlan>>;

    /// Delete all pending recommendations (including any "best result"
    /// record) for `portfolio_hash`.
    fn purge(&self, portfolio_hash: &str) -> Result<()>;
}

/// The single active `PlannerConfiguration`, independent of any portfolio
/// hash — settings persist across planning runs until explicitly replaced.
pub trait PlannerConfigStore: Send + Sync {
    fn get(&self) -> Result<Option<PlannerConfiguration>>;
    fn set(&self, config: &PlannerConfiguration) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
