//! Trait-only persistence abstractions for the holistic planner:
//! a sequence store, an evaluation store, a recommendation store and a
//! planner-config store, plus one in-memory reference implementation of
//! all four. Mirrors a broker-trait-plus-mock split: this crate defines
//! the shape and ships an adapter for local/dev use and tests, leaving a
//! real backing store (SQLite, a remote cache) to an external
//! collaborator.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Error, Result};
pub use memory::InMemoryStore;
pub use traits::{EvaluationStore, PlannerConfigStore, RecommendationStore, SequenceStore};
