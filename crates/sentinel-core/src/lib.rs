//! Holistic portfolio planner core: opportunity calculators, sequence
//! generation, evaluation and selection.
//!
//! The pipeline runs in the order the modules are declared below: a
//! `context::OpportunityContext` is built once per run, fed to the
//! `calculators`, whose candidates are combined into `sequence`s by the
//! `generator`, scored by the `evaluator`, checked by the `enforcer`, and
//! assembled into a `plan::HolisticPlan` by the `selector`.

pub mod calculators;
pub mod candidate;
pub mod config;
pub mod context;
pub mod cost_model;
pub mod enforcer;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod isin;
pub mod money;
pub mod plan;
pub mod portfolio_hash;
pub mod position;
pub mod security;
pub mod selector;
pub mod sequence;
pub mod tag;

pub use candidate::{ActionCandidate, CalculatorKind, CalculatorResult, DismissalReason, PreFilteredSecurity, Side};
pub use config::PlannerConfiguration;
pub use context::{OpportunityContext, OpportunityContextBuilder, RawPosition, SecurityIndex};
pub use error::{Error, Result};
pub use evaluator::EvaluationResult;
pub use isin::Isin;
pub use money::EurCents;
pub use plan::{HolisticPlan, HolisticStep};
pub use portfolio_hash::{compute_portfolio_hash, PortfolioHash, PortfolioHashInput};
pub use position::EnrichedPosition;
pub use security::Security;
pub use selector::{select_plan, PlanResult, RejectedOpportunity, RejectedSequence};
pub use sequence::ActionSequence;
pub use tag::Tag;
