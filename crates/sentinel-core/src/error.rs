//! Error types for the planner core.
//!
//! Only data-integrity failures are represented as `Result::Err` here —
//! transient and internal-evaluation failures are represented as data
//! (see `EvaluationResult::error`, `CalculatorResult`) per the planner's
//! error-handling policy.

/// Errors that can occur while building planner inputs or running the
/// deterministic pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid ISIN: {0}")]
    InvalidIsin(String),

    #[error("price for {isin} must be positive, got {price}")]
    NonPositivePrice { isin: String, price: f64 },

    #[error("cash balance for {currency} is negative: {amount}")]
    NegativeCash { currency: String, amount: f64 },

    #[error("position {isin} has no matching security in the universe")]
    MissingSecurity { isin: String },

    #[error("position {isin} has no current price")]
    MissingPrice { isin: String },

    #[error("target_return_threshold_pct must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("regime_score must be in [-1, 1], got {0}")]
    InvalidRegimeScore(f64),

    #[error("planner configuration is invalid: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
