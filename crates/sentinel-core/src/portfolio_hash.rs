//! Deterministic content hash of a portfolio snapshot.
//!
//! Used to detect whether a previously generated plan is still valid for
//! the current portfolio state. Construction never fails: any input that
//! is absent is simply rendered as an empty collection, so a hash can
//! always be produced even from a partial snapshot.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

/// A universe member's hash-relevant fields: active flag, target band and
/// allow-flags. Two securities that agree on `active` but differ on a
/// target or an allow-flag must still hash differently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniverseEntry {
    pub active: bool,
    pub min_target: f64,
    pub max_target: f64,
    pub allow_buy: bool,
    pub allow_sell: bool,
}

/// Everything that, if it changes, should invalidate a standing plan.
#[derive(Clone, Debug, Default)]
pub struct PortfolioHashInput {
    /// ISIN → (quantity, average_cost EUR).
    pub positions: BTreeMap<String, (i64, f64)>,
    /// ISIN → active flag, target band and allow-flags: the tradable universe.
    pub universe: BTreeMap<String, UniverseEntry>,
    /// Currency → amount.
    pub cash: BTreeMap<String, f64>,
    /// Planner settings rendered as key=value strings.
    pub settings: BTreeMap<String, String>,
    /// Hash of the active `PlannerConfiguration` (opaque to this module).
    pub config_hash: String,
    /// Pending order descriptions, e.g. "ISIN:SIDE:QTY".
    pub pending_orders: Vec<String>,
}

/// A `PortfolioHash` is the MD5 hex digest of a canonical rendering of a
/// `PortfolioHashInput`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortfolioHash(pub String);

impl std::fmt::Display for PortfolioHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn compute_portfolio_hash(input: &PortfolioHashInput) -> PortfolioHash {
    let mut canonical = String::new();

    canonical.push_str("positions:");
    for (isin, (quantity, average_cost)) in &input.positions {
        canonical.push_str(&format!("{isin}={quantity}@{average_cost:.2};"));
    }

    canonical.push_str("|universe:");
    for (isin, entry) in &input.universe {
        canonical.push_str(&format!(
            "{isin}={}:{:.4}:{:.4}:{}:{};",
            entry.active, entry.min_target, entry.max_target, entry.allow_buy, entry.allow_sell
        ));
    }

    canonical.push_str("|cash:");
    for (currency, amount) in &input.cash {
        canonical.push_str(&format!("{currency}={amount:.2};"));
    }

    canonical.push_str("|settings:");
    for (key, value) in &input.settings {
        canonical.push_str(&format!("{key}={value};"));
    }

    canonical.push_str("|config:");
    canonical.push_str(&input.config_hash);

    canonical.push_str("|pending:");
    let mut pending = input.pending_orders.clone();
    pending.sort();
    for order in &pending {
        canonical.push_str(order);
        canonical.push(';');
    }

    let digest = Md5::digest(canonical.as_bytes());
    PortfolioHash(format!("{digest:x}"))
}
