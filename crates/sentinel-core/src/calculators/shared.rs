//! Helpers shared across the six calculators: common pre-filter checks and
//! the priority boost rule.

use std::collections::BTreeSet;

use crate::candidate::DismissalReason;
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::position::EnrichedPosition;
use crate::tag::{Tag, SELL_PRIORITY_BOOST_TAGS};

/// Hard SELL gates common to profit-taking, rebalance-sells and
/// weight-based: min-hold period, `allow_sell`, and ineligibility.
/// Returns the dismissal reason if the position cannot be sold at all.
pub(super) fn sell_hard_gate(
    position: &EnrichedPosition,
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
) -> Option<DismissalReason> {
    if !position.allow_sell {
        return Some(DismissalReason {
            reason: "sell disallowed for security".into(),
            dismissed: true,
        });
    }
    if position.days_held < config.min_hold_days {
        return Some(DismissalReason {
            reason: "min hold period".into(),
            dismissed: true,
        });
    }
    if ctx.ineligible_isins.contains(&position.isin) {
        return Some(DismissalReason {
            reason: "ineligible security".into(),
            dismissed: true,
        });
    }
    None
}

/// Hard BUY gates common to opportunity-buys and rebalance-buys:
/// `allow_buy` and the recently-bought cooldown.
pub(super) fn buy_hard_gate(
    isin: &crate::isin::Isin,
    allow_buy: bool,
    ctx: &OpportunityContext,
) -> Option<DismissalReason> {
    if !allow_buy {
        return Some(DismissalReason {
            reason: "buy disallowed for security".into(),
            dismissed: true,
        });
    }
    if ctx.recently_bought_isins.contains(isin) {
        return Some(DismissalReason {
            reason: "recently bought cooldown".into(),
            dismissed: true,
        });
    }
    None
}

/// `priority = base * boost * security.priority_multiplier`. Windfall is the
/// strongest sell signal and carries the highest boost; the other
/// boost-eligible tags share a lower tier; no boost tag means no boost.
pub(super) fn sell_priority(base: f64, tags: &BTreeSet<Tag>, priority_multiplier: f64) -> f64 {
    let boost = if tags.contains(&Tag::Windfall) {
        2.0
    } else if tags.iter().any(|t| SELL_PRIORITY_BOOST_TAGS.contains(t)) {
        1.5
    } else {
        1.0
    };
    base * boost * priority_multiplier
}

/// Whole shares obtainable for `value_eur` at `price`, respecting `min_lot`.
pub(super) fn shares_for_value(value_eur: f64, price_eur: f64, min_lot: u32) -> i64 {
    if price_eur <= 0.0 {
        return 0;
    }
    let raw_shares = (value_eur / price_eur).floor() as i64;
    let lot = min_lot.max(1) as i64;
    (raw_shares / lot) * lot
}

/// Cheap-but-low-quality heuristic (opportunity-buys' value-trap gate,
/// reused by averaging-down): low stability, low long-term score and weak
/// momentum together.
pub(super) fn is_value_trap(
    ctx: &OpportunityContext,
    isin: &crate::isin::Isin,
    scoring: &crate::config::ScoringParams,
) -> bool {
    ctx.stability_score(isin) < scoring.value_trap_stability_threshold
        && ctx.long_term_score(isin) < scoring.value_trap_long_term_threshold
        && ctx.momentum_score(isin) < scoring.value_trap_momentum_threshold
}
