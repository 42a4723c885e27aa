//! Rebalance sells: SELL out of geography/industry groups that run
//! overweight relative to their target allocation.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::shared::{sell_hard_gate, sell_priority};
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

/// Current portfolio weight allocated to each geography, by summing the
/// `weight_in_portfolio` of every held position in that geography.
fn current_geography_weights(ctx: &OpportunityContext) -> FxHashMap<String, f64> {
    let mut weights = FxHashMap::default();
    for position in &ctx.enriched_positions {
        *weights.entry(position.geography.clone()).or_insert(0.0) += position.weight_in_portfolio;
    }
    weights
}

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_sell || !config.allow_sell {
        return result;
    }

    let current_weights = current_geography_weights(ctx);

    for position in &ctx.enriched_positions {
        let current = current_weights.get(&position.geography).copied().unwrap_or(0.0);
        let target = ctx.geography_weights.get(&position.geography).copied().unwrap_or(0.0);
        let deviation = current - target;
        if deviation <= config.scoring.rebalance_deviation_threshold {
            continue;
        }

        if let Some(reason) = sell_hard_gate(position, ctx, config) {
            result.pre_filtered.push(crate::candidate::PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::RebalanceSells,
                reasons: vec![reason],
            });
            continue;
        }

        let quantity = (position.quantity as f64 * config.max_sell_percentage).floor() as i64;
        if quantity <= 0 {
            continue;
        }

        let mut tags = BTreeSet::new();
        tags.insert(Tag::NeedsRebalance);
        tags.insert(Tag::Overweight);

        let priority_multiplier = ctx
            .security(&position.isin)
            .map(|s| s.priority_multiplier)
            .unwrap_or(1.0);
        let priority = sell_priority(deviation, &tags, priority_multiplier);

        let price = ctx.price(&position.isin).unwrap_or_default();
        result.candidates.push(ActionCandidate::new(
            position.isin.clone(),
            position.symbol.clone(),
            position.name.clone(),
            Side::Sell,
            quantity,
            price,
            "EUR",
            format!(
                "rebalance sell: {} overweight by {:.1}pp",
                position.geography,
                deviation * 100.0
            ),
            priority,
            tags,
            CalculatorKind::RebalanceSells,
        ));
    }

    result
}
