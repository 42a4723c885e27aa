//! Weight-based: SELL a position back toward its per-security
//! `max_portfolio_target` once it drifts past it by a significant margin.

use std::collections::BTreeSet;

use super::shared::{sell_hard_gate, sell_priority};
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_sell || !config.allow_sell {
        return result;
    }

    for position in &ctx.enriched_positions {
        let security = match ctx.security(&position.isin) {
            Some(s) => s,
            None => continue,
        };
        let margin = position.weight_in_portfolio - security.max_portfolio_target;
        if margin <= config.scoring.weight_deviation_threshold {
            continue;
        }

        if let Some(reason) = sell_hard_gate(position, ctx, config) {
            result.pre_filtered.push(crate::candidate::PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::WeightBased,
                reasons: vec![reason],
            });
            continue;
        }

        let price = match ctx.price(&position.isin) {
            Some(p) if p.as_eur() > 0.0 => p,
            _ => continue,
        };

        let target_value = security.max_portfolio_target * ctx.total_portfolio_value_eur.as_eur();
        let excess_value = position.market_value_eur.as_eur() - target_value;
        let excess_quantity = (excess_value / price.as_eur()).floor() as i64;
        let capped_quantity = (position.quantity as f64 * config.max_sell_percentage).floor() as i64;
        let quantity = excess_quantity.min(capped_quantity).min(position.quantity);
        if quantity <= 0 {
            continue;
        }

        let mut tags = BTreeSet::new();
        tags.insert(Tag::Overweight);

        let priority_multiplier = security.priority_multiplier;
        let priority = sell_priority(margin, &tags, priority_multiplier);

        result.candidates.push(ActionCandidate::new(
            position.isin.clone(),
            position.symbol.clone(),
            position.name.clone(),
            Side::Sell,
            quantity,
            price,
            "EUR",
            format!(
                "weight-based sell: {:.1}% over max target of {:.1}%",
                position.weight_in_portfolio * 100.0,
                security.max_portfolio_target * 100.0
            ),
            priority,
            tags,
            CalculatorKind::WeightBased,
        ));
    }

    result
}
