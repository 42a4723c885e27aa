//! Profit-taking: SELL held positions once unrealized gain clears a
//! threshold.

use std::collections::BTreeSet;

use super::shared::{sell_hard_gate, sell_priority};
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, DismissalReason, PreFilteredSecurity, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_sell || !config.allow_sell {
        return result;
    }

    for position in &ctx.enriched_positions {
        if let Some(reason) = sell_hard_gate(position, ctx, config) {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::ProfitTaking,
                reasons: vec![reason],
            });
            continue;
        }

        if position.unrealized_pnl_pct < config.scoring.min_gain_threshold {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::ProfitTaking,
                reasons: vec![DismissalReason {
                    reason: "gain below threshold".into(),
                    dismissed: false,
                }],
            });
            continue;
        }

        let quantity = (position.quantity as f64 * config.max_sell_percentage).floor() as i64;
        if quantity <= 0 {
            continue;
        }

        let mut tags = BTreeSet::new();
        if position.unrealized_pnl_pct >= config.scoring.windfall_threshold {
            tags.insert(Tag::Windfall);
        }

        let priority_multiplier = ctx
            .security(&position.isin)
            .map(|s| s.priority_multiplier)
            .unwrap_or(1.0);
        let priority = sell_priority(position.unrealized_pnl_pct, &tags, priority_multiplier);

        let reason = if tags.contains(&Tag::Windfall) {
            format!(
                "windfall profit-taking: {:.1}% gain over {} days",
                position.unrealized_pnl_pct * 100.0,
                position.days_held
            )
        } else {
            format!(
                "profit-taking: {:.1}% gain over {} days",
                position.unrealized_pnl_pct * 100.0,
                position.days_held
            )
        };

        let price = ctx.price(&position.isin).unwrap_or_default();
        result.candidates.push(ActionCandidate::new(
            position.isin.clone(),
            position.symbol.clone(),
            position.name.clone(),
            Side::Sell,
            quantity,
            price,
            "EUR",
            reason,
            priority,
            tags,
            CalculatorKind::ProfitTaking,
        ));
    }

    result
}
