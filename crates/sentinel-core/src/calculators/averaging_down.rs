//! Averaging-down: BUY more of a held position whose loss sits within a
//! configured band, subject to a quality gate.

use std::collections::BTreeSet;

use super::shared::is_value_trap;
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, DismissalReason, PreFilteredSecurity, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_buy || !config.allow_buy {
        return result;
    }

    // The band is [max_loss_threshold, min_loss_threshold]; both are
    // negative, with max_loss_threshold the deeper (more negative) bound.
    let lower_bound = config.max_loss_threshold;
    let upper_bound = config.scoring.min_loss_threshold;

    for position in &ctx.enriched_positions {
        if !position.allow_buy {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::AveragingDown,
                reasons: vec![DismissalReason {
                    reason: "buy disallowed for security".into(),
                    dismissed: true,
                }],
            });
            continue;
        }

        let in_band = position.unrealized_pnl_pct >= lower_bound && position.unrealized_pnl_pct <= upper_bound;
        if !in_band {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::AveragingDown,
                reasons: vec![DismissalReason {
                    reason: "loss outside averaging-down band".into(),
                    dismissed: false,
                }],
            });
            continue;
        }

        let long_term_score = ctx.long_term_score(&position.isin);
        let value_trap = is_value_trap(ctx, &position.isin, &config.scoring);
        if long_term_score < config.scoring.quality_threshold || value_trap {
            let reason = if value_trap {
                "value trap heuristic"
            } else {
                "long-term quality gate"
            };
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::AveragingDown,
                reasons: vec![DismissalReason {
                    reason: reason.into(),
                    dismissed: true,
                }],
            });
            continue;
        }

        let price = match ctx.price(&position.isin) {
            Some(p) if p.as_eur() > 0.0 => p,
            _ => continue,
        };
        let quantity = (config.averaging_down_percent * position.quantity as f64).floor() as i64;
        if quantity <= 0 {
            continue;
        }

        let value_eur = price.as_eur() * quantity as f64;
        let cost = crate::cost_model::transaction_cost(
            crate::money::EurCents::from_eur(value_eur),
            crate::money::EurCents::from_eur(config.transaction_cost_fixed),
            config.transaction_cost_percent,
        );
        if crate::money::EurCents::from_eur(value_eur) + cost > ctx.available_cash_eur {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: position.isin.clone(),
                symbol: position.symbol.clone(),
                name: position.name.clone(),
                calculator: CalculatorKind::AveragingDown,
                reasons: vec![DismissalReason {
                    reason: "insufficient cash".into(),
                    dismissed: true,
                }],
            });
            continue;
        }

        let mut tags = BTreeSet::new();
        tags.insert(Tag::AveragingDown);
        if long_term_score >= config.scoring.exceptional_quality_threshold {
            tags.insert(Tag::QualityValue);
        }

        let priority_multiplier = ctx
            .security(&position.isin)
            .map(|s| s.priority_multiplier)
            .unwrap_or(1.0);
        let priority = position.unrealized_pnl_pct.abs() * priority_multiplier;

        result.candidates.push(ActionCandidate::new(
            position.isin.clone(),
            position.symbol.clone(),
            position.name.clone(),
            Side::Buy,
            quantity,
            price,
            "EUR",
            format!(
                "averaging down: {:.1}% loss, long_term_score {:.2}",
                position.unrealized_pnl_pct * 100.0,
                long_term_score
            ),
            priority,
            tags,
            CalculatorKind::AveragingDown,
        ));
    }

    result
}
