//! Rebalance buys: BUY into securities whose target weight exceeds their
//! current weight by more than a deviation threshold, closing half the
//! gap per step.

use std::collections::BTreeSet;

use super::shared::{buy_hard_gate, shares_for_value};
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, PreFilteredSecurity, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_buy || !config.allow_buy {
        return result;
    }

    for security in ctx.securities() {
        if security.isin.is_cash() || !security.active {
            continue;
        }
        let isin = &security.isin;
        let current_weight = ctx
            .position(isin)
            .map(|p| p.weight_in_portfolio)
            .unwrap_or(0.0);
        let target_weight = ctx.target_weight(isin);
        let gap = target_weight - current_weight;
        if gap <= config.scoring.rebalance_deviation_threshold {
            continue;
        }

        if let Some(reason) = buy_hard_gate(isin, security.allow_buy, ctx) {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: isin.clone(),
                symbol: security.symbol.clone(),
                name: security.name.clone(),
                calculator: CalculatorKind::RebalanceBuys,
                reasons: vec![reason],
            });
            continue;
        }

        let price = match ctx.price(isin) {
            Some(p) if p.as_eur() > 0.0 => p,
            _ => continue,
        };

        let gap_value = 0.5 * gap * ctx.total_portfolio_value_eur.as_eur();
        let target_value = gap_value.min(config.scoring.max_value_per_position);
        let quantity = shares_for_value(target_value, price.as_eur(), security.min_lot);
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
                isin: isin.clone(),
                symbol: security.symbol.clone(),
                name: security.name.clone(),
                calculator: CalculatorKind::RebalanceBuys,
                reasons: vec![crate::candidate::DismissalReason {
                    reason: "insufficient cash".into(),
                    dismissed: true,
                }],
            });
            continue;
        }

        let mut tags = BTreeSet::new();
        tags.insert(Tag::NeedsRebalance);
        let priority = gap * security.priority_multiplier;

        result.candidates.push(ActionCandidate::new(
            isin.clone(),
            security.symbol.clone(),
            security.name.clone(),
            Side::Buy,
            quantity,
            price,
            "EUR",
            format!("rebalance buy: closing {:.1}pp underweight gap", gap * 100.0),
            priority,
            tags,
            CalculatorKind::RebalanceBuys,
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OpportunityContextBuilder;
    use crate::isin::Isin;
    use crate::money::EurCents;
    use crate::security::Security;

    fn security(isin: &str) -> Security {
        Security {
            isin: Isin::new(isin).unwrap(),
            symbol: "VWCE".into(),
            name: "Vanguard World".into(),
            currency: "EUR".into(),
            geography: "Global".into(),
            industry: "ETF".into(),
            exchange: "XETRA".into(),
            min_lot: 1,
            allow_buy: true,
            allow_sell: true,
            active: true,
            priority_multiplier: 1.0,
            min_portfolio_target: 0.0,
            max_portfolio_target: 1.0,
        }
    }

    #[test]
    fn underweight_target_triggers_buy() {
        let isin = Isin::new("IE00BK5BQT80").unwrap();
        let ctx = OpportunityContextBuilder::new()
            .security(security("IE00BK5BQT80"))
            .price(isin.clone(), EurCents::from_eur(100.0))
            .cash(EurCents::from_eur(10000.0))
            .target_weight(isin, 0.50)
            .build()
            .unwrap();

        let config = PlannerConfiguration::default();
        let result = evaluate(&ctx, &config);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].side, Side::Buy);
    }

    #[test]
    fn at_target_weight_produces_nothing() {
        let isin = Isin::new("IE00BK5BQT80").unwrap();
        let ctx = OpportunityContextBuilder::new()
            .security(security("IE00BK5BQT80"))
            .price(isin.clone(), EurCents::from_eur(100.0))
            .cash(EurCents::from_eur(10000.0))
            .target_weight(isin, 0.0)
            .build()
            .unwrap();

        let config = PlannerConfiguration::default();
        let result = evaluate(&ctx, &config);
        assert!(result.candidates.is_empty());
    }
}
