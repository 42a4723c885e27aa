//! Opportunity buys: BUY securities not currently held that clear a score
//! and quality bar.
//!
//! "Fundamentals" is not a separate `OpportunityContext` field; we read it
//! from `opportunity_score`, the one context series left otherwise unused
//! by any calculator.

use std::collections::BTreeSet;

use super::shared::{buy_hard_gate, is_value_trap, shares_for_value};
use crate::candidate::{ActionCandidate, CalculatorKind, CalculatorResult, DismissalReason, PreFilteredSecurity, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::tag::Tag;

pub fn evaluate(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    if !ctx.allow_buy || !config.allow_buy {
        return result;
    }

    for security in ctx.unheld_active_securities() {
        let isin = &security.isin;
        let symbol = security.symbol.clone();
        let name = security.name.clone();

        if let Some(reason) = buy_hard_gate(isin, security.allow_buy, ctx) {
            result.pre_filtered.push(PreFilteredSecurity {
                isin: isin.clone(),
                symbol,
                name,
                calculator: CalculatorKind::OpportunityBuys,
                reasons: vec![reason],
            });
            continue;
        }

        let price = match ctx.price(isin) {
            Some(p) if p.as_eur() > 0.0 => p,
            _ => continue,
        };

        let score = ctx.score(isin);
        let fundamentals = ctx.opportunity_score(isin);
        let long_term_score = ctx.long_term_score(isin);

        let kelly_value = ctx.kelly_size(isin) * ctx.total_portfolio_value_eur.as_eur();
        let target_value = config.scoring.max_value_per_position.min(kelly_value.max(0.0));
        let quantity = shares_for_value(target_value, price.as_eur(), security.min_lot);
        let value_eur = price.as_eur() * quantity as f64;
        let cost = crate::cost_model::transaction_cost(
            crate::money::EurCents::from_eur(value_eur),
            crate::money::EurCents::from_eur(config.transaction_cost_fixed),
            config.transaction_cost_percent,
        );

        if crate::money::EurCents::from_eur(value_eur) + cost > ctx.available_cash_eur {
            result.pre_filtered.push(reject(isin, &security.symbol, &security.name, "insufficient cash", true));
            continue;
        }

        if score < config.scoring.min_score {
            result.pre_filtered.push(reject(
                isin,
                &security.symbol,
                &security.name,
                "security score below minimum",
                true,
            ));
            continue;
        }

        let quality_gate_fails =
            fundamentals < config.scoring.fundamentals_threshold && long_term_score < config.scoring.long_term_threshold;
        if quality_gate_fails {
            result.pre_filtered.push(reject(isin, &security.symbol, &security.name, "quality gate", true));
            continue;
        }

        if is_value_trap(ctx, isin, &config.scoring) {
            result.pre_filtered.push(reject(
                isin,
                &security.symbol,
                &security.name,
                "value trap heuristic",
                true,
            ));
            continue;
        }

        let cagr = ctx.cagr(isin);
        let exceptional = long_term_score >= config.scoring.exceptional_quality_threshold
            || fundamentals >= config.scoring.exceptional_quality_threshold;
        let target_return_floor = ctx.target_return * ctx.target_return_threshold_pct;
        if cagr < target_return_floor && !exceptional {
            result.pre_filtered.push(reject(
                isin,
                &security.symbol,
                &security.name,
                "below target return",
                true,
            ));
            continue;
        }

        if quantity <= 0 {
            continue;
        }

        let mut tags = BTreeSet::new();
        if long_term_score >= config.scoring.exceptional_quality_threshold {
            tags.insert(Tag::QualityValue);
        }

        let priority = score * security.priority_multiplier;

        result.candidates.push(ActionCandidate::new(
            isin.clone(),
            security.symbol.clone(),
            security.name.clone(),
            Side::Buy,
            quantity,
            price,
            "EUR",
            format!("opportunity buy: score {score:.2}, CAGR {:.1}%", cagr * 100.0),
            priority,
            tags,
            CalculatorKind::OpportunityBuys,
        ));
    }

    result
}

fn reject(
    isin: &crate::isin::Isin,
    symbol: &str,
    name: &str,
    reason: &str,
    dismissed: bool,
) -> PreFilteredSecurity {
    PreFilteredSecurity {
        isin: isin.clone(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        calculator: CalculatorKind::OpportunityBuys,
        reasons: vec![DismissalReason {
            reason: reason.to_string(),
            dismissed,
        }],
    }
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
            symbol: "NVDA".into(),
            name: "Nvidia".into(),
            currency: "EUR".into(),
            geography: "US".into(),
            industry: "Tech".into(),
            exchange: "NASDAQ".into(),
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
    fn cash_constrained_buy_is_dismissed() {
        let isin = Isin::new("US67066G1040").unwrap();
        let ctx = OpportunityContextBuilder::new()
            .security(security("US67066G1040"))
            .price(isin.clone(), EurCents::from_eur(60.0))
            .cash(EurCents::from_eur(300.0))
            .security_score(isin.clone(), 0.9)
            .long_term_score(isin.clone(), 0.9)
            .opportunity_score(isin.clone(), 0.9)
            .cagr(isin.clone(), 0.20)
            .kelly_size(isin, 10.0)
            .build()
            .unwrap();

        let config = PlannerConfiguration::default();
        let result = evaluate(&ctx, &config);
        assert!(result.candidates.is_empty());
        assert_eq!(result.pre_filtered.len(), 1);
        assert_eq!(result.pre_filtered[0].reasons[0].reason, "insufficient cash");
    }

    #[test]
    fn qualifying_security_produces_a_buy() {
        let isin = Isin::new("US67066G1040").unwrap();
        let ctx = OpportunityContextBuilder::new()
            .security(security("US67066G1040"))
            .price(isin.clone(), EurCents::from_eur(60.0))
            .cash(EurCents::from_eur(10000.0))
            .security_score(isin.clone(), 0.9)
            .long_term_score(isin.clone(), 0.9)
            .opportunity_score(isin.clone(), 0.9)
            .cagr(isin.clone(), 0.20)
            .kelly_size(isin, 0.2)
            .build()
            .unwrap();

        let config = PlannerConfiguration::default();
        let result = evaluate(&ctx, &config);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].side, Side::Buy);
    }

    #[test]
    fn below_min_score_is_dismissed() {
        let isin = Isin::new("US67066G1040").unwrap();
        let ctx = OpportunityContextBuilder::new()
            .security(security("US67066G1040"))
            .price(isin.clone(), EurCents::from_eur(60.0))
            .cash(EurCents::from_eur(10000.0))
            .security_score(isin.clone(), 0.2)
            .kelly_size(isin, 0.2)
            .build()
            .unwrap();

        let config = PlannerConfiguration::default();
        let result = evaluate(&ctx, &config);
        assert!(result.candidates.is_empty());
        assert_eq!(result.pre_filtered[0].reasons[0].reason, "security score below minimum");
    }
}
