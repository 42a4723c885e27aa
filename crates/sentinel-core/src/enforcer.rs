//! Constraint enforcer: a pure, ordered list of named checks applied
//! defensively to a candidate action list. Generation
//! already guarantees feasibility; this is the conservative last line,
//! never a generative step.

use crate::candidate::{ActionCandidate, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::money::EurCents;

/// An action the enforcer rejected, with the rule name that rejected it.
#[derive(Clone, Debug)]
pub struct FilteredAction {
    pub action: ActionCandidate,
    pub reason: String,
}

/// Runs every action through the ordered rule list, threading a running
/// cash balance so "insufficient cash" accounts for prior validated
/// steps in the same sequence.
pub fn enforce(
    actions: &[ActionCandidate],
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
) -> (Vec<ActionCandidate>, Vec<FilteredAction>) {
    let mut validated = Vec::new();
    let mut filtered = Vec::new();
    let mut running_cash = ctx.available_cash_eur;
    let min_trade_amount = EurCents::from_eur(config.min_trade_amount());

    for action in actions {
        match check(action, ctx, config, running_cash, min_trade_amount) {
            Some(reason) => filtered.push(FilteredAction {
                action: action.clone(),
                reason,
            }),
            None => {
                match action.side {
                    Side::Buy => {
                        let cost = crate::cost_model::transaction_cost(
                            action.value_eur,
                            EurCents::from_eur(config.transaction_cost_fixed),
                            config.transaction_cost_percent,
                        );
                        running_cash -= action.value_eur + cost;
                    }
                    Side::Sell => {
                        let cost = crate::cost_model::transaction_cost(
                            action.value_eur,
                            EurCents::from_eur(config.transaction_cost_fixed),
                            config.transaction_cost_percent,
                        );
                        running_cash += action.value_eur - cost;
                    }
                }
                validated.push(action.clone());
            }
        }
    }

    (validated, filtered)
}

fn check(
    action: &ActionCandidate,
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
    running_cash: EurCents,
    min_trade_amount: EurCents,
) -> Option<String> {
    let security = ctx.security(&action.isin);

    if action.side == Side::Sell && security.map(|s| !s.allow_sell).unwrap_or(false) {
        return Some("sell disallowed for security".into());
    }
    if action.side == Side::Buy && security.map(|s| !s.allow_buy).unwrap_or(false) {
        return Some("buy disallowed for security".into());
    }
    if action.side == Side::Sell {
        if let Some(position) = ctx.position(&action.isin) {
            if position.days_held < config.min_hold_days {
                return Some("min hold period".into());
            }
            if action.quantity > position.quantity {
                return Some("sell exceeds holding".into());
            }
        }
        if ctx.recently_sold_isins.contains(&action.isin) {
            return Some("recently sold cooldown".into());
        }
    }
    if action.side == Side::Buy && ctx.recently_bought_isins.contains(&action.isin) {
        return Some("recently bought cooldown".into());
    }
    if action.side == Side::Buy {
        let cost = crate::cost_model::transaction_cost(
            action.value_eur,
            EurCents::from_eur(config.transaction_cost_fixed),
            config.transaction_cost_percent,
        );
        if action.value_eur + cost > running_cash {
            return Some("insufficient cash".into());
        }
    }
    if action.value_eur < min_trade_amount {
        return Some("below min trade amount".into());
    }

    None
}
