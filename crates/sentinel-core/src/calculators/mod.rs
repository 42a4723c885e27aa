//! Opportunity calculators.
//!
//! Six stateless scanners, modeled as a closed tagged variant rather than
//! an open trait object hierarchy: the set is fixed and no external
//! extension point is required.

mod averaging_down;
mod opportunity_buys;
mod profit_taking;
mod rebalance_buys;
mod rebalance_sells;
mod shared;
mod weight_based;

use crate::candidate::{CalculatorKind, CalculatorResult};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calculator {
    ProfitTaking,
    AveragingDown,
    OpportunityBuys,
    RebalanceSells,
    RebalanceBuys,
    WeightBased,
}

pub const ALL: [Calculator; 6] = [
    Calculator::ProfitTaking,
    Calculator::AveragingDown,
    Calculator::OpportunityBuys,
    Calculator::RebalanceSells,
    Calculator::RebalanceBuys,
    Calculator::WeightBased,
];

impl Calculator {
    pub fn kind(&self) -> CalculatorKind {
        match self {
            Calculator::ProfitTaking => CalculatorKind::ProfitTaking,
            Calculator::AveragingDown => CalculatorKind::AveragingDown,
            Calculator::OpportunityBuys => CalculatorKind::OpportunityBuys,
            Calculator::RebalanceSells => CalculatorKind::RebalanceSells,
            Calculator::RebalanceBuys => CalculatorKind::RebalanceBuys,
            Calculator::WeightBased => CalculatorKind::WeightBased,
        }
    }

    pub fn is_enabled(&self, config: &PlannerConfiguration) -> bool {
        match self {
            Calculator::ProfitTaking => config.enable_profit_taking_calc,
            Calculator::AveragingDown => config.enable_averaging_down_calc,
            Calculator::OpportunityBuys => config.enable_opportunity_buys_calc,
            Calculator::RebalanceSells => config.enable_rebalance_sells_calc,
            Calculator::RebalanceBuys => config.enable_rebalance_buys_calc,
            Calculator::WeightBased => config.enable_weight_based_calc,
        }
    }

    pub fn evaluate(&self, ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
        match self {
            Calculator::ProfitTaking => profit_taking::evaluate(ctx, config),
            Calculator::AveragingDown => averaging_down::evaluate(ctx, config),
            Calculator::OpportunityBuys => opportunity_buys::evaluate(ctx, config),
            Calculator::RebalanceSells => rebalance_sells::evaluate(ctx, config),
            Calculator::RebalanceBuys => rebalance_buys::evaluate(ctx, config),
            Calculator::WeightBased => weight_based::evaluate(ctx, config),
        }
    }
}

/// Run every enabled calculator and merge their results. A disabled
/// calculator contributes nothing — no candidates, no pre-filtered
/// records.
pub fn run_enabled(ctx: &OpportunityContext, config: &PlannerConfiguration) -> CalculatorResult {
    let mut result = CalculatorResult::new();
    for calculator in ALL {
        if calculator.is_enabled(config) {
            result.merge(calculator.evaluate(ctx, config));
        }
    }
    result
}
