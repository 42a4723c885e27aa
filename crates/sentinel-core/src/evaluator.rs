//! Evaluator: simulate each sequence against the starting
//! portfolio and score the resulting end state.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::candidate::Side;
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::isin::Isin;
use crate::money::EurCents;
use crate::sequence::ActionSequence;

/// The four weighted score components, named for the evaluation breakdown.
pub const COMPONENT_PORTFOLIO_QUALITY: &str = "portfolio_quality";
pub const COMPONENT_DIVERSIFICATION_ALIGNMENT: &str = "diversification_alignment";
pub const COMPONENT_RISK_ADJUSTED_METRICS: &str = "risk_adjusted_metrics";
pub const COMPONENT_END_STATE_IMPROVEMENT: &str = "end_state_improvement";

/// The outcome of simulating and scoring one `ActionSequence`.
#[derive(Clone, Debug)]
pub struct EvaluationResult {
    pub sequence_hash: String,
    pub end_score: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub end_cash_eur: EurCents,
    pub end_positions: BTreeMap<Isin, i64>,
    pub diversification_score: f64,
    pub total_value: EurCents,
    pub feasible: bool,
    pub error: Option<String>,
}

impl EvaluationResult {
    fn infeasible(sequence_hash: String, error: impl Into<String>) -> Self {
        Self {
            sequence_hash,
            end_score: 0.0,
            breakdown: BTreeMap::new(),
            end_cash_eur: EurCents::ZERO,
            end_positions: BTreeMap::new(),
            diversification_score: 0.0,
            total_value: EurCents::ZERO,
            feasible: false,
            error: Some(error.into()),
        }
    }
}

/// Ending per-security state after a full sequence replay.
struct EndState {
    cash: EurCents,
    quantities: FxHashMap<Isin, i64>,
}

fn replay(sequence: &ActionSequence, ctx: &OpportunityContext, config: &PlannerConfiguration) -> Result<EndState, String> {
    let mut cash = ctx.available_cash_eur;
    let mut quantities = FxHashMap::default();
    for position in &ctx.enriched_positions {
        quantities.insert(position.isin.clone(), position.quantity);
    }

    for step in &sequence.steps {
        let cost = crate::cost_model::transaction_cost(
            step.value_eur,
            EurCents::from_eur(config.transaction_cost_fixed),
            config.transaction_cost_percent,
        );
        match step.side {
            Side::Buy => {
                let new_cash = cash - step.value_eur - cost;
                if new_cash.as_eur() < config.min_cash_reserve {
                    return Err("infeasible replay".into());
                }
                cash = new_cash;
                *quantities.entry(step.isin.clone()).or_insert(0) += step.quantity;
            }
            Side::Sell => {
                let held = quantities.get(&step.isin).copied().unwrap_or(0);
                if step.quantity > held {
                    return Err("infeasible replay".into());
                }
                cash = cash + step.value_eur - cost;
                *quantities.entry(step.isin.clone()).or_insert(0) -= step.quantity;
            }
        }
    }

    Ok(EndState { cash, quantities })
}

/// Weighted-average quality across held positions at the given quantities,
/// weighted by ending market value.
fn portfolio_quality(ctx: &OpportunityContext, quantities: &FxHashMap<Isin, i64>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_value = 0.0;
    for (isin, &quantity) in quantities {
        if quantity <= 0 {
            continue;
        }
        let price = match ctx.price(isin) {
            Some(p) => p.as_eur(),
            None => continue,
        };
        let value = price * quantity as f64;
        let quality = (ctx.long_term_score(isin) + ctx.stability_score(isin) + ctx.opportunity_score(isin)) / 3.0;
        weighted_sum += quality * value;
        total_value += value;
    }
    if total_value <= 0.0 {
        0.0
    } else {
        weighted_sum / total_value
    }
}

fn weighted_risk_metric<F>(ctx: &OpportunityContext, quantities: &FxHashMap<Isin, i64>, metric: F) -> f64
where
    F: Fn(&OpportunityContext, &Isin) -> f64,
{
    let mut weighted_sum = 0.0;
    let mut total_value = 0.0;
    for (isin, &quantity) in quantities {
        if quantity <= 0 {
            continue;
        }
        let price = match ctx.price(isin) {
            Some(p) => p.as_eur(),
            None => continue,
        };
        let value = price * quantity as f64;
        weighted_sum += metric(ctx, isin) * value;
        total_value += value;
    }
    if total_value <= 0.0 {
        0.0
    } else {
        weighted_sum / total_value
    }
}

fn group_weights<F>(ctx: &OpportunityContext, quantities: &FxHashMap<Isin, i64>, total_value: f64, group_of: F) -> FxHashMap<String, f64>
where
    F: Fn(&crate::security::Security) -> String,
{
    let mut weights = FxHashMap::default();
    if total_value <= 0.0 {
        return weights;
    }
    for (isin, &quantity) in quantities {
        if quantity <= 0 {
            continue;
        }
        let (Some(price), Some(security)) = (ctx.price(isin), ctx.security(isin)) else {
            continue;
        };
        let value = price.as_eur() * quantity as f64;
        *weights.entry(group_of(security)).or_insert(0.0) += value / total_value;
    }
    weights
}

/// Deviation-from-target penalty, averaged equally across geography and
/// industry groupings. Industry has no externally
/// supplied target weight, so we compare against an equal-weight ideal
/// across the industries actually represented in the ending portfolio.
fn diversification_alignment(
    ctx: &OpportunityContext,
    quantities: &FxHashMap<Isin, i64>,
    total_value: f64,
    config: &PlannerConfiguration,
) -> (f64, f64) {
    let geography_current = group_weights(ctx, quantities, total_value, |s| s.geography.clone());
    let mut geography_deviation = 0.0;
    let mut seen_groups: std::collections::HashSet<&String> = geography_current.keys().collect();
    for key in ctx.geography_weights.keys() {
        seen_groups.insert(key);
    }
    for group in seen_groups {
        let current = geography_current.get(group).copied().unwrap_or(0.0);
        let target = ctx.geography_weights.get(group).copied().unwrap_or(0.0);
        geography_deviation += (current - target).abs();
    }

    let industry_current = group_weights(ctx, quantities, total_value, |s| s.industry.clone());
    let industry_target = if industry_current.is_empty() {
        0.0
    } else {
        1.0 / industry_current.len() as f64
    };
    let industry_deviation: f64 = industry_current.values().map(|w| (w - industry_target).abs()).sum();

    let penalty = ((geography_deviation + industry_deviation) / 2.0) * config.scoring.deviation_scale;
    let score = (1.0 - penalty).clamp(0.0, 1.0);
    (score, penalty)
}

fn risk_adjusted_metrics(ctx: &OpportunityContext, quantities: &FxHashMap<Isin, i64>, config: &PlannerConfiguration) -> f64 {
    let sharpe = weighted_risk_metric(ctx, quantities, |c, isin| c.sharpe(isin));
    let volatility = weighted_risk_metric(ctx, quantities, |c, isin| c.volatility(isin));
    let max_drawdown = weighted_risk_metric(ctx, quantities, |c, isin| c.max_drawdown(isin));

    let scoring = &config.scoring;
    let sharpe_score = scoring.tier_higher_is_better(sharpe, scoring.sharpe_excellent, scoring.sharpe_good, scoring.sharpe_acceptable);
    let volatility_score = scoring.tier_lower_is_better(
        volatility,
        scoring.volatility_excellent,
        scoring.volatility_good,
        scoring.volatility_acceptable,
    );
    let drawdown_score = scoring.tier_drawdown(max_drawdown);

    (sharpe_score + volatility_score + drawdown_score) / 3.0
}

/// Score a single sequence's end state.
pub fn evaluate_sequence(sequence: &ActionSequence, ctx: &OpportunityContext, config: &PlannerConfiguration) -> EvaluationResult {
    let end_state = match replay(sequence, ctx, config) {
        Ok(state) => state,
        Err(error) => return EvaluationResult::infeasible(sequence.sequence_hash.clone(), error),
    };

    let total_value_eur = end_state.cash.as_eur()
        + end_state
            .quantities
            .iter()
            .filter(|(_, &qty)| qty > 0)
            .filter_map(|(isin, &qty)| ctx.price(isin).map(|p| p.as_eur() * qty as f64))
            .sum::<f64>();

    let quality = portfolio_quality(ctx, &end_state.quantities);
    let (diversification_score, _penalty) =
        diversification_alignment(ctx, &end_state.quantities, total_value_eur, config);
    let risk_score = risk_adjusted_metrics(ctx, &end_state.quantities, config);

    let start_quantities: FxHashMap<Isin, i64> = ctx
        .enriched_positions
        .iter()
        .map(|p| (p.isin.clone(), p.quantity))
        .collect();
    let start_quality = portfolio_quality(ctx, &start_quantities);
    let improvement = (quality - start_quality).max(0.0);

    let weights = config.weights.regime_adjusted(ctx.regime_score, &config.scoring);

    let mut breakdown = BTreeMap::new();
    breakdown.insert(COMPONENT_PORTFOLIO_QUALITY.to_string(), quality);
    breakdown.insert(COMPONENT_DIVERSIFICATION_ALIGNMENT.to_string(), diversification_score);
    breakdown.insert(COMPONENT_RISK_ADJUSTED_METRICS.to_string(), risk_score);
    breakdown.insert(COMPONENT_END_STATE_IMPROVEMENT.to_string(), improvement);

    let end_score = weights.portfolio_quality * quality
        + weights.diversification_alignment * diversification_score
        + weights.risk_adjusted_metrics * risk_score
        + weights.end_state_improvement * improvement;

    let end_positions: BTreeMap<Isin, i64> = end_state.quantities.into_iter().collect();

    EvaluationResult {
        sequence_hash: sequence.sequence_hash.clone(),
        end_score,
        breakdown,
        end_cash_eur: end_state.cash,
        end_positions,
        diversification_score,
        total_value: EurCents::from_eur(total_value_eur),
        feasible: true,
        error: None,
    }
}

/// Evaluate every sequence, distributing work across a worker pool sized
/// to hardware parallelism minus one. Each worker owns its
/// own simulated clone; order of results is not significant.
pub fn evaluate_sequences(
    sequences: &[ActionSequence],
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
) -> Vec<EvaluationResult> {
    if sequences.is_empty() {
        return Vec::new();
    }

    let worker_count = std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
        .min(sequences.len());

    if worker_count <= 1 {
        return sequences.iter().map(|s| evaluate_sequence(s, ctx, config)).collect();
    }

    let chunk_size = sequences.len().div_ceil(worker_count);
    let mut results = Vec::with_capacity(sequences.len());

    std::thread::scope(|scope| {
        let handles: Vec<_> = sequences
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(|s| evaluate_sequence(s, ctx, config)).collect::<Vec<_>>()))
            .collect();
        for handle in handles {
            results.extend(handle.join().expect("evaluator worker panicked"));
        }
    });

    results
}
