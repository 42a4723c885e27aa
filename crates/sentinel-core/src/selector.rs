//! Planner orchestrator: drives calculators → generator →
//! evaluator → enforcer and assembles the final `PlanResult`.

use md5::{Digest, Md5};
use rustc_hash::FxHashMap;

use crate::calculators;
use crate::candidate::{ActionCandidate, CalculatorKind, PreFilteredSecurity, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::enforcer;
use crate::evaluator::{self, EvaluationResult};
use crate::generator;
use crate::isin::Isin;
use crate::plan::HolisticPlan;
use crate::portfolio_hash::{compute_portfolio_hash, PortfolioHash, PortfolioHashInput, UniverseEntry};
use crate::sequence::ActionSequence;

/// A calculator candidate that did not make it into the winning plan.
#[derive(Clone, Debug)]
pub struct RejectedOpportunity {
    pub candidate: ActionCandidate,
    pub reason: String,
}

/// A generated sequence that was not the one selected.
#[derive(Clone, Debug)]
pub struct RejectedSequence {
    pub sequence_hash: String,
    pub end_score: f64,
    pub reason: String,
}

/// The full output of one planning run.
#[derive(Clone, Debug)]
pub struct PlanResult {
    pub plan: HolisticPlan,
    pub portfolio_hash: PortfolioHash,
    pub rejected_opportunities: Vec<RejectedOpportunity>,
    pub pre_filtered_securities: Vec<PreFilteredSecurity>,
    pub rejected_sequences: Vec<RejectedSequence>,
    /// True when no evaluated sequence was feasible and the plan fell back
    /// to the highest-priority sequence without an evaluator score behind
    /// it. The plan is also marked infeasible in this case.
    pub used_fallback_sequence: bool,
}

fn group_by_category(candidates: Vec<ActionCandidate>) -> FxHashMap<CalculatorKind, Vec<ActionCandidate>> {
    let mut grouped: FxHashMap<CalculatorKind, Vec<ActionCandidate>> = FxHashMap::default();
    for candidate in candidates {
        grouped.entry(candidate.calculator).or_default().push(candidate);
    }
    grouped
}

fn sequence_contains(sequence: &ActionSequence, isin: &Isin, side: Side, calculator: CalculatorKind) -> bool {
    sequence
        .steps
        .iter()
        .any(|s| &s.isin == isin && s.side == side && s.calculator == calculator)
}

fn portfolio_hash_for(ctx: &OpportunityContext, config: &PlannerConfiguration) -> PortfolioHash {
    let mut input = PortfolioHashInput::default();
    for position in &ctx.enriched_positions {
        input
            .positions
            .insert(position.isin.to_string(), (position.quantity, position.average_cost.as_eur()));
    }
    for security in ctx.securities() {
        input.universe.insert(
            security.isin.to_string(),
            UniverseEntry {
                active: security.active,
                min_target: security.min_portfolio_target,
                max_target: security.max_portfolio_target,
                allow_buy: security.allow_buy,
                allow_sell: security.allow_sell,
            },
        );
    }
    if !ctx.available_cash_eur.is_zero() {
        input.cash.insert("EUR".to_string(), ctx.available_cash_eur.as_eur());
    }
    input.config_hash = format!("{:x}", Md5::digest(format!("{config:?}").as_bytes()));
    PortfolioHash(compute_portfolio_hash(&input).0)
}

/// Run the full pipeline and produce a `PlanResult`.
pub fn select_plan(ctx: &OpportunityContext, config: &PlannerConfiguration) -> PlanResult {
    let portfolio_hash = portfolio_hash_for(ctx, config);

    let calc_result = calculators::run_enabled(ctx, config);
    let pre_filtered_securities = {
        let mut v = calc_result.pre_filtered.clone();
        v.sort_by(|a, b| (a.calculator.to_string(), &a.symbol).cmp(&(b.calculator.to_string(), &b.symbol)));
        v
    };

    let baseline = evaluator::evaluate_sequence(&ActionSequence::new(vec![], None), ctx, config);
    let current_score = baseline.end_score;

    let by_category = group_by_category(calc_result.candidates.clone());
    let sequences = generator::generate_sequences(&by_category, ctx, config);

    if sequences.is_empty() {
        let rejected_opportunities = calc_result
            .candidates
            .iter()
            .map(|c| RejectedOpportunity {
                candidate: c.clone(),
                reason: "not selected by sequence generator".to_string(),
            })
            .collect();
        return finalize(
            HolisticPlan::empty(current_score),
            portfolio_hash,
            rejected_opportunities,
            pre_filtered_securities,
            Vec::new(),
            false,
        );
    }

    let evaluations: FxHashMap<String, EvaluationResult> = evaluator::evaluate_sequences(&sequences, ctx, config)
        .into_iter()
        .map(|e| (e.sequence_hash.clone(), e))
        .collect();

    let mut feasible_ranked: Vec<&ActionSequence> = sequences
        .iter()
        .filter(|s| evaluations.get(&s.sequence_hash).map(|e| e.feasible).unwrap_or(false))
        .collect();
    feasible_ranked.sort_by(|a, b| {
        let score_a = evaluations[&a.sequence_hash].end_score;
        let score_b = evaluations[&b.sequence_hash].end_score;
        score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    let top_n: Vec<&ActionSequence> = feasible_ranked.into_iter().take(config.max_sequence_attempts).collect();

    let (winner_steps, end_state_score, used_fallback): (Vec<ActionCandidate>, f64, bool) = if let Some(&winner) = top_n.first() {
        (winner.steps.clone(), evaluations[&winner.sequence_hash].end_score, false)
    } else {
        // No evaluated sequence was feasible: fall back to the
        // highest-priority-sum sequence and mark the plan infeasible below.
        let fallback = sequences
            .iter()
            .max_by(|a, b| {
                let sum_a: f64 = a.steps.iter().map(|s| s.priority).sum();
                let sum_b: f64 = b.steps.iter().map(|s| s.priority).sum();
                sum_a.partial_cmp(&sum_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("sequences is non-empty");
        (fallback.steps.clone(), current_score, true)
    };

    let (validated_steps, enforcer_filtered) = enforcer::enforce(&winner_steps, ctx, config);

    let mut plan = HolisticPlan::from_sequence(&validated_steps, current_score, end_state_score);
    if used_fallback || !enforcer_filtered.is_empty() {
        plan.feasible = false;
    }

    let winner_hash = top_n.first().map(|s| s.sequence_hash.clone());

    let mut rejected_opportunities =
        build_rejected_opportunities(&calc_result.candidates, &validated_steps, &sequences, &top_n, winner_hash.as_deref());
    rejected_opportunities.extend(enforcer_filtered.into_iter().map(|filtered| RejectedOpportunity {
        candidate: filtered.action,
        reason: format!("enforcer: {}", filtered.reason),
    }));

    let rejected_sequences = sequences
        .iter()
        .filter(|s| winner_hash.as_deref() != Some(s.sequence_hash.as_str()))
        .map(|s| {
            let eval = evaluations.get(&s.sequence_hash);
            let (score, reason) = match eval {
                Some(e) if e.feasible && top_n.iter().any(|t| t.sequence_hash == s.sequence_hash) => {
                    (e.end_score, "lower end_score than chosen sequence".to_string())
                }
                Some(e) if e.feasible => (e.end_score, "not among top max_sequence_attempts by score".to_string()),
                _ => (0.0, "infeasible during evaluation".to_string()),
            };
            RejectedSequence {
                sequence_hash: s.sequence_hash.clone(),
                end_score: score,
                reason,
            }
        })
        .collect();

    finalize(
        plan,
        portfolio_hash,
        rejected_opportunities,
        pre_filtered_securities,
        rejected_sequences,
        used_fallback,
    )
}

fn build_rejected_opportunities(
    all_candidates: &[ActionCandidate],
    winner_steps: &[ActionCandidate],
    all_sequences: &[ActionSequence],
    top_n: &[&ActionSequence],
    winner_hash: Option<&str>,
) -> Vec<RejectedOpportunity> {
    let mut rejected = Vec::new();
    for candidate in all_candidates {
        let in_winner = winner_steps
            .iter()
            .any(|s| s.isin == candidate.isin && s.side == candidate.side && s.calculator == candidate.calculator);
        if in_winner {
            continue;
        }

        let in_top_n_other_than_winner = top_n.iter().any(|seq| {
            Some(seq.sequence_hash.as_str()) != winner_hash
                && sequence_contains(seq, &candidate.isin, candidate.side, candidate.calculator)
        });
        let in_any_sequence = all_sequences
            .iter()
            .any(|seq| sequence_contains(seq, &candidate.isin, candidate.side, candidate.calculator));

        let reason = if in_top_n_other_than_winner {
            "in alternative sequence (a different sequence had higher score)".to_string()
        } else if in_any_sequence {
            "sequence not in top candidates (lower combined priority)".to_string()
        } else {
            "not selected by sequence generator".to_string()
        };

        rejected.push(RejectedOpportunity {
            candidate: candidate.clone(),
            reason,
        });
    }

    rejected.sort_by(|a, b| (&a.candidate.symbol, a.candidate.side).cmp(&(&b.candidate.symbol, b.candidate.side)));
    rejected.dedup_by(|a, b| a.candidate.isin == b.candidate.isin && a.candidate.side == b.candidate.side);
    rejected
}

fn finalize(
    plan: HolisticPlan,
    portfolio_hash: PortfolioHash,
    rejected_opportunities: Vec<RejectedOpportunity>,
    pre_filtered_securities: Vec<PreFilteredSecurity>,
    rejected_sequences: Vec<RejectedSequence>,
    used_fallback_sequence: bool,
) -> PlanResult {
    PlanResult {
        plan,
        portfolio_hash,
        rejected_opportunities,
        pre_filtered_securities,
        rejected_sequences,
        used_fallback_sequence,
    }
}
