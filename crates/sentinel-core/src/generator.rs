//! Sequence generator: bounded combinatorial construction
//! of multi-step `ActionSequence`s via priority-ordered beam search.
//!
//! Full enumeration of subsets of the candidate pool is exponential in
//! `max_depth`; a beam search — keep only the best `beam_width` partial
//! sequences at each depth before extending further — gives the same
//! "explore ordered by priority, cut off by a bound" character without
//! the blowup.

use std::collections::{BTreeSet, HashSet};

use rustc_hash::FxHashMap;

use crate::candidate::{ActionCandidate, CalculatorKind, Side};
use crate::config::PlannerConfiguration;
use crate::context::OpportunityContext;
use crate::isin::Isin;
use crate::money::EurCents;
use crate::sequence::{sequence_order_key, ActionSequence};

/// The running simulated state a partial sequence carries forward.
#[derive(Clone, Debug)]
struct SimState {
    cash: EurCents,
    quantities: FxHashMap<Isin, i64>,
    used: BTreeSet<(Isin, Side)>,
}

impl SimState {
    fn initial(ctx: &OpportunityContext) -> Self {
        let mut quantities = FxHashMap::default();
        for position in &ctx.enriched_positions {
            quantities.insert(position.isin.clone(), position.quantity);
        }
        Self {
            cash: ctx.available_cash_eur,
            quantities,
            used: BTreeSet::new(),
        }
    }

    /// Attempt to append `candidate`; returns `None` if infeasible or if
    /// the (isin, side) pair is already present.
    fn try_append(&self, candidate: &ActionCandidate, config: &PlannerConfiguration) -> Option<Self> {
        let key = (candidate.isin.clone(), candidate.side);
        if self.used.contains(&key) {
            return None;
        }

        let cost = crate::cost_model::transaction_cost(
            candidate.value_eur,
            EurCents::from_eur(config.transaction_cost_fixed),
            config.transaction_cost_percent,
        );

        let mut next = self.clone();
        match candidate.side {
            Side::Buy => {
                let new_cash = self.cash - candidate.value_eur - cost;
                if new_cash.as_eur() < config.min_cash_reserve {
                    return None;
                }
                next.cash = new_cash;
                *next.quantities.entry(candidate.isin.clone()).or_insert(0) += candidate.quantity;
            }
            Side::Sell => {
                let held = self.quantities.get(&candidate.isin).copied().unwrap_or(0);
                if candidate.quantity > held {
                    return None;
                }
                next.cash = self.cash + candidate.value_eur - cost;
                *next.quantities.entry(candidate.isin.clone()).or_insert(0) -= candidate.quantity;
            }
        }
        next.used.insert(key);
        Some(next)
    }
}

struct Partial {
    steps: Vec<ActionCandidate>,
    state: SimState,
    priority_sum: f64,
}

/// Post-generation diversity filters: `enable_correlation_aware_filter`
/// rejects a sequence that BUYs into the same industry twice;
/// `enable_diversity_filter` rejects one whose post-trade geography
/// concentration (Herfindahl index) leaves less than `diversity_weight`
/// of diversification headroom.
fn passes_diversity_filters(
    steps: &[ActionCandidate],
    state: &SimState,
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
) -> bool {
    if config.enable_correlation_aware_filter {
        let mut bought_industries = HashSet::new();
        for step in steps {
            if step.side != Side::Buy {
                continue;
            }
            let Some(industry) = ctx.security(&step.isin).map(|s| s.industry.clone()) else {
                continue;
            };
            if !bought_industries.insert(industry) {
                return false;
            }
        }
    }

    if config.enable_diversity_filter {
        let mut value_by_geography: FxHashMap<String, f64> = FxHashMap::default();
        let mut total_value = state.cash.as_eur();
        for (isin, &quantity) in &state.quantities {
            if quantity <= 0 {
                continue;
            }
            let (Some(price), Some(security)) = (ctx.price(isin), ctx.security(isin)) else {
                continue;
            };
            let value = price.as_eur() * quantity as f64;
            total_value += value;
            *value_by_geography.entry(security.geography.clone()).or_insert(0.0) += value;
        }
        if total_value > 0.0 {
            let herfindahl: f64 = value_by_geography
                .values()
                .map(|v| {
                    let weight = v / total_value;
                    weight * weight
                })
                .sum();
            let diversification = 1.0 - herfindahl;
            if diversification < config.diversity_weight {
                return false;
            }
        }
    }

    true
}

/// Beam width: how many partial sequences survive to the next depth.
/// `max_opportunities_per_category` bounds candidates *per category*
/// (applied at the pool-building truncation above); the merged frontier
/// across all categories instead gets `category_count` times that budget,
/// so filling the beam with one category's candidates can never crowd out
/// another category's sequences entirely.
fn beam_width(config: &PlannerConfiguration, category_count: usize) -> usize {
    (config.max_opportunities_per_category * category_count.max(1)).max(1)
}

/// Hard ceiling on total sequences returned, independent of beam width,
/// so a pathologically large pool never produces an unbounded result set.
const MAX_SEQUENCES: usize = 500;

pub fn generate_sequences(
    candidates_by_category: &FxHashMap<CalculatorKind, Vec<ActionCandidate>>,
    ctx: &OpportunityContext,
    config: &PlannerConfiguration,
) -> Vec<ActionSequence> {
    let mut pool: Vec<ActionCandidate> = Vec::new();
    for candidates in candidates_by_category.values() {
        let mut sorted = candidates.clone();
        sorted.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.isin.cmp(&b.isin))
        });
        sorted.truncate(config.max_opportunities_per_category);
        pool.extend(sorted);
    }
    pool.sort_by(|a, b| {
        b.priority
            .partial_cmp(&a.priority)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.isin.cmp(&b.isin))
    });

    if pool.is_empty() {
        return Vec::new();
    }

    let initial_state = SimState::initial(ctx);
    let mut all_sequences: Vec<ActionSequence> = Vec::new();
    let mut seen_hashes = HashSet::new();

    let mut frontier: Vec<Partial> = Vec::new();
    for candidate in &pool {
        if let Some(state) = initial_state.try_append(candidate, config) {
            frontier.push(Partial {
                steps: vec![candidate.clone()],
                state,
                priority_sum: candidate.priority,
            });
        }
    }

    let width = beam_width(config, candidates_by_category.len());
    frontier.sort_by(|a, b| b.priority_sum.partial_cmp(&a.priority_sum).unwrap_or(std::cmp::Ordering::Equal));
    frontier.truncate(width);

    for partial in &frontier {
        if !passes_diversity_filters(&partial.steps, &partial.state, ctx, config) {
            continue;
        }
        record(&mut all_sequences, &mut seen_hashes, partial.steps.clone());
        if all_sequences.len() >= MAX_SEQUENCES {
            return finalize(all_sequences);
        }
    }

    for _depth in 2..=config.max_depth {
        let mut next_frontier: Vec<Partial> = Vec::new();
        for partial in &frontier {
            for candidate in &pool {
                if let Some(state) = partial.state.try_append(candidate, config) {
                    let mut steps = partial.steps.clone();
                    steps.push(candidate.clone());
                    next_frontier.push(Partial {
                        priority_sum: partial.priority_sum + candidate.priority,
                        steps,
                        state,
                    });
                }
            }
        }

        if next_frontier.is_empty() {
            break;
        }

        next_frontier.sort_by(|a, b| b.priority_sum.partial_cmp(&a.priority_sum).unwrap_or(std::cmp::Ordering::Equal));
        next_frontier.truncate(width);

        for partial in &next_frontier {
            if !passes_diversity_filters(&partial.steps, &partial.state, ctx, config) {
                continue;
            }
            record(&mut all_sequences, &mut seen_hashes, partial.steps.clone());
            if all_sequences.len() >= MAX_SEQUENCES {
                return finalize(all_sequences);
            }
        }

        frontier = next_frontier;
    }

    finalize(all_sequences)
}

fn record(sequences: &mut Vec<ActionSequence>, seen: &mut HashSet<String>, steps: Vec<ActionCandidate>) {
    let sequence = ActionSequence::new(steps, None);
    if seen.insert(sequence.sequence_hash.clone()) {
        sequences.push(sequence);
    }
}

fn finalize(mut sequences: Vec<ActionSequence>) -> Vec<ActionSequence> {
    sequences.sort_by(|a, b| sequence_order_key(a).cmp(&sequence_order_key(b)));
    sequences
}
