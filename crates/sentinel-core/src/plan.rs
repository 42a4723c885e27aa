//! The final, serialized output of a planning run.

use crate::candidate::{ActionCandidate, Side};
use crate::isin::Isin;
use crate::money::EurCents;
use crate::tag::Tag;

/// One step of a `HolisticPlan`, ready for display or broker submission.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HolisticStep {
    pub step_number: usize,
    pub side: Side,
    pub isin: Isin,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub estimated_price: EurCents,
    pub estimated_value: EurCents,
    pub currency: String,
    pub reason: String,
    pub narrative: String,
    pub is_windfall: bool,
    pub is_averaging_down: bool,
}

impl HolisticStep {
    pub fn from_candidate(step_number: usize, candidate: &ActionCandidate) -> Self {
        let narrative = format!(
            "{} {} {} shares of {} at {} — {}",
            step_number, candidate.side, candidate.quantity, candidate.symbol, candidate.price, candidate.reason
        );
        Self {
            step_number,
            side: candidate.side,
            isin: candidate.isin.clone(),
            symbol: candidate.symbol.clone(),
            name: candidate.name.clone(),
            quantity: candidate.quantity,
            estimated_price: candidate.price,
            estimated_value: candidate.value_eur,
            currency: candidate.currency.clone(),
            reason: candidate.reason.clone(),
            narrative,
            is_windfall: candidate.tags.contains(&Tag::Windfall),
            is_averaging_down: candidate.tags.contains(&Tag::AveragingDown),
        }
    }
}

/// The final plan handed to the caller.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HolisticPlan {
    pub steps: Vec<HolisticStep>,
    pub current_score: f64,
    pub end_state_score: f64,
    pub improvement: f64,
    pub narrative_summary: String,
    pub cash_required: EurCents,
    pub cash_generated: EurCents,
    pub feasible: bool,
}

impl HolisticPlan {
    pub fn empty(current_score: f64) -> Self {
        Self {
            steps: Vec::new(),
            current_score,
            end_state_score: current_score,
            improvement: 0.0,
            narrative_summary: "no actionable opportunities found".into(),
            cash_required: EurCents::ZERO,
            cash_generated: EurCents::ZERO,
            feasible: true,
        }
    }

    pub fn from_sequence(
        steps: &[ActionCandidate],
        current_score: f64,
        end_state_score: f64,
    ) -> Self {
        let mut cash_required = EurCents::ZERO;
        let mut cash_generated = EurCents::ZERO;
        let holistic_steps: Vec<HolisticStep> = steps
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                match candidate.side {
                    Side::Buy => cash_required += candidate.value_eur,
                    Side::Sell => cash_generated += candidate.value_eur,
                }
                HolisticStep::from_candidate(i + 1, candidate)
            })
            .collect();

        let narrative_summary = if holistic_steps.is_empty() {
            "no actionable opportunities found".to_string()
        } else {
            format!(
                "{} step plan improving end-state score from {:.3} to {:.3}",
                holistic_steps.len(),
                current_score,
                end_state_score
            )
        };

        Self {
            steps: holistic_steps,
            current_score,
            end_state_score,
            improvement: end_state_score - current_score,
            narrative_summary,
            cash_required,
            cash_generated,
            feasible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CalculatorKind, Side};
    use std::collections::BTreeSet;

    #[test]
    fn empty_plan_has_zero_improvement() {
        let plan = HolisticPlan::empty(0.5);
        assert_eq!(plan.improvement, 0.0);
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn from_sequence_sums_cash_by_side() {
        let candidates = vec![
            ActionCandidate::new(
                Isin::new("US0378331005").unwrap(),
                "AAPL",
                "Apple",
                Side::Sell,
                10,
                EurCents::from_eur(150.0),
                "EUR",
                "r",
                1.0,
                BTreeSet::new(),
                CalculatorKind::ProfitTaking,
            ),
            ActionCandidate::new(
                Isin::new("US5949181045").unwrap(),
                "MSFT",
                "Microsoft",
                Side::Buy,
                5,
                EurCents::from_eur(240.0),
                "EUR",
                "r",
                1.0,
                BTreeSet::new(),
                CalculatorKind::AveragingDown,
            ),
        ];
        let plan = HolisticPlan::from_sequence(&candidates, 0.5, 0.6);
        assert_eq!(plan.cash_generated, EurCents::from_eur(1500.0));
        assert_eq!(plan.cash_required, EurCents::from_eur(1200.0));
        assert!((plan.improvement - 0.1).abs() < 1e-9);
    }
}
