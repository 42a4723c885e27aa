//! ActionSequence: an ordered, bounded set of steps considered together
//! by the evaluator.

use md5::{Digest, Md5};

use crate::candidate::ActionCandidate;

/// A content-addressed, ordered sequence of candidate steps.
#[derive(Clone, Debug)]
pub struct ActionSequence {
    pub steps: Vec<ActionCandidate>,
    pub sequence_hash: String,
    pub priority: f64,
    pub pattern_type: Option<String>,
}

impl ActionSequence {
    pub fn new(steps: Vec<ActionCandidate>, pattern_type: Option<String>) -> Self {
        let sequence_hash = hash_steps(&steps);
        let priority = steps.iter().map(|s| s.priority).sum();
        Self {
            steps,
            sequence_hash,
            priority,
            pattern_type,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// `MD5("isin:side:qty:price" joined by ";")`.
fn hash_steps(steps: &[ActionCandidate]) -> String {
    let joined = steps
        .iter()
        .map(|s| format!("{}:{}:{}:{}", s.isin, s.side, s.quantity, s.price.0))
        .collect::<Vec<_>>()
        .join(";");
    let digest = Md5::digest(joined.as_bytes());
    format!("{digest:x}")
}

/// Orders sequences for deterministic tie-break: higher priority first,
/// then lexicographically by `sequence_hash`.
pub fn sequence_order_key(sequence: &ActionSequence) -> (std::cmp::Reverse<i64>, String) {
    // priority is compared at 6 decimal-digit precision to keep the
    // ordering key `Ord` without pulling in a float total-order wrapper.
    let scaled = (sequence.priority * 1_000_000.0).round() as i64;
    (std::cmp::Reverse(scaled), sequence.sequence_hash.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CalculatorKind, Side};
    use crate::isin::Isin;
    use crate::money::EurCents;
    use std::collections::BTreeSet;

    fn candidate(isin: &str, priority: f64) -> ActionCandidate {
        ActionCandidate::new(
            Isin::new(isin).unwrap(),
            "SYM",
            "Name",
            Side::Buy,
            1,
            EurCents::from_eur(10.0),
            "EUR",
            "r",
            priority,
            BTreeSet::new(),
            CalculatorKind::OpportunityBuys,
        )
    }

    #[test]
    fn hash_is_deterministic_and_order_sensitive() {
        let a = ActionSequence::new(
            vec![candidate("US0378331005", 1.0), candidate("US5949181045", 1.0)],
            None,
        );
        let b = ActionSequence::new(
            vec![candidate("US5949181045", 1.0), candidate("US0378331005", 1.0)],
            None,
        );
        assert_ne!(a.sequence_hash, b.sequence_hash);

        let a2 = ActionSequence::new(
            vec![candidate("US0378331005", 1.0), candidate("US5949181045", 1.0)],
            None,
        );
        assert_eq!(a.sequence_hash, a2.sequence_hash);
    }

    #[test]
    fn priority_is_sum_of_steps() {
        let seq = ActionSequence::new(vec![candidate("US0378331005", 1.0), candidate("US5949181045", 3.0)], None);
        assert!((seq.priority - 4.0).abs() < 1e-9);
    }

    #[test]
    fn order_key_sorts_higher_priority_first() {
        let high = ActionSequence::new(vec![candidate("US0378331005", 5.0)], None);
        let low = ActionSequence::new(vec![candidate("US0378331005", 1.0)], None);
        let mut seqs = vec![low.clone(), high.clone()];
        seqs.sort_by_key(sequence_order_key);
        assert_eq!(seqs[0].sequence_hash, high.sequence_hash);
    }
}
