//! Classification tags attached to action candidates.
//!
//! Closed enum rather than a free-form string set: calculators and the
//! evaluator match on tags exhaustively, and a `BTreeSet<Tag>` gives
//! `ActionCandidate` a deterministic iteration/serialization order.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    Windfall,
    AveragingDown,
    QualityValue,
    ValueTrap,
    Overweight,
    NeedsRebalance,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::Windfall => "windfall",
            Tag::AveragingDown => "averaging_down",
            Tag::QualityValue => "quality_value",
            Tag::ValueTrap => "value_trap",
            Tag::Overweight => "overweight",
            Tag::NeedsRebalance => "needs_rebalance",
        };
        write!(f, "{s}")
    }
}

/// Tags that boost a SELL candidate's priority in profit-taking, rebalance-
/// sells and weight-based calculators. Windfall carries the highest boost
/// (it is the strongest sell signal: a position has outgrown its target by
/// far more than a routine rebalance would); the rest share a lower tier.
pub const SELL_PRIORITY_BOOST_TAGS: &[Tag] = &[Tag::Windfall, Tag::Overweight, Tag::NeedsRebalance];
