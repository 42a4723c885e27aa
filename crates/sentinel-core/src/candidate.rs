//! ActionCandidate: a single proposed BUY/SELL, and the record of
//! securities a calculator looked at but dismissed.

use std::collections::BTreeSet;
use std::fmt;

use crate::isin::Isin;
use crate::money::EurCents;
use crate::tag::Tag;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Identifies which calculator produced a candidate or pre-filtered entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalculatorKind {
    ProfitTaking,
    AveragingDown,
    OpportunityBuys,
    RebalanceSells,
    RebalanceBuys,
    WeightBased,
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalculatorKind::ProfitTaking => "profit_taking",
            CalculatorKind::AveragingDown => "averaging_down",
            CalculatorKind::OpportunityBuys => "opportunity_buys",
            CalculatorKind::RebalanceSells => "rebalance_sells",
            CalculatorKind::RebalanceBuys => "rebalance_buys",
            CalculatorKind::WeightBased => "weight_based",
        };
        write!(f, "{s}")
    }
}

/// A single proposed action.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionCandidate {
    pub isin: Isin,
    pub symbol: String,
    pub name: String,
    pub side: Side,
    pub quantity: i64,
    pub price: EurCents,
    pub value_eur: EurCents,
    pub currency: String,
    pub reason: String,
    pub priority: f64,
    pub tags: BTreeSet<Tag>,
    pub calculator: CalculatorKind,
}

impl ActionCandidate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        isin: Isin,
        symbol: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: i64,
        price: EurCents,
        currency: impl Into<String>,
        reason: impl Into<String>,
        priority: f64,
        tags: BTreeSet<Tag>,
        calculator: CalculatorKind,
    ) -> Self {
        let value_eur = price * quantity;
        Self {
            isin,
            symbol: symbol.into(),
            name: name.into(),
            side,
            quantity,
            price,
            value_eur,
            currency: currency.into(),
            reason: reason.into(),
            priority,
            tags,
            calculator,
        }
    }

    pub fn has_boosted_priority(&self) -> bool {
        self.tags
            .iter()
            .any(|t| crate::tag::SELL_PRIORITY_BOOST_TAGS.contains(t))
    }
}

/// A single dismissal reason recorded against a security a calculator
/// examined but chose not to act on.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DismissalReason {
    pub reason: String,
    /// `true` for a hard pre-filter (e.g. `allow_buy == false`); `false`
    /// for a soft miss (e.g. threshold not met this run).
    pub dismissed: bool,
}

/// A security a calculator looked at but produced no candidate for —
/// the pre-filter reporting stream.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreFilteredSecurity {
    pub isin: Isin,
    pub symbol: String,
    pub name: String,
    pub calculator: CalculatorKind,
    pub reasons: Vec<DismissalReason>,
}

/// The output of a single calculator invocation.
#[derive(Clone, Debug, Default)]
pub struct CalculatorResult {
    pub candidates: Vec<ActionCandidate>,
    pub pre_filtered: Vec<PreFilteredSecurity>,
}

impl CalculatorResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: CalculatorResult) {
        self.candidates.extend(other.candidates);
        self.pre_filtered.extend(other.pre_filtered);
    }
}
