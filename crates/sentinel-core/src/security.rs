//! Security: immutable per-run metadata about a tradable instrument.

use crate::isin::Isin;

/// A tradable security, frozen for the duration of one planning run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Security {
    pub isin: Isin,
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub geography: String,
    pub industry: String,
    pub exchange: String,
    /// Minimum tradable lot size, in whole shares.
    pub min_lot: u32,
    pub allow_buy: bool,
    pub allow_sell: bool,
    pub active: bool,
    /// Multiplicative adjustment applied to calculator-assigned priority.
    pub priority_multiplier: f64,
    pub min_portfolio_target: f64,
    pub max_portfolio_target: f64,
}

impl Security {
    /// A synthetic security record for a cash balance, used only so that
    /// cash positions can flow through the same `stocks_by_isin` index as
    /// everything else.
    pub fn cash(currency: &str) -> Self {
        Self {
            isin: Isin::cash(currency),
            symbol: format!("CASH:{currency}"),
            name: format!("{currency} cash"),
            currency: currency.to_string(),
            geography: "Cash".into(),
            industry: "Cash".into(),
            exchange: "".into(),
            min_lot: 1,
            allow_buy: false,
            allow_sell: false,
            active: true,
            priority_multiplier: 1.0,
            min_portfolio_target: 0.0,
            max_portfolio_target: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_security_is_not_tradable() {
        let cash = Security::cash("EUR");
        assert!(!cash.allow_buy);
        assert!(!cash.allow_sell);
        assert!(cash.isin.is_cash());
    }
}
