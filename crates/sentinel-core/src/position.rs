//! EnrichedPosition: a position joined with its security and current price.
//!
//! Carrying everything a calculator needs in one struct avoids the
//! repeated `stocks_by_isin`/`current_prices`/`scores` lookups that would
//! otherwise dominate the cost of a naive per-calculator scan.

use crate::isin::Isin;
use crate::money::EurCents;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnrichedPosition {
    pub isin: Isin,
    pub symbol: String,
    pub quantity: i64,
    pub average_cost: EurCents,
    pub currency_rate: f64,
    pub market_value_eur: EurCents,
    pub cost_basis_eur: EurCents,
    pub unrealized_pnl: EurCents,
    pub unrealized_pnl_pct: f64,
    pub first_bought_at: chrono::DateTime<chrono::Utc>,
    pub last_sold_at: Option<chrono::DateTime<chrono::Utc>>,
    pub days_held: i64,
    pub weight_in_portfolio: f64,

    // Copies of the relevant Security fields, so calculators never need
    // to re-join against `stocks_by_isin` for these.
    pub name: String,
    pub geography: String,
    pub allow_buy: bool,
    pub allow_sell: bool,
    pub min_lot: u32,
}

impl EnrichedPosition {
    /// Build an enriched position from a raw (isin, quantity, average_cost)
    /// tuple plus the current price and the security record, computing all
    /// derived fields.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        isin: Isin,
        symbol: String,
        quantity: i64,
        average_cost: EurCents,
        current_price: EurCents,
        currency_rate: f64,
        first_bought_at: chrono::DateTime<chrono::Utc>,
        last_sold_at: Option<chrono::DateTime<chrono::Utc>>,
        now: chrono::DateTime<chrono::Utc>,
        total_portfolio_value_eur: EurCents,
        security: &crate::security::Security,
    ) -> Self {
        let market_value_eur = current_price * quantity;
        let cost_basis_eur = average_cost * quantity;
        let unrealized_pnl = market_value_eur - cost_basis_eur;
        let unrealized_pnl_pct = if cost_basis_eur.0 != 0 {
            unrealized_pnl.0 as f64 / cost_basis_eur.0 as f64
        } else {
            0.0
        };
        let days_held = (now - first_bought_at).num_days();
        let weight_in_portfolio = if total_portfolio_value_eur.0 > 0 {
            market_value_eur.0 as f64 / total_portfolio_value_eur.0 as f64
        } else {
            0.0
        };

        Self {
            isin,
            symbol,
            quantity,
            average_cost,
            currency_rate,
            market_value_eur,
            cost_basis_eur,
            unrealized_pnl,
            unrealized_pnl_pct,
            first_bought_at,
            last_sold_at,
            days_held,
            weight_in_portfolio,
            name: security.name.clone(),
            geography: security.geography.clone(),
            allow_buy: security.allow_buy,
            allow_sell: security.allow_sell,
            min_lot: security.min_lot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Security;
    use chrono::{Duration, TimeZone, Utc};

    fn security() -> Security {
        Security {
            isin: crate::isin::Isin::new("US0378331005").unwrap(),
            symbol: "AAPL".into(),
            name: "Apple".into(),
            currency: "USD".into(),
            geography: "US".into(),
            industry: "Tech".into(),
            exchange: "NASDAQ".into(),
            min_lot: 1,
            allow_buy: true,
            allow_sell: true,
            active: true,
            priority_multiplier: 1.0,
            min_portfolio_target: 0.0,
            max_portfolio_target: 1.0,
        }
    }

    #[test]
    fn derives_gain_and_weight() {
        let first_bought = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let now = first_bought + Duration::days(200);
        let pos = EnrichedPosition::build(
            crate::isin::Isin::new("US0378331005").unwrap(),
            "AAPL".into(),
            100,
            EurCents::from_eur(100.0),
            EurCents::from_eur(150.0),
            1.0,
            first_bought,
            None,
            now,
            EurCents::from_eur(16000.0),
            &security(),
        );
        assert_eq!(pos.days_held, 200);
        assert!((pos.unrealized_pnl_pct - 0.5).abs() < 1e-9);
        assert!((pos.weight_in_portfolio - 0.9375).abs() < 1e-9);
        assert_eq!(pos.market_value_eur, EurCents::from_eur(15000.0));
    }

    #[test]
    fn zero_cost_basis_does_not_divide_by_zero() {
        let first_bought = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let pos = EnrichedPosition::build(
            crate::isin::Isin::new("US0378331005").unwrap(),
            "AAPL".into(),
            0,
            EurCents::ZERO,
            EurCents::from_eur(150.0),
            1.0,
            first_bought,
            None,
            first_bought,
            EurCents::from_eur(1000.0),
            &security(),
        );
        assert_eq!(pos.unrealized_pnl_pct, 0.0);
    }
}
