//! Transaction cost model.

use crate::money::EurCents;

/// `cost = fixed + value * percent`.
pub fn transaction_cost(value_eur: EurCents, fixed: EurCents, percent: f64) -> EurCents {
    fixed + EurCents::from_eur(value_eur.as_eur() * percent)
}

/// The smallest trade value for which `transaction_cost(value) / value`
/// does not exceed `max_cost_ratio`, i.e. the solution of
/// `fixed + value*percent = value*max_cost_ratio` for `value`.
///
/// Returns `None` when `max_cost_ratio <= percent` (no finite value drives
/// the ratio that low).
pub fn min_trade_value_for_cost_ratio(
    fixed: EurCents,
    percent: f64,
    max_cost_ratio: f64,
) -> Option<EurCents> {
    let denom = max_cost_ratio - percent;
    if denom <= 0.0 {
        return None;
    }
    Some(EurCents::from_eur(fixed.as_eur() / denom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_fixed_plus_percent_of_value() {
        let cost = transaction_cost(EurCents::from_eur(1000.0), EurCents::from_eur(2.0), 0.002);
        assert_eq!(cost, EurCents::from_eur(4.0));
    }

    #[test]
    fn min_trade_value_solves_ratio_equation() {
        let min_value =
            min_trade_value_for_cost_ratio(EurCents::from_eur(2.0), 0.002, 0.01).unwrap();
        let cost = transaction_cost(min_value, EurCents::from_eur(2.0), 0.002);
        let ratio = cost.as_eur() / min_value.as_eur();
        assert!((ratio - 0.01).abs() < 1e-6);
    }

    #[test]
    fn min_trade_value_is_none_when_ratio_unreachable() {
        assert!(min_trade_value_for_cost_ratio(EurCents::from_eur(2.0), 0.05, 0.01).is_none());
    }
}
