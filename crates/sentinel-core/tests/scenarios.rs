//! End-to-end planning scenarios run through the full `select_plan`
//! pipeline (calculators → generator → evaluator → enforcer), as opposed
//! to the single-calculator unit tests living next to each calculator.

use chrono::{Duration, Utc};
use sentinel_core::candidate::{CalculatorKind, Side};
use sentinel_core::config::PlannerConfiguration;
use sentinel_core::context::{OpportunityContextBuilder, RawPosition};
use sentinel_core::isin::Isin;
use sentinel_core::money::EurCents;
use sentinel_core::security::Security;
use sentinel_core::selector::select_plan;

fn security(isin: &str, symbol: &str) -> Security {
    Security {
        isin: Isin::new(isin).unwrap(),
        symbol: symbol.into(),
        name: symbol.into(),
        currency: "EUR".into(),
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

fn position(isin: Isin, quantity: i64, average_cost: f64, days_held: i64, now: chrono::DateTime<chrono::Utc>) -> RawPosition {
    RawPosition {
        isin,
        quantity,
        average_cost: EurCents::from_eur(average_cost),
        currency_rate: 1.0,
        first_bought_at: now - Duration::days(days_held),
        last_sold_at: None,
    }
}

/// Isolates a single calculator so a scenario's expected output can't be
/// disturbed by an unrelated calculator also firing (e.g. rebalance-sells
/// treats any security with no explicit geography target as arbitrarily
/// overweight, which would otherwise shadow every sell scenario below).
fn only(calculator: CalculatorKind) -> PlannerConfiguration {
    let mut config = PlannerConfiguration::default();
    config.enable_profit_taking_calc = calculator == CalculatorKind::ProfitTaking;
    config.enable_averaging_down_calc = calculator == CalculatorKind::AveragingDown;
    config.enable_opportunity_buys_calc = calculator == CalculatorKind::OpportunityBuys;
    config.enable_rebalance_sells_calc = calculator == CalculatorKind::RebalanceSells;
    config.enable_rebalance_buys_calc = calculator == CalculatorKind::RebalanceBuys;
    config.enable_weight_based_calc = calculator == CalculatorKind::WeightBased;
    config
}

/// A single overweight position with a windfall gain and ample cash
/// produces a one-step profit-taking SELL.
#[test]
fn single_overweight_windfall_with_ample_cash_sells() {
    let now = Utc::now();
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(1000.0))
        .target_weight(isin.clone(), 0.10)
        .position(position(isin, 100, 100.0, 200, now))
        .now(now)
        .build()
        .unwrap();

    let config = only(CalculatorKind::ProfitTaking);
    let result = select_plan(&ctx, &config);

    assert_eq!(result.plan.steps.len(), 1);
    let step = &result.plan.steps[0];
    assert_eq!(step.side, Side::Sell);
    assert_eq!(step.quantity, 20);
    assert!(step.is_windfall);
    assert!(result.plan.feasible);
}

/// The same position held for only 30 days is blocked by the min-hold
/// gate, leaving the plan empty and the security pre-filtered.
#[test]
fn min_hold_period_blocks_sell() {
    let now = Utc::now();
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(1000.0))
        .position(position(isin, 100, 100.0, 30, now))
        .now(now)
        .build()
        .unwrap();

    let config = PlannerConfiguration::default();
    let result = select_plan(&ctx, &config);

    assert!(result.plan.steps.is_empty());
    assert!(result
        .pre_filtered_securities
        .iter()
        .any(|p| p.symbol == "AAPL" && p.reasons.iter().any(|r| r.reason == "min hold period")));
}

/// A position sitting exactly at a -20% loss, within the
/// averaging-down band and clearing the quality gate, produces a BUY.
#[test]
fn loss_within_averaging_down_band_buys() {
    let isin = Isin::new("US5949181045").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US5949181045", "MSFT"))
        .price(isin.clone(), EurCents::from_eur(240.0))
        .cash(EurCents::from_eur(500.0))
        .long_term_score(isin.clone(), 0.9)
        .position(RawPosition {
            isin,
            quantity: 10,
            average_cost: EurCents::from_eur(300.0),
            currency_rate: 1.0,
            first_bought_at: Utc::now() - Duration::days(200),
            last_sold_at: None,
        })
        .build()
        .unwrap();

    let config = only(CalculatorKind::AveragingDown);
    let result = select_plan(&ctx, &config);

    assert_eq!(result.plan.steps.len(), 1);
    let step = &result.plan.steps[0];
    assert_eq!(step.side, Side::Buy);
    assert_eq!(step.quantity, 1);
    assert!(step.is_averaging_down);
}

/// An opportunity buy sized above available cash is dismissed, and
/// the plan has no steps at all.
#[test]
fn cash_constrained_opportunity_buy_is_dismissed() {
    let isin = Isin::new("US67066G1040").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US67066G1040", "NVDA"))
        .price(isin.clone(), EurCents::from_eur(60.0))
        .cash(EurCents::from_eur(300.0))
        .security_score(isin.clone(), 0.9)
        .long_term_score(isin.clone(), 0.9)
        .opportunity_score(isin.clone(), 0.9)
        .cagr(isin.clone(), 0.20)
        .kelly_size(isin, 10.0)
        .build()
        .unwrap();

    let config = PlannerConfiguration::default();
    let result = select_plan(&ctx, &config);

    assert!(result.plan.steps.is_empty());
    assert!(result
        .pre_filtered_securities
        .iter()
        .any(|p| p.symbol == "NVDA" && p.reasons.iter().any(|r| r.reason == "insufficient cash")));
}

/// Two equally-eligible SELL candidates compete; the one that leaves
/// the better-quality end state wins, and the other is rejected with the
/// "alternative sequence" reason rather than being silently dropped.
#[test]
fn two_competing_sells_the_better_end_state_wins() {
    let now = Utc::now();
    let aapl = Isin::new("US0378331005").unwrap();
    let goog = Isin::new("US02079K3059").unwrap();

    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .security(security("US02079K3059", "GOOG"))
        .price(aapl.clone(), EurCents::from_eur(150.0))
        .price(goog.clone(), EurCents::from_eur(232.0))
        .cash(EurCents::from_eur(2000.0))
        // AAPL: windfall gain, but poor remaining-portfolio quality —
        // selling it off lifts the average quality of what's left.
        .long_term_score(aapl.clone(), 0.2)
        .stability_score(aapl.clone(), 0.2)
        .opportunity_score(aapl.clone(), 0.2)
        // GOOG: modest gain, strong quality — selling it would drag the
        // remaining portfolio's average quality down instead.
        .long_term_score(goog.clone(), 0.9)
        .stability_score(goog.clone(), 0.9)
        .opportunity_score(goog.clone(), 0.9)
        .position(position(aapl.clone(), 100, 100.0, 200, now))
        .position(position(goog.clone(), 100, 200.0, 200, now))
        .now(now)
        .build()
        .unwrap();

    let mut config = only(CalculatorKind::ProfitTaking);
    // Each SELL stands as its own opportunity here; keep the generator
    // from also considering the sequence that sells both at once.
    config.max_depth = 1;
    let result = select_plan(&ctx, &config);

    assert_eq!(result.plan.steps.len(), 1);
    let winner = &result.plan.steps[0];
    assert_eq!(winner.isin, aapl);
    assert_eq!(winner.side, Side::Sell);

    let rejected = result
        .rejected_opportunities
        .iter()
        .find(|r| r.candidate.isin == goog && r.candidate.side == Side::Sell)
        .expect("GOOG sell candidate should be recorded as rejected, not dropped");
    assert_eq!(rejected.reason, "in alternative sequence (a different sequence had higher score)");
}

/// Reordering the positions fed into the context must not change the
/// portfolio hash or the resulting plan.
#[test]
fn hash_is_stable_under_position_reorder() {
    let now = Utc::now();
    let aapl = Isin::new("US0378331005").unwrap();
    let msft = Isin::new("US5949181045").unwrap();
    let config = PlannerConfiguration::default();

    let ctx_a = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .security(security("US5949181045", "MSFT"))
        .price(aapl.clone(), EurCents::from_eur(150.0))
        .price(msft.clone(), EurCents::from_eur(300.0))
        .cash(EurCents::from_eur(1000.0))
        .position(position(aapl.clone(), 10, 140.0, 10, now))
        .position(position(msft.clone(), 5, 295.0, 10, now))
        .now(now)
        .build()
        .unwrap();

    let ctx_b = OpportunityContextBuilder::new()
        .security(security("US5949181045", "MSFT"))
        .security(security("US0378331005", "AAPL"))
        .price(msft.clone(), EurCents::from_eur(300.0))
        .price(aapl.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(1000.0))
        .position(position(msft, 5, 295.0, 10, now))
        .position(position(aapl, 10, 140.0, 10, now))
        .now(now)
        .build()
        .unwrap();

    let result_a = select_plan(&ctx_a, &config);
    let result_b = select_plan(&ctx_b, &config);

    assert_eq!(result_a.portfolio_hash, result_b.portfolio_hash);
    assert_eq!(result_a.plan.steps.len(), result_b.plan.steps.len());
    assert!(result_a.plan.steps.is_empty());
}

/// Boundary: an empty portfolio with positive cash can only ever produce
/// BUY steps, never a SELL (there is nothing to sell).
#[test]
fn empty_portfolio_with_cash_is_buy_only() {
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(10000.0))
        .security_score(isin.clone(), 0.9)
        .long_term_score(isin.clone(), 0.9)
        .opportunity_score(isin.clone(), 0.9)
        .cagr(isin.clone(), 0.20)
        .kelly_size(isin, 0.2)
        .build()
        .unwrap();

    let config = PlannerConfiguration::default();
    let result = select_plan(&ctx, &config);

    assert!(result.plan.steps.iter().all(|s| s.side == Side::Buy));
}

/// Boundary: a zero-cash portfolio never triggers a BUY candidate, and
/// the pipeline does not error.
#[test]
fn zero_cash_yields_no_buys() {
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::ZERO)
        .security_score(isin.clone(), 0.9)
        .long_term_score(isin.clone(), 0.9)
        .opportunity_score(isin.clone(), 0.9)
        .cagr(isin.clone(), 0.20)
        .kelly_size(isin, 0.2)
        .build()
        .unwrap();

    let config = PlannerConfiguration::default();
    let result = select_plan(&ctx, &config);

    assert!(result.plan.steps.iter().all(|s| s.side != Side::Buy));
}

/// Boundary: `allow_sell = false` on the context blocks every SELL
/// calculator regardless of how attractive the position looks.
#[test]
fn allow_sell_false_never_sells() {
    let now = Utc::now();
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(1000.0))
        .position(position(isin, 100, 100.0, 200, now))
        .allow_sell(false)
        .now(now)
        .build()
        .unwrap();

    let config = PlannerConfiguration::default();
    let result = select_plan(&ctx, &config);

    assert!(result.plan.steps.iter().all(|s| s.side != Side::Sell));
}

/// Boundary: re-running the same context and config with
/// `max_sequence_attempts = 1` is deterministic — the same winner every
/// time.
#[test]
fn replanning_with_single_attempt_is_deterministic() {
    let now = Utc::now();
    let isin = Isin::new("US0378331005").unwrap();
    let ctx = OpportunityContextBuilder::new()
        .security(security("US0378331005", "AAPL"))
        .price(isin.clone(), EurCents::from_eur(150.0))
        .cash(EurCents::from_eur(1000.0))
        .position(position(isin, 100, 100.0, 200, now))
        .now(now)
        .build()
        .unwrap();

    let mut config = PlannerConfiguration::default();
    config.max_sequence_attempts = 1;

    let first = select_plan(&ctx, &config);
    let second = select_plan(&ctx, &config);

    assert_eq!(first.plan.steps.len(), second.plan.steps.len());
    for (a, b) in first.plan.steps.iter().zip(second.plan.steps.iter()) {
        assert_eq!(a.isin, b.isin);
        assert_eq!(a.side, b.side);
        assert_eq!(a.quantity, b.quantity);
    }
}
