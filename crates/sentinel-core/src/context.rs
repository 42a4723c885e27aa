//! OpportunityContext: the frozen input to every calculator.
//!
//! Per-security lookups are backed by a `SecurityIndex` arena
//! (ISIN → `u32`) built once, with every score
//! series stored as a dense `Vec<f64>` indexed by that `u32` instead of a
//! `HashMap<Isin, f64>` re-hashed on every calculator pass.
//!
//! The context has no setter phase: `OpportunityContextBuilder` accumulates
//! inputs and `build()` produces a fully populated, immutable context or a
//! data-integrity `Error`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::isin::Isin;
use crate::money::EurCents;
use crate::position::EnrichedPosition;
use crate::security::Security;

/// ISIN → dense-array-index map, built once per planning run.
#[derive(Clone, Debug, Default)]
pub struct SecurityIndex {
    by_isin: FxHashMap<Isin, u32>,
    isins: Vec<Isin>,
}

impl SecurityIndex {
    fn intern(&mut self, isin: &Isin) -> u32 {
        if let Some(&idx) = self.by_isin.get(isin) {
            return idx;
        }
        let idx = self.isins.len() as u32;
        self.isins.push(isin.clone());
        self.by_isin.insert(isin.clone(), idx);
        idx
    }

    pub fn get(&self, isin: &Isin) -> Option<u32> {
        self.by_isin.get(isin).copied()
    }

    pub fn isin_at(&self, idx: u32) -> &Isin {
        &self.isins[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.isins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isins.is_empty()
    }

    pub fn isins(&self) -> &[Isin] {
        &self.isins
    }
}

/// A dense per-security `f64` series indexed by `SecurityIndex`.
#[derive(Clone, Debug, Default)]
pub struct ScoreArray(Vec<f64>);

impl ScoreArray {
    fn with_len(len: usize, default: f64) -> Self {
        Self(vec![default; len])
    }

    pub fn get(&self, idx: u32) -> f64 {
        self.0.get(idx as usize).copied().unwrap_or(0.0)
    }

    fn set(&mut self, idx: u32, value: f64) {
        self.0[idx as usize] = value;
    }
}

/// A dense per-security optional `EurCents` series (prices: absent until set).
#[derive(Clone, Debug, Default)]
pub struct PriceArray(Vec<Option<EurCents>>);

impl PriceArray {
    fn with_len(len: usize) -> Self {
        Self(vec![None; len])
    }

    pub fn get(&self, idx: u32) -> Option<EurCents> {
        self.0.get(idx as usize).copied().flatten()
    }

    fn set(&mut self, idx: u32, value: EurCents) {
        self.0[idx as usize] = Some(value);
    }
}

/// A raw, not-yet-enriched position supplied to the builder.
#[derive(Clone, Debug)]
pub struct RawPosition {
    pub isin: Isin,
    pub quantity: i64,
    pub average_cost: EurCents,
    pub currency_rate: f64,
    pub first_bought_at: chrono::DateTime<chrono::Utc>,
    pub last_sold_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The frozen input to calculators.
#[derive(Clone, Debug)]
pub struct OpportunityContext {
    pub index: SecurityIndex,
    securities: Vec<Security>,
    pub enriched_positions: Vec<EnrichedPosition>,
    positions_by_isin: FxHashMap<Isin, usize>,

    pub available_cash_eur: EurCents,
    pub total_portfolio_value_eur: EurCents,

    current_prices: PriceArray,
    target_weights: ScoreArray,
    security_scores: ScoreArray,
    cagrs: ScoreArray,
    long_term_scores: ScoreArray,
    stability_scores: ScoreArray,
    momentum_scores: ScoreArray,
    volatility: ScoreArray,
    max_drawdown: ScoreArray,
    sharpe: ScoreArray,
    opportunity_scores: ScoreArray,
    kelly_sizes: ScoreArray,

    pub geography_allocations: FxHashMap<String, EurCents>,
    pub geography_weights: FxHashMap<String, f64>,

    pub target_return: f64,
    pub target_return_threshold_pct: f64,
    pub regime_score: f64,

    pub ineligible_isins: FxHashSet<Isin>,
    pub recently_sold_isins: FxHashSet<Isin>,
    pub recently_bought_isins: FxHashSet<Isin>,

    pub transaction_cost_fixed: EurCents,
    pub transaction_cost_percent: f64,

    pub allow_sell: bool,
    pub allow_buy: bool,
}

impl OpportunityContext {
    pub fn security(&self, isin: &Isin) -> Option<&Security> {
        let idx = self.index.get(isin)?;
        self.securities.get(idx as usize)
    }

    pub fn position(&self, isin: &Isin) -> Option<&EnrichedPosition> {
        self.positions_by_isin
            .get(isin)
            .map(|&i| &self.enriched_positions[i])
    }

    pub fn price(&self, isin: &Isin) -> Option<EurCents> {
        let idx = self.index.get(isin)?;
        self.current_prices.get(idx)
    }

    pub fn target_weight(&self, isin: &Isin) -> f64 {
        self.index
            .get(isin)
            .map(|idx| self.target_weights.get(idx))
            .unwrap_or(0.0)
    }

    pub fn score(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.security_scores)
    }

    pub fn cagr(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.cagrs)
    }

    pub fn long_term_score(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.long_term_scores)
    }

    pub fn stability_score(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.stability_scores)
    }

    pub fn momentum_score(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.momentum_scores)
    }

    pub fn volatility(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.volatility)
    }

    pub fn max_drawdown(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.max_drawdown)
    }

    pub fn sharpe(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.sharpe)
    }

    pub fn opportunity_score(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.opportunity_scores)
    }

    pub fn kelly_size(&self, isin: &Isin) -> f64 {
        self.lookup(isin, &self.kelly_sizes)
    }

    pub fn securities(&self) -> &[Security] {
        &self.securities
    }

    /// All active, non-cash securities not currently held — the universe
    /// the opportunity-buy and rebalance-buy calculators scan.
    pub fn unheld_active_securities(&self) -> impl Iterator<Item = &Security> {
        self.securities
            .iter()
            .filter(|s| s.active && !s.isin.is_cash() && self.position(&s.isin).is_none())
    }

    fn lookup(&self, isin: &Isin, arr: &ScoreArray) -> f64 {
        self.index.get(isin).map(|idx| arr.get(idx)).unwrap_or(0.0)
    }
}

/// Default transaction cost fixed fee (EUR).
pub const DEFAULT_TRANSACTION_COST_FIXED: f64 = 2.0;
/// Default transaction cost variable rate.
pub const DEFAULT_TRANSACTION_COST_PERCENT: f64 = 0.002;
/// Default annual target return.
pub const DEFAULT_TARGET_RETURN: f64 = 0.11;
/// Default target-return threshold percent.
pub const DEFAULT_TARGET_RETURN_THRESHOLD_PCT: f64 = 0.80;

/// Builds an `OpportunityContext` from accumulated raw inputs.
#[derive(Default)]
pub struct OpportunityContextBuilder {
    securities: Vec<Security>,
    raw_positions: Vec<RawPosition>,
    available_cash_eur: EurCents,
    prices: FxHashMap<Isin, EurCents>,
    target_weights: FxHashMap<Isin, f64>,
    security_scores: FxHashMap<Isin, f64>,
    cagrs: FxHashMap<Isin, f64>,
    long_term_scores: FxHashMap<Isin, f64>,
    stability_scores: FxHashMap<Isin, f64>,
    momentum_scores: FxHashMap<Isin, f64>,
    volatility: FxHashMap<Isin, f64>,
    max_drawdown: FxHashMap<Isin, f64>,
    sharpe: FxHashMap<Isin, f64>,
    opportunity_scores: FxHashMap<Isin, f64>,
    kelly_sizes: FxHashMap<Isin, f64>,
    geography_allocations: FxHashMap<String, EurCents>,
    geography_weights: FxHashMap<String, f64>,
    target_return: Option<f64>,
    target_return_threshold_pct: Option<f64>,
    regime_score: f64,
    ineligible_isins: FxHashSet<Isin>,
    recently_sold_isins: FxHashSet<Isin>,
    recently_bought_isins: FxHashSet<Isin>,
    transaction_cost_fixed: Option<f64>,
    transaction_cost_percent: Option<f64>,
    allow_sell: bool,
    allow_buy: bool,
    now: Option<chrono::DateTime<chrono::Utc>>,
}

impl OpportunityContextBuilder {
    pub fn new() -> Self {
        Self {
            allow_sell: true,
            allow_buy: true,
            ..Default::default()
        }
    }

    pub fn security(mut self, security: Security) -> Self {
        self.securities.push(security);
        self
    }

    pub fn position(mut self, position: RawPosition) -> Self {
        self.raw_positions.push(position);
        self
    }

    pub fn cash(mut self, amount: EurCents) -> Self {
        self.available_cash_eur = amount;
        self
    }

    pub fn price(mut self, isin: Isin, price: EurCents) -> Self {
        self.prices.insert(isin, price);
        self
    }

    pub fn target_weight(mut self, isin: Isin, weight: f64) -> Self {
        self.target_weights.insert(isin, weight);
        self
    }

    pub fn security_score(mut self, isin: Isin, score: f64) -> Self {
        self.security_scores.insert(isin, score);
        self
    }

    pub fn cagr(mut self, isin: Isin, value: f64) -> Self {
        self.cagrs.insert(isin, value);
        self
    }

    pub fn long_term_score(mut self, isin: Isin, value: f64) -> Self {
        self.long_term_scores.insert(isin, value);
        self
    }

    pub fn stability_score(mut self, isin: Isin, value: f64) -> Self {
        self.stability_scores.insert(isin, value);
        self
    }

    pub fn momentum_score(mut self, isin: Isin, value: f64) -> Self {
        self.momentum_scores.insert(isin, value);
        self
    }

    pub fn volatility(mut self, isin: Isin, value: f64) -> Self {
        self.volatility.insert(isin, value);
        self
    }

    pub fn max_drawdown(mut self, isin: Isin, value: f64) -> Self {
        self.max_drawdown.insert(isin, value);
        self
    }

    pub fn sharpe(mut self, isin: Isin, value: f64) -> Self {
        self.sharpe.insert(isin, value);
        self
    }

    pub fn opportunity_score(mut self, isin: Isin, value: f64) -> Self {
        self.opportunity_scores.insert(isin, value);
        self
    }

    pub fn kelly_size(mut self, isin: Isin, value: f64) -> Self {
        self.kelly_sizes.insert(isin, value);
        self
    }

    pub fn geography_allocation(mut self, geography: String, value: EurCents) -> Self {
        self.geography_allocations.insert(geography, value);
        self
    }

    pub fn geography_weight(mut self, geography: String, value: f64) -> Self {
        self.geography_weights.insert(geography, value);
        self
    }

    pub fn target_return(mut self, value: f64) -> Self {
        self.target_return = Some(value);
        self
    }

    pub fn target_return_threshold_pct(mut self, value: f64) -> Self {
        self.target_return_threshold_pct = Some(value);
        self
    }

    pub fn regime_score(mut self, value: f64) -> Self {
        self.regime_score = value;
        self
    }

    pub fn ineligible(mut self, isin: Isin) -> Self {
        self.ineligible_isins.insert(isin);
        self
    }

    pub fn recently_sold(mut self, isin: Isin) -> Self {
        self.recently_sold_isins.insert(isin);
        self
    }

    pub fn recently_bought(mut self, isin: Isin) -> Self {
        self.recently_bought_isins.insert(isin);
        self
    }

    pub fn transaction_cost_fixed(mut self, value: f64) -> Self {
        self.transaction_cost_fixed = Some(value);
        self
    }

    pub fn transaction_cost_percent(mut self, value: f64) -> Self {
        self.transaction_cost_percent = Some(value);
        self
    }

    pub fn allow_sell(mut self, value: bool) -> Self {
        self.allow_sell = value;
        self
    }

    pub fn allow_buy(mut self, value: bool) -> Self {
        self.allow_buy = value;
        self
    }

    /// Fix the "current time" used for `days_held` computation (tests only;
    /// defaults to `Utc::now()`).
    pub fn now(mut self, now: chrono::DateTime<chrono::Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(self) -> Result<OpportunityContext> {
        let target_return_threshold_pct = self
            .target_return_threshold_pct
            .unwrap_or(DEFAULT_TARGET_RETURN_THRESHOLD_PCT);
        if !(0.0..=1.0).contains(&target_return_threshold_pct) || target_return_threshold_pct == 0.0
        {
            return Err(Error::InvalidThreshold(target_return_threshold_pct));
        }
        if !(-1.0..=1.0).contains(&self.regime_score) {
            return Err(Error::InvalidRegimeScore(self.regime_score));
        }

        let mut index = SecurityIndex::default();
        for security in &self.securities {
            index.intern(&security.isin);
        }
        for position in &self.raw_positions {
            if index.get(&position.isin).is_none() {
                return Err(Error::MissingSecurity {
                    isin: position.isin.to_string(),
                });
            }
        }

        let len = index.len();
        let mut securities = vec![None; len];
        for security in self.securities {
            let idx = index.get(&security.isin).unwrap() as usize;
            securities[idx] = Some(security);
        }
        let securities: Vec<Security> = securities
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.unwrap_or_else(|| {
                    unreachable!("security at index {i} was interned but never inserted")
                })
            })
            .collect();

        let mut current_prices = PriceArray::with_len(len);
        for (isin, price) in &self.prices {
            if price.0 <= 0 {
                return Err(Error::NonPositivePrice {
                    isin: isin.to_string(),
                    price: price.as_eur(),
                });
            }
            if let Some(idx) = index.get(isin) {
                current_prices.set(idx, *price);
            }
        }

        for position in &self.raw_positions {
            if current_prices.get(index.get(&position.isin).unwrap()).is_none() {
                return Err(Error::MissingPrice {
                    isin: position.isin.to_string(),
                });
            }
        }

        let now = self.now.unwrap_or_else(chrono::Utc::now);

        // First pass: compute market value sum to derive total portfolio value.
        let mut positions_market_value = EurCents::ZERO;
        for position in &self.raw_positions {
            let idx = index.get(&position.isin).unwrap();
            let price = current_prices.get(idx).unwrap();
            positions_market_value += price * position.quantity;
        }
        let total_portfolio_value_eur = self.available_cash_eur + positions_market_value;

        let mut enriched_positions = Vec::with_capacity(self.raw_positions.len());
        let mut positions_by_isin = FxHashMap::default();
        for position in self.raw_positions {
            let idx = index.get(&position.isin).unwrap() as usize;
            let security = &securities[idx];
            let price = current_prices.get(idx as u32).unwrap();
            let enriched = EnrichedPosition::build(
                position.isin.clone(),
                security.symbol.clone(),
                position.quantity,
                position.average_cost,
                price,
                position.currency_rate,
                position.first_bought_at,
                position.last_sold_at,
                now,
                total_portfolio_value_eur,
                security,
            );
            positions_by_isin.insert(position.isin, enriched_positions.len());
            enriched_positions.push(enriched);
        }

        let mut target_weights = ScoreArray::with_len(len, 0.0);
        fill(&mut target_weights, &self.target_weights, &index);
        let mut security_scores = ScoreArray::with_len(len, 0.0);
        fill(&mut security_scores, &self.security_scores, &index);
        let mut cagrs = ScoreArray::with_len(len, 0.0);
        fill(&mut cagrs, &self.cagrs, &index);
        let mut long_term_scores = ScoreArray::with_len(len, 0.0);
        fill(&mut long_term_scores, &self.long_term_scores, &index);
        let mut stability_scores = ScoreArray::with_len(len, 0.0);
        fill(&mut stability_scores, &self.stability_scores, &index);
        let mut momentum_scores = ScoreArray::with_len(len, 0.0);
        fill(&mut momentum_scores, &self.momentum_scores, &index);
        let mut volatility = ScoreArray::with_len(len, 0.0);
        fill(&mut volatility, &self.volatility, &index);
        let mut max_drawdown = ScoreArray::with_len(len, 0.0);
        fill(&mut max_drawdown, &self.max_drawdown, &index);
        let mut sharpe = ScoreArray::with_len(len, 0.0);
        fill(&mut sharpe, &self.sharpe, &index);
        let mut opportunity_scores = ScoreArray::with_len(len, 0.0);
        fill(&mut opportunity_scores, &self.opportunity_scores, &index);
        let mut kelly_sizes = ScoreArray::with_len(len, 0.0);
        fill(&mut kelly_sizes, &self.kelly_sizes, &index);

        Ok(OpportunityContext {
            index,
            securities,
            enriched_positions,
            positions_by_isin,
            available_cash_eur: self.available_cash_eur,
            total_portfolio_value_eur,
            current_prices,
            target_weights,
            security_scores,
            cagrs,
            long_term_scores,
            stability_scores,
            momentum_scores,
            volatility,
            max_drawdown,
            sharpe,
            opportunity_scores,
            kelly_sizes,
            geography_allocations: self.geography_allocations,
            geography_weights: self.geography_weights,
            target_return: self.target_return.unwrap_or(DEFAULT_TARGET_RETURN),
            target_return_threshold_pct,
            regime_score: self.regime_score,
            ineligible_isins: self.ineligible_isins,
            recently_sold_isins: self.recently_sold_isins,
            recently_bought_isins: self.recently_bought_isins,
            transaction_cost_fixed: EurCents::from_eur(
                self.transaction_cost_fixed
                    .unwrap_or(DEFAULT_TRANSACTION_COST_FIXED),
            ),
            transaction_cost_percent: self
                .transaction_cost_percent
                .unwrap_or(DEFAULT_TRANSACTION_COST_PERCENT),
            allow_sell: self.allow_sell,
            allow_buy: self.allow_buy,
        })
    }
}

fn fill(arr: &mut ScoreArray, values: &FxHashMap<Isin, f64>, index: &SecurityIndex) {
    for (isin, value) in values {
        if let Some(idx) = index.get(isin) {
            arr.set(idx, *value);
        }
    }
}
