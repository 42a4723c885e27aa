//! Portfolio/universe/market-data fixture loading.
//!
//! The CLI has no broker or database to pull live state from, so a run's
//! entire input — the security universe, current positions, cash, prices,
//! per-security scores, and the run-level settings `OpportunityContextBuilder`
//! needs — comes from one JSON file:
//!
//! ```json
//! {
//!   "securities": [ { "isin": "US0378331005", "symbol": "AAPL", ... } ],
//!   "positions": [
//!     { "isin": "US0378331005", "quantity": 100, "average_cost_eur": 120.0,
//!       "currency_rate": 1.0, "first_bought_at": "2024-01-15T00:00:00Z",
//!       "last_sold_at": null }
//!   ],
//!   "cash_eur": 5000.0,
//!   "prices": { "US0378331005": 185.0 },
//!   "scores": {
//!     "US0378331005": {
//!       "security_score": 0.8, "cagr": 0.18, "long_term_score": 0.75,
//!       "stability_score": 0.6, "momentum_score": 0.5, "volatility": 0.22,
//!       "max_drawdown": -0.15, "sharpe": 1.1, "opportunity_score": 0.7,
//!       "kelly_size": 0.12, "target_weight": 0.25
//!     }
//!   },
//!   "settings": {
//!     "target_return": 0.11, "target_return_threshold_pct": 0.8,
//!     "regime_score": 0.1, "allow_sell": true, "allow_buy": true,
//!     "transaction_cost_fixed": 2.0, "transaction_cost_percent": 0.002,
//!     "ineligible": [], "recently_sold": [], "recently_bought": [],
//!     "geography_allocations": {}, "geography_weights": {}
//!   }
//! }
//! ```
//!
//! `securities` deserializes straight into [`sentinel_core::Security`];
//! everything else is reshaped by [`Fixture::into_context_builder`] into the
//! calls `OpportunityContextBuilder` expects.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use sentinel_core::{EurCents, Isin, OpportunityContextBuilder, RawPosition, Security};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub securities: Vec<Security>,
    #[serde(default)]
    pub positions: Vec<FixturePosition>,
    #[serde(default)]
    pub cash_eur: f64,
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub scores: BTreeMap<String, FixtureScores>,
    #[serde(default)]
    pub settings: FixtureSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixturePosition {
    pub isin: String,
    pub quantity: i64,
    pub average_cost_eur: f64,
    #[serde(default = "default_rate")]
    pub currency_rate: f64,
    pub first_bought_at: DateTime<Utc>,
    #[serde(default)]
    pub last_sold_at: Option<DateTime<Utc>>,
}

fn default_rate() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureScores {
    #[serde(default)]
    pub security_score: f64,
    #[serde(default)]
    pub cagr: f64,
    #[serde(default)]
    pub long_term_score: f64,
    #[serde(default)]
    pub stability_score: f64,
    #[serde(default)]
    pub momentum_score: f64,
    #[serde(default)]
    pub volatility: f64,
    #[serde(default)]
    pub max_drawdown: f64,
    #[serde(default)]
    pub sharpe: f64,
    #[serde(default)]
    pub opportunity_score: f64,
    #[serde(default)]
    pub kelly_size: f64,
    #[serde(default)]
    pub target_weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSettings {
    #[serde(default)]
    pub target_return: Option<f64>,
    #[serde(default)]
    pub target_return_threshold_pct: Option<f64>,
    #[serde(default)]
    pub regime_score: f64,
    #[serde(default = "default_true")]
    pub allow_sell: bool,
    #[serde(default = "default_true")]
    pub allow_buy: bool,
    #[serde(default)]
    pub transaction_cost_fixed: Option<f64>,
    #[serde(default)]
    pub transaction_cost_percent: Option<f64>,
    #[serde(default)]
    pub ineligible: Vec<String>,
    #[serde(default)]
    pub recently_sold: Vec<String>,
    #[serde(default)]
    pub recently_bought: Vec<String>,
    #[serde(default)]
    pub geography_allocations: BTreeMap<String, f64>,
    #[serde(default)]
    pub geography_weights: BTreeMap<String, f64>,
}

fn default_true() -> bool {
    true
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            target_return: None,
            target_return_threshold_pct: None,
            regime_score: 0.0,
            allow_sell: true,
            allow_buy: true,
            transaction_cost_fixed: None,
            transaction_cost_percent: None,
            ineligible: Vec::new(),
            recently_sold: Vec::new(),
            recently_bought: Vec::new(),
            geography_allocations: BTreeMap::new(),
            geography_weights: BTreeMap::new(),
        }
    }
}

impl Fixture {
    /// Load and parse a fixture JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FixtureRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let fixture: Fixture = serde_json::from_str(&contents)?;
        fixture.validate()?;
        Ok(fixture)
    }

    fn validate(&self) -> Result<()> {
        if self.securities.is_empty() && self.positions.is_empty() {
            return Err(Error::Fixture(
                "fixture must declare at least one security or position".into(),
            ));
        }
        if self.cash_eur < 0.0 {
            return Err(Error::Fixture("cash_eur must be >= 0".into()));
        }
        Ok(())
    }

    /// Fold the fixture into an `OpportunityContextBuilder`, ready for
    /// `.build()`. Returns the builder rather than the built context so the
    /// caller sees `sentinel_core::Error` (data-integrity failures) distinct
    /// from fixture-shape failures, which are already ruled out by this
    /// point.
    pub fn into_context_builder(self) -> Result<OpportunityContextBuilder> {
        let mut builder = OpportunityContextBuilder::new()
            .cash(EurCents::from_eur(self.cash_eur))
            .allow_sell(self.settings.allow_sell)
            .allow_buy(self.settings.allow_buy)
            .regime_score(self.settings.regime_score);

        if let Some(v) = self.settings.target_return {
            builder = builder.target_return(v);
        }
        if let Some(v) = self.settings.target_return_threshold_pct {
            builder = builder.target_return_threshold_pct(v);
        }
        if let Some(v) = self.settings.transaction_cost_fixed {
            builder = builder.transaction_cost_fixed(v);
        }
        if let Some(v) = self.settings.transaction_cost_percent {
            builder = builder.transaction_cost_percent(v);
        }

        for security in self.securities {
            builder = builder.security(security);
        }

        for (isin_raw, price) in &self.prices {
            let isin = parse_isin(isin_raw)?;
            builder = builder.price(isin, EurCents::from_eur(*price));
        }

        for (isin_raw, scores) in &self.scores {
            let isin = parse_isin(isin_raw)?;
            builder = builder
                .security_score(isin.clone(), scores.security_score)
                .cagr(isin.clone(), scores.cagr)
                .long_term_score(isin.clone(), scores.long_term_score)
                .stability_score(isin.clone(), scores.stability_score)
                .momentum_score(isin.clone(), scores.momentum_score)
                .volatility(isin.clone(), scores.volatility)
                .max_drawdown(isin.clone(), scores.max_drawdown)
                .sharpe(isin.clone(), scores.sharpe)
                .opportunity_score(isin.clone(), scores.opportunity_score)
                .kelly_size(isin.clone(), scores.kelly_size)
                .target_weight(isin, scores.target_weight);
        }

        for position in self.positions {
            let isin = parse_isin(&position.isin)?;
            builder = builder.position(RawPosition {
                isin,
                quantity: position.quantity,
                average_cost: EurCents::from_eur(position.average_cost_eur),
                currency_rate: position.currency_rate,
                first_bought_at: position.first_bought_at,
                last_sold_at: position.last_sold_at,
            });
        }

        for isin_raw in &self.settings.ineligible {
            builder = builder.ineligible(parse_isin(isin_raw)?);
        }
        for isin_raw in &self.settings.recently_sold {
            builder = builder.recently_sold(parse_isin(isin_raw)?);
        }
        for isin_raw in &self.settings.recently_bought {
            builder = builder.recently_bought(parse_isin(isin_raw)?);
        }
        for (geography, value) in self.settings.geography_allocations {
            builder = builder.geography_allocation(geography, EurCents::from_eur(value));
        }
        for (geography, value) in self.settings.geography_weights {
            builder = builder.geography_weight(geography, value);
        }

        Ok(builder)
    }
}

fn parse_isin(raw: &str) -> Result<Isin> {
    Isin::new(raw).map_err(Error::Core)
}
