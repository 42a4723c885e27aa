//! PlannerConfiguration: the tunable knobs behind every calculator,
//! generator, evaluator and enforcer decision.
//!
//! Every field has a default, so a configuration can be built from a
//! partial TOML document (missing sections fall back to `Default::default`)
//! or from `PlannerConfiguration::default()` directly, as most tests do.

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlannerConfiguration {
    pub name: String,
    pub description: String,

    pub enable_batch_generation: bool,
    pub max_depth: usize,
    pub max_opportunities_per_category: usize,
    pub max_sequence_attempts: usize,

    pub enable_diverse_selection: bool,
    pub diversity_weight: f64,

    pub transaction_cost_fixed: f64,
    pub transaction_cost_percent: f64,

    pub allow_sell: bool,
    pub allow_buy: bool,

    pub min_hold_days: i64,
    pub sell_cooldown_days: i64,

    pub max_loss_threshold: f64,
    pub max_sell_percentage: f64,
    pub averaging_down_percent: f64,

    pub optimizer_blend: f64,
    pub optimizer_target_return: f64,
    pub min_cash_reserve: f64,

    pub enable_profit_taking_calc: bool,
    pub enable_averaging_down_calc: bool,
    pub enable_opportunity_buys_calc: bool,
    pub enable_rebalance_sells_calc: bool,
    pub enable_rebalance_buys_calc: bool,
    pub enable_weight_based_calc: bool,

    pub enable_correlation_aware_filter: bool,
    pub enable_diversity_filter: bool,
    pub enable_tag_filtering: bool,

    pub scoring: ScoringParams,
    pub weights: ComponentWeights,
}

impl Default for PlannerConfiguration {
    fn default() -> Self {
        Self {
            name: "default".into(),
            description: String::new(),
            enable_batch_generation: true,
            max_depth: 10,
            max_opportunities_per_category: 10,
            max_sequence_attempts: 20,
            enable_diverse_selection: false,
            diversity_weight: 0.3,
            transaction_cost_fixed: 5.0,
            transaction_cost_percent: 0.001,
            allow_sell: true,
            allow_buy: true,
            min_hold_days: 90,
            sell_cooldown_days: 180,
            max_loss_threshold: -0.20,
            max_sell_percentage: 0.20,
            averaging_down_percent: 0.10,
            optimizer_blend: 0.5,
            optimizer_target_return: 0.11,
            min_cash_reserve: 500.0,
            enable_profit_taking_calc: true,
            enable_averaging_down_calc: true,
            enable_opportunity_buys_calc: true,
            enable_rebalance_sells_calc: true,
            enable_rebalance_buys_calc: true,
            enable_weight_based_calc: true,
            enable_correlation_aware_filter: false,
            enable_diversity_filter: false,
            enable_tag_filtering: true,
            scoring: ScoringParams::default(),
            weights: ComponentWeights::default(),
        }
    }
}

impl PlannerConfiguration {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig("max_depth must be > 0".into()));
        }
        if self.max_opportunities_per_category == 0 {
            return Err(Error::InvalidConfig(
                "max_opportunities_per_category must be > 0".into(),
            ));
        }
        if self.max_sequence_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_sequence_attempts must be > 0".into(),
            ));
        }
        if self.transaction_cost_percent < 0.0 || self.transaction_cost_percent >= 1.0 {
            return Err(Error::InvalidConfig(
                "transaction_cost_percent must be in [0, 1)".into(),
            ));
        }
        if self.max_sell_percentage <= 0.0 || self.max_sell_percentage > 1.0 {
            return Err(Error::InvalidConfig(
                "max_sell_percentage must be in (0, 1]".into(),
            ));
        }
        if self.min_cash_reserve < 0.0 {
            return Err(Error::InvalidConfig("min_cash_reserve must be >= 0".into()));
        }
        self.weights.validate()?;
        self.scoring.validate()?;
        Ok(())
    }

    /// The minimum trade value below which a BUY/SELL is rejected.
    pub fn min_trade_amount(&self) -> f64 {
        crate::cost_model::min_trade_value_for_cost_ratio(
            crate::money::EurCents::from_eur(self.transaction_cost_fixed),
            self.transaction_cost_percent,
            self.scoring.max_cost_ratio,
        )
        .map(|v| v.as_eur())
        .unwrap_or(f64::INFINITY)
    }
}

/// Thresholds driving calculator quality gates and tiered risk scoring.
/// These arrive pre-resolved from temperament in production; the defaults
/// here are the reference numbers used when nothing overrides them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScoringParams {
    pub min_gain_threshold: f64,
    pub windfall_threshold: f64,
    pub min_loss_threshold: f64,

    pub quality_threshold: f64,
    pub min_score: f64,
    pub max_value_per_position: f64,
    pub fundamentals_threshold: f64,
    pub long_term_threshold: f64,
    pub exceptional_quality_threshold: f64,

    pub value_trap_stability_threshold: f64,
    pub value_trap_long_term_threshold: f64,
    pub value_trap_momentum_threshold: f64,

    pub rebalance_deviation_threshold: f64,
    pub weight_deviation_threshold: f64,
    pub deviation_scale: f64,

    pub sharpe_excellent: f64,
    pub sharpe_good: f64,
    pub sharpe_acceptable: f64,
    pub volatility_excellent: f64,
    pub volatility_good: f64,
    pub volatility_acceptable: f64,
    pub max_drawdown_excellent: f64,
    pub max_drawdown_good: f64,
    pub max_drawdown_acceptable: f64,

    pub regime_bull_threshold: f64,
    pub regime_bear_threshold: f64,

    pub max_cost_ratio: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            min_gain_threshold: 0.15,
            windfall_threshold: 0.30,
            min_loss_threshold: -0.05,
            quality_threshold: 0.5,
            min_score: 0.65,
            max_value_per_position: 5000.0,
            fundamentals_threshold: 0.5,
            long_term_threshold: 0.5,
            exceptional_quality_threshold: 0.8,
            value_trap_stability_threshold: 0.4,
            value_trap_long_term_threshold: 0.4,
            value_trap_momentum_threshold: 0.4,
            rebalance_deviation_threshold: 0.05,
            weight_deviation_threshold: 0.05,
            deviation_scale: 1.0,
            sharpe_excellent: 1.5,
            sharpe_good: 1.0,
            sharpe_acceptable: 0.5,
            volatility_excellent: 0.15,
            volatility_good: 0.25,
            volatility_acceptable: 0.35,
            max_drawdown_excellent: -0.10,
            max_drawdown_good: -0.20,
            max_drawdown_acceptable: -0.30,
            regime_bull_threshold: 0.3,
            regime_bear_threshold: -0.3,
            max_cost_ratio: 0.01,
        }
    }
}

impl ScoringParams {
    fn validate(&self) -> Result<()> {
        if self.min_score < 0.0 || self.min_score > 1.0 {
            return Err(Error::InvalidConfig("min_score must be in [0, 1]".into()));
        }
        if self.max_cost_ratio <= 0.0 {
            return Err(Error::InvalidConfig("max_cost_ratio must be > 0".into()));
        }
        Ok(())
    }

    /// Tiered score for an axis where higher is better (Sharpe).
    pub fn tier_higher_is_better(&self, value: f64, excellent: f64, good: f64, acceptable: f64) -> f64 {
        if value >= excellent {
            1.0
        } else if value >= good {
            0.75
        } else if value >= acceptable {
            0.5
        } else {
            0.0
        }
    }

    /// Tiered score for an axis where lower is better (volatility).
    pub fn tier_lower_is_better(&self, value: f64, excellent: f64, good: f64, acceptable: f64) -> f64 {
        if value <= excellent {
            1.0
        } else if value <= good {
            0.75
        } else if value <= acceptable {
            0.5
        } else {
            0.0
        }
    }

    /// Tiered score for max drawdown, where values are negative and closer
    /// to zero is better (-0.05 is better than -0.30).
    pub fn tier_drawdown(&self, value: f64) -> f64 {
        if value >= self.max_drawdown_excellent {
            1.0
        } else if value >= self.max_drawdown_good {
            0.75
        } else if value >= self.max_drawdown_acceptable {
            0.5
        } else {
            0.0
        }
    }
}

/// The four weighted components of `EvaluationResult.end_score`.
/// Normalized to sum to 1 before use.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComponentWeights {
    pub portfolio_quality: f64,
    pub diversification_alignment: f64,
    pub risk_adjusted_metrics: f64,
    pub end_state_improvement: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            portfolio_quality: 0.35,
            diversification_alignment: 0.30,
            risk_adjusted_metrics: 0.25,
            end_state_improvement: 0.10,
        }
    }
}

impl ComponentWeights {
    fn validate(&self) -> Result<()> {
        let sum = self.portfolio_quality
            + self.diversification_alignment
            + self.risk_adjusted_metrics
            + self.end_state_improvement;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidConfig(format!(
                "component weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    /// Normalize so the four weights sum to exactly 1.0.
    pub fn normalized(&self) -> Self {
        let sum = self.portfolio_quality
            + self.diversification_alignment
            + self.risk_adjusted_metrics
            + self.end_state_improvement;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            portfolio_quality: self.portfolio_quality / sum,
            diversification_alignment: self.diversification_alignment / sum,
            risk_adjusted_metrics: self.risk_adjusted_metrics / sum,
            end_state_improvement: self.end_state_improvement / sum,
        }
    }

    /// Nudge weights for the prevailing market regime: bull regimes favor
    /// `EndStateImprovement` over `RiskAdjustedMetrics`,
    /// bear regimes the reverse. Every weight stays clamped to [0.05, 0.60]
    /// and the result is re-normalized to sum to 1.
    pub fn regime_adjusted(&self, regime_score: f64, scoring: &ScoringParams) -> Self {
        let mut adjusted = *self;
        if regime_score > scoring.regime_bull_threshold {
            let nudge = 0.10 * regime_score;
            adjusted.end_state_improvement += nudge;
            adjusted.risk_adjusted_metrics -= nudge;
        } else if regime_score < scoring.regime_bear_threshold {
            let nudge = 0.10 * regime_score.abs();
            adjusted.risk_adjusted_metrics += nudge;
            adjusted.end_state_improvement -= nudge;
        }

        adjusted.portfolio_quality = adjusted.portfolio_quality.clamp(0.05, 0.60);
        adjusted.diversification_alignment = adjusted.diversification_alignment.clamp(0.05, 0.60);
        adjusted.risk_adjusted_metrics = adjusted.risk_adjusted_metrics.clamp(0.05, 0.60);
        adjusted.end_state_improvement = adjusted.end_state_improvement.clamp(0.05, 0.60);

        adjusted.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        PlannerConfiguration::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_max_depth() {
        let mut config = PlannerConfiguration::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = PlannerConfiguration::default();
        config.weights.portfolio_quality = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn regime_adjustment_stays_within_bounds_and_sums_to_one() {
        let weights = ComponentWeights::default();
        let scoring = ScoringParams::default();
        for regime in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let adjusted = weights.regime_adjusted(regime, &scoring);
            let sum = adjusted.portfolio_quality
                + adjusted.diversification_alignment
                + adjusted.risk_adjusted_metrics
                + adjusted.end_state_improvement;
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(adjusted.portfolio_quality >= 0.05 && adjusted.portfolio_quality <= 0.60);
            assert!(adjusted.risk_adjusted_metrics >= 0.05 && adjusted.risk_adjusted_metrics <= 0.60);
        }
    }

    #[test]
    fn bull_regime_favors_improvement_over_risk() {
        let weights = ComponentWeights::default();
        let scoring = ScoringParams::default();
        let adjusted = weights.regime_adjusted(0.8, &scoring);
        assert!(adjusted.end_state_improvement > weights.end_state_improvement);
    }

    #[test]
    fn min_trade_amount_matches_default_one_percent_ratio() {
        let config = PlannerConfiguration::default();
        let min_trade = config.min_trade_amount();
        assert!(min_trade > 0.0);
        let cost = config.transaction_cost_fixed + min_trade * config.transaction_cost_percent;
        assert!((cost / min_trade - config.scoring.max_cost_ratio).abs() < 1e-6);
    }
}
