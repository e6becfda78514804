//! Derivatives alpha scoring
//!
//! Fuses funding, open interest, long/short ratios and liquidation volumes
//! into a 0-100 composite score, and a top-trader series into a separate
//! smart-money flow score. Every input may be missing; missing inputs
//! degrade to neutral sub-scores instead of failing.
//!
//! ```
//! use chartsense::alpha::{score_alpha, CompositeLabel, MarketMetrics};
//!
//! let report = score_alpha(&MarketMetrics::default(), &[]);
//! assert_eq!(report.composite_score, 50);
//! assert_eq!(report.label, CompositeLabel::Neutral);
//! assert!(report.smart_money.delta_long_share_pp.is_none());
//! ```

mod composite;
mod normalize;
mod smart_money;
pub mod sources;

pub use composite::{CompositeComponents, CompositeLabel};
pub use normalize::{normalize_pct, ratio_to_score, FundingBias, LiquidationBalance, NEUTRAL};
pub use smart_money::{FlowComponents, FlowLabel, SmartMoneyFlow};
pub use sources::{collect_metrics, MetricsSource};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PatternError, Result};

// ============================================================
// INPUT
// ============================================================

/// Raw per-symbol derivatives metrics; `None` means the value was unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMetrics {
    pub funding_rate_8h: Option<f64>,
    pub oi_level: Option<f64>,
    pub oi_change_24h_pct: Option<f64>,
    pub ls_accounts: Option<f64>,
    pub ls_positions: Option<f64>,
    pub liq_24h_long_usd: Option<f64>,
    pub liq_24h_short_usd: Option<f64>,
}

fn finite(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite())
}

fn volume(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite() && *v >= 0.0)
}

impl MarketMetrics {
    /// Copy with non-finite values and negative liquidation volumes dropped
    pub fn sanitized(&self) -> Self {
        Self {
            funding_rate_8h: finite(self.funding_rate_8h),
            oi_level: finite(self.oi_level),
            oi_change_24h_pct: finite(self.oi_change_24h_pct),
            ls_accounts: finite(self.ls_accounts),
            ls_positions: finite(self.ls_positions),
            liq_24h_long_usd: volume(self.liq_24h_long_usd),
            liq_24h_short_usd: volume(self.liq_24h_short_usd),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================
// PARAMETERS
// ============================================================

/// Sub-score assigned to each funding bias in the composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingScores {
    pub bullish_crowded: f64,
    pub slightly_bullish: f64,
    pub neutral: f64,
    pub slightly_bearish: f64,
    pub bearish_crowded: f64,
}

impl Default for FundingScores {
    fn default() -> Self {
        Self {
            bullish_crowded: FundingBias::BullishCrowded.composite_score(),
            slightly_bullish: FundingBias::SlightlyBullish.composite_score(),
            neutral: FundingBias::Neutral.composite_score(),
            slightly_bearish: FundingBias::SlightlyBearish.composite_score(),
            bearish_crowded: FundingBias::BearishCrowded.composite_score(),
        }
    }
}

impl FundingScores {
    pub fn get(&self, bias: FundingBias) -> f64 {
        match bias {
            FundingBias::BullishCrowded => self.bullish_crowded,
            FundingBias::SlightlyBullish => self.slightly_bullish,
            FundingBias::Neutral => self.neutral,
            FundingBias::SlightlyBearish => self.slightly_bearish,
            FundingBias::BearishCrowded => self.bearish_crowded,
        }
    }
}

/// Every constant used by [`score_alpha_with`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// OI change (percent) mapped onto the full 0-100 range
    pub oi_clamp: f64,
    pub weight_oi: f64,
    pub weight_funding: f64,
    pub weight_ratio: f64,
    pub weight_liquidation: f64,

    pub funding_crowded_long: f64,
    pub funding_crowded_short: f64,
    pub funding_scores: FundingScores,

    pub ratio_floor: f64,
    pub ratio_cap: f64,
    /// Distance from 50 before the ratio sub-score counts as leaning
    pub ratio_lean_band: f64,

    pub liq_dominance: f64,
    pub liq_short_score: f64,
    pub liq_long_score: f64,

    pub bullish_at: u8,
    pub bearish_at: u8,

    pub flow_oi_weight: f64,
    pub flow_share_weight: f64,
    /// Long-share shift (percentage points) mapped onto ±50
    pub share_clamp_pp: f64,
    pub funding_fudge: f64,
    pub liq_adjust: f64,
    pub inflow_at: u8,
    pub outflow_at: u8,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            oi_clamp: 40.0,
            weight_oi: 0.30,
            weight_funding: 0.25,
            weight_ratio: 0.25,
            weight_liquidation: 0.20,
            funding_crowded_long: FundingBias::CROWDED_LONG,
            funding_crowded_short: FundingBias::CROWDED_SHORT,
            funding_scores: FundingScores::default(),
            ratio_floor: 0.2,
            ratio_cap: 5.0,
            ratio_lean_band: 2.0,
            liq_dominance: 1.3,
            liq_short_score: 58.0,
            liq_long_score: 42.0,
            bullish_at: 60,
            bearish_at: 40,
            flow_oi_weight: 0.6,
            flow_share_weight: 0.4,
            share_clamp_pp: 20.0,
            funding_fudge: 5.0,
            liq_adjust: 5.0,
            inflow_at: 60,
            outflow_at: 40,
        }
    }
}

fn check(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(PatternError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PatternError::OutOfRange {
            field,
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        })
    }
}

impl ScoringParams {
    pub fn validate(&self) -> Result<()> {
        check_positive("oi_clamp", self.oi_clamp)?;
        check_positive("share_clamp_pp", self.share_clamp_pp)?;
        for (field, w) in [
            ("weight_oi", self.weight_oi),
            ("weight_funding", self.weight_funding),
            ("weight_ratio", self.weight_ratio),
            ("weight_liquidation", self.weight_liquidation),
            ("flow_oi_weight", self.flow_oi_weight),
            ("flow_share_weight", self.flow_share_weight),
        ] {
            check(field, w, 0.0, 1.0)?;
        }

        check("funding_crowded_long", self.funding_crowded_long, 0.0, 1.0)?;
        check("funding_crowded_short", self.funding_crowded_short, -1.0, 0.0)?;
        let fs = &self.funding_scores;
        for (field, s) in [
            ("funding_scores.bullish_crowded", fs.bullish_crowded),
            ("funding_scores.slightly_bullish", fs.slightly_bullish),
            ("funding_scores.neutral", fs.neutral),
            ("funding_scores.slightly_bearish", fs.slightly_bearish),
            ("funding_scores.bearish_crowded", fs.bearish_crowded),
            ("liq_short_score", self.liq_short_score),
            ("liq_long_score", self.liq_long_score),
        ] {
            check(field, s, 0.0, 100.0)?;
        }

        // Both halves of the ratio map divide by their span
        check("ratio_floor", self.ratio_floor, f64::MIN_POSITIVE, 1.0 - f64::EPSILON)?;
        check("ratio_cap", self.ratio_cap, 1.0 + f64::EPSILON, f64::MAX)?;
        check("ratio_lean_band", self.ratio_lean_band, 0.0, 50.0)?;
        check("liq_dominance", self.liq_dominance, 1.0, f64::MAX)?;
        check("funding_fudge", self.funding_fudge, 0.0, 50.0)?;
        check("liq_adjust", self.liq_adjust, 0.0, 50.0)?;

        if !(self.bearish_at < self.bullish_at && self.bullish_at <= 100) {
            return Err(PatternError::InvalidConfig(format!(
                "label thresholds must satisfy bearish_at < bullish_at <= 100, got {} / {}",
                self.bearish_at, self.bullish_at
            )));
        }
        if !(self.outflow_at < self.inflow_at && self.inflow_at <= 100) {
            return Err(PatternError::InvalidConfig(format!(
                "flow thresholds must satisfy outflow_at < inflow_at <= 100, got {} / {}",
                self.outflow_at, self.inflow_at
            )));
        }
        Ok(())
    }
}

// ============================================================
// OUTPUT
// ============================================================

/// Composite score plus the independent smart-money flow score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaReport {
    pub composite_score: u8,
    pub label: CompositeLabel,
    /// Ordered OI, funding, ratio, liquidations
    pub reasons: Vec<String>,
    pub components: CompositeComponents,
    pub smart_money: SmartMoneyFlow,
}

/// Score `metrics` and `top_trader_series` with default constants.
///
/// `top_trader_series` holds top-trader long/short position ratios, oldest
/// first; only its first and last values are used.
pub fn score_alpha(metrics: &MarketMetrics, top_trader_series: &[f64]) -> AlphaReport {
    evaluate(&ScoringParams::default(), metrics, top_trader_series)
}

/// Like [`score_alpha`] with custom constants, validated first
pub fn score_alpha_with(
    params: &ScoringParams,
    metrics: &MarketMetrics,
    top_trader_series: &[f64],
) -> Result<AlphaReport> {
    params.validate()?;
    Ok(evaluate(params, metrics, top_trader_series))
}

fn evaluate(params: &ScoringParams, metrics: &MarketMetrics, series: &[f64]) -> AlphaReport {
    let metrics = metrics.sanitized();
    let (composite_score, label, components, reasons) = composite::compose(params, &metrics);
    let smart_money = smart_money::flow(params, &metrics, series);

    debug!(
        composite = composite_score,
        label = label.as_str(),
        flow = smart_money.score,
        flow_label = smart_money.label.as_str(),
        "alpha scored"
    );

    AlphaReport {
        composite_score,
        label,
        reasons,
        components,
        smart_money,
    }
}
