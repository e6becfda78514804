//! Normalization primitives shared by the composite and smart-money scorers.
//!
//! Every function here is total: missing or non-finite input maps to the
//! neutral midpoint (50).

use serde::{Deserialize, Serialize};

pub const NEUTRAL: f64 = 50.0;

const RATIO_FLOOR: f64 = 0.2;
const RATIO_CAP: f64 = 5.0;

/// Map a percentage change into `[0, 100]`, clamping to `±clamp` first.
///
/// ```
/// use chartsense::alpha::normalize_pct;
///
/// assert_eq!(normalize_pct(None, 40.0), 50.0);
/// assert_eq!(normalize_pct(Some(20.0), 40.0), 75.0);
/// assert_eq!(normalize_pct(Some(-90.0), 40.0), 0.0);
/// ```
pub fn normalize_pct(x: Option<f64>, clamp: f64) -> f64 {
    match x {
        Some(x) if x.is_finite() && clamp > 0.0 => {
            NEUTRAL + x.clamp(-clamp, clamp) / clamp * NEUTRAL
        }
        _ => NEUTRAL,
    }
}

/// Map a long/short ratio into `[0, 100]`, asymmetric around 1.0
///
/// Ratios in `[1, 5]` cover the upper half, `[0.2, 1)` the lower half.
pub fn ratio_to_score(r: Option<f64>) -> f64 {
    ratio_score_within(r, RATIO_FLOOR, RATIO_CAP)
}

pub(crate) fn ratio_score_within(r: Option<f64>, floor: f64, cap: f64) -> f64 {
    let Some(r) = r.filter(|r| r.is_finite() && *r > 0.0) else {
        return NEUTRAL;
    };
    let r = r.clamp(floor, cap);
    let score = if r >= 1.0 {
        NEUTRAL + (r - 1.0) / (cap - 1.0) * NEUTRAL
    } else {
        NEUTRAL - (1.0 - r) / (1.0 - floor) * NEUTRAL
    };
    score.clamp(0.0, 100.0)
}

/// Round to the nearest integer (ties to even) and clamp into `0..=100`
pub(crate) fn to_score(x: f64) -> u8 {
    if !x.is_finite() {
        return NEUTRAL as u8;
    }
    x.round_ties_even().clamp(0.0, 100.0) as u8
}

// ============================================================
// FUNDING BIAS
// ============================================================

/// Crowding category of an 8h funding rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingBias {
    BullishCrowded,
    SlightlyBullish,
    Neutral,
    SlightlyBearish,
    BearishCrowded,
}

impl FundingBias {
    pub const CROWDED_LONG: f64 = 0.01;
    pub const CROWDED_SHORT: f64 = -0.005;

    pub fn from_rate(rate: Option<f64>) -> Self {
        Self::classify(rate, Self::CROWDED_LONG, Self::CROWDED_SHORT)
    }

    /// Categorize with custom crowding cut-offs
    pub fn classify(rate: Option<f64>, crowded_long: f64, crowded_short: f64) -> Self {
        match rate.filter(|r| r.is_finite()) {
            Some(r) if r > crowded_long => Self::BullishCrowded,
            Some(r) if r > 0.0 => Self::SlightlyBullish,
            Some(r) if r < crowded_short => Self::BearishCrowded,
            Some(r) if r < 0.0 => Self::SlightlyBearish,
            _ => Self::Neutral,
        }
    }

    /// Contrarian sub-score used by the composite
    pub fn composite_score(self) -> f64 {
        match self {
            Self::BullishCrowded => 40.0,
            Self::SlightlyBullish => 58.0,
            Self::Neutral => 50.0,
            Self::SlightlyBearish => 62.0,
            Self::BearishCrowded => 68.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BullishCrowded => "bullish_crowded",
            Self::SlightlyBullish => "slightly_bullish",
            Self::Neutral => "neutral",
            Self::SlightlyBearish => "slightly_bearish",
            Self::BearishCrowded => "bearish_crowded",
        }
    }
}

// ============================================================
// LIQUIDATION BALANCE
// ============================================================

/// Which side's 24h liquidation volume dominates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationBalance {
    /// No liquidation volume reported
    Absent,
    ShortDominant,
    LongDominant,
    Balanced,
}

impl LiquidationBalance {
    /// Missing volumes count as zero; one side dominates when it exceeds the
    /// other by more than `dominance` times.
    pub fn from_volumes(long_usd: Option<f64>, short_usd: Option<f64>, dominance: f64) -> Self {
        let long = long_usd.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0);
        let short = short_usd.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0);
        if long == 0.0 && short == 0.0 {
            Self::Absent
        } else if short > long * dominance {
            Self::ShortDominant
        } else if long > short * dominance {
            Self::LongDominant
        } else {
            Self::Balanced
        }
    }
}
