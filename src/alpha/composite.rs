//! Weighted composite of OI momentum, funding crowding, long/short ratios
//! and liquidation imbalance.

use serde::Serialize;

use super::{
  normalize::{normalize_pct, ratio_score_within, to_score, NEUTRAL},
  FundingBias, LiquidationBalance, MarketMetrics, ScoringParams,
};

/// Directional label of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompositeLabel {
  Bullish,
  Neutral,
  Bearish,
}

impl CompositeLabel {
  pub fn from_score(score: u8, bullish_at: u8, bearish_at: u8) -> Self {
    if score >= bullish_at {
      Self::Bullish
    } else if score <= bearish_at {
      Self::Bearish
    } else {
      Self::Neutral
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Bullish => "BULLISH",
      Self::Neutral => "NEUTRAL",
      Self::Bearish => "BEARISH",
    }
  }
}

/// Unweighted sub-scores, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeComponents {
  pub oi: f64,
  pub funding: f64,
  pub ratio: f64,
  pub liquidation: f64,
  pub funding_bias: FundingBias,
  pub liquidation_balance: LiquidationBalance,
}

fn funding_reason(bias: FundingBias) -> Option<&'static str> {
  match bias {
    FundingBias::BullishCrowded => Some("Funding strongly positive: longs crowded"),
    FundingBias::SlightlyBullish => Some("Funding positive: longs dominant"),
    FundingBias::SlightlyBearish => Some("Funding mildly negative: positioned against the crowd"),
    FundingBias::BearishCrowded => Some("Funding strongly negative: shorts crowded (squeeze risk)"),
    FundingBias::Neutral => None,
  }
}

pub(crate) fn compose(
  p: &ScoringParams,
  m: &MarketMetrics,
) -> (u8, CompositeLabel, CompositeComponents, Vec<String>) {
  let mut reasons = Vec::new();

  let oi = normalize_pct(m.oi_change_24h_pct, p.oi_clamp);
  match m.oi_change_24h_pct {
    Some(x) if x > 0.0 => {
      reasons.push("Open interest rising: leverage building (potential large move)".to_string())
    }
    Some(x) if x < 0.0 => reasons.push("Open interest falling: deleveraging".to_string()),
    _ => {}
  }

  let funding_bias =
    FundingBias::classify(m.funding_rate_8h, p.funding_crowded_long, p.funding_crowded_short);
  let funding = p.funding_scores.get(funding_bias);
  if let Some(reason) = funding_reason(funding_bias) {
    reasons.push(reason.to_string());
  }

  let ratio = (ratio_score_within(m.ls_accounts, p.ratio_floor, p.ratio_cap)
    + ratio_score_within(m.ls_positions, p.ratio_floor, p.ratio_cap))
    / 2.0;
  if ratio >= NEUTRAL + p.ratio_lean_band {
    reasons.push("Long/short ratio leans long".to_string());
  } else if ratio <= NEUTRAL - p.ratio_lean_band {
    reasons.push("Long/short ratio leans short".to_string());
  }

  let liquidation_balance =
    LiquidationBalance::from_volumes(m.liq_24h_long_usd, m.liq_24h_short_usd, p.liq_dominance);
  let liquidation = match liquidation_balance {
    LiquidationBalance::ShortDominant => {
      reasons.push("Short liquidations dominant: potential relief upward".to_string());
      p.liq_short_score
    }
    LiquidationBalance::LongDominant => {
      reasons.push("Long liquidations dominant: downward pressure".to_string());
      p.liq_long_score
    }
    LiquidationBalance::Balanced | LiquidationBalance::Absent => NEUTRAL,
  };

  let score = to_score(
    p.weight_oi * oi
      + p.weight_funding * funding
      + p.weight_ratio * ratio
      + p.weight_liquidation * liquidation,
  );
  let label = CompositeLabel::from_score(score, p.bullish_at, p.bearish_at);

  let components = CompositeComponents {
    oi,
    funding,
    ratio,
    liquidation,
    funding_bias,
    liquidation_balance,
  };
  (score, label, components, reasons)
}
