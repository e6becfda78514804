//! Smart-money flow: OI momentum plus the shift in top-trader long share,
//! nudged by funding crowding and liquidation imbalance.

use serde::Serialize;

use super::{
  normalize::{normalize_pct, to_score, NEUTRAL},
  FundingBias, LiquidationBalance, MarketMetrics, ScoringParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowLabel {
  Inflow,
  Neutral,
  Outflow,
}

impl FlowLabel {
  pub fn from_score(score: u8, inflow_at: u8, outflow_at: u8) -> Self {
    if score >= inflow_at {
      Self::Inflow
    } else if score <= outflow_at {
      Self::Outflow
    } else {
      Self::Neutral
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Inflow => "INFLOW",
      Self::Neutral => "NEUTRAL",
      Self::Outflow => "OUTFLOW",
    }
  }
}

/// Centered contributions, each roughly in `[-50, 50]` before weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowComponents {
  pub oi_norm: f64,
  pub share_norm: f64,
  pub funding_bias: FundingBias,
  pub liq_adj: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartMoneyFlow {
  pub score: u8,
  pub label: FlowLabel,
  /// Change in top-trader long share, percentage points; `None` when unknown
  pub delta_long_share_pp: Option<f64>,
  pub components: FlowComponents,
  pub reasons: Vec<String>,
}

/// Long share `r / (1 + r)` of a long/short ratio
fn long_share(ratio: f64) -> Option<f64> {
  (ratio.is_finite() && ratio > 0.0).then(|| ratio / (1.0 + ratio))
}

/// Shift between the first and last sample; needs at least two samples
fn share_delta_pp(series: &[f64]) -> Option<f64> {
  let [first, .., last] = series else {
    return None;
  };
  Some((long_share(*last)? - long_share(*first)?) * 100.0)
}

pub(crate) fn flow(p: &ScoringParams, m: &MarketMetrics, series: &[f64]) -> SmartMoneyFlow {
  let delta_long_share_pp = share_delta_pp(series);

  let oi_norm = normalize_pct(m.oi_change_24h_pct, p.oi_clamp) - NEUTRAL;
  let share_norm = delta_long_share_pp
    .map(|d| d.clamp(-p.share_clamp_pp, p.share_clamp_pp) / p.share_clamp_pp * NEUTRAL)
    .unwrap_or(0.0);

  let funding_bias =
    FundingBias::classify(m.funding_rate_8h, p.funding_crowded_long, p.funding_crowded_short);
  let fudge = match funding_bias {
    FundingBias::BearishCrowded => p.funding_fudge,
    FundingBias::BullishCrowded => -p.funding_fudge,
    _ => 0.0,
  };

  let balance =
    LiquidationBalance::from_volumes(m.liq_24h_long_usd, m.liq_24h_short_usd, p.liq_dominance);
  let liq_adj = match balance {
    LiquidationBalance::ShortDominant => p.liq_adjust,
    LiquidationBalance::LongDominant => -p.liq_adjust,
    LiquidationBalance::Balanced | LiquidationBalance::Absent => 0.0,
  };

  let value = p.flow_oi_weight * oi_norm + p.flow_share_weight * share_norm + fudge + liq_adj;
  let score = to_score(NEUTRAL + value);
  let label = FlowLabel::from_score(score, p.inflow_at, p.outflow_at);

  let mut reasons = Vec::new();
  if let Some(oi) = m.oi_change_24h_pct {
    reasons.push(format!("Open interest {oi:+.2}%/24h"));
  }
  if let Some(d) = delta_long_share_pp {
    let arrow = if d >= 0.0 { '↑' } else { '↓' };
    reasons.push(format!("Top-trader long share {arrow}{:.1} pp/24h", d.abs()));
  }
  reasons.push(format!("Funding: {}", funding_bias.as_str().replace('_', " ")));
  match balance {
    LiquidationBalance::ShortDominant => {
      reasons.push("Short liquidations dominant (relief upward)".to_string())
    }
    LiquidationBalance::LongDominant => {
      reasons.push("Long liquidations dominant (pressure downward)".to_string())
    }
    LiquidationBalance::Balanced => reasons.push("Liquidations roughly balanced".to_string()),
    LiquidationBalance::Absent => {}
  }

  SmartMoneyFlow {
    score,
    label,
    delta_long_share_pp,
    components: FlowComponents {
      oi_norm,
      share_norm,
      funding_bias,
      liq_adj,
    },
    reasons,
  }
}
