//! Alpha scoring: composite score, smart-money flow and source merging.

use chartsense::alpha::sources::{LongShort, Liquidations, OpenInterest};
use chartsense::prelude::*;

fn expected_label(score: u8) -> CompositeLabel {
    if score >= 60 {
        CompositeLabel::Bullish
    } else if score <= 40 {
        CompositeLabel::Bearish
    } else {
        CompositeLabel::Neutral
    }
}

fn oi_only(oi: f64) -> MarketMetrics {
    MarketMetrics {
        oi_change_24h_pct: Some(oi),
        ..MarketMetrics::default()
    }
}

// ============================================================
// COMPOSITE
// ============================================================

#[test]
fn test_crowded_long_scenario() {
    let metrics = MarketMetrics {
        funding_rate_8h: Some(0.02),
        oi_change_24h_pct: Some(15.0),
        ls_accounts: Some(2.0),
        ls_positions: Some(2.0),
        liq_24h_long_usd: Some(0.0),
        liq_24h_short_usd: Some(0.0),
        ..MarketMetrics::default()
    };
    let report = score_alpha(&metrics, &[]);
    assert_eq!(report.composite_score, 56);
    assert_eq!(report.label, CompositeLabel::Neutral);
    assert_eq!(report.components.funding_bias, FundingBias::BullishCrowded);
    assert_eq!(report.reasons.len(), 3);
}

#[test]
fn test_label_boundaries_through_oi() {
    // Other sub-scores neutral: score = 0.30·normalize_pct(oi, 40) + 35
    let cases = [
        (-26.0, 40, CompositeLabel::Bearish),
        (-23.5, 41, CompositeLabel::Neutral),
        (23.5, 59, CompositeLabel::Neutral),
        (27.0, 60, CompositeLabel::Bullish),
    ];
    for (oi, score, label) in cases {
        let report = score_alpha(&oi_only(oi), &[]);
        assert_eq!(report.composite_score, score, "oi {oi}");
        assert_eq!(report.label, label, "oi {oi}");
    }
}

#[test]
fn test_every_null_combination_is_in_range() {
    let full = [
        Some(-0.02),
        Some(1e12),
        Some(-35.0),
        Some(0.3),
        Some(4.0),
        Some(5e6),
        Some(1e3),
    ];
    for mask in 0u32..128 {
        let pick = |i: usize| if mask & (1 << i) != 0 { full[i] } else { None };
        let metrics = MarketMetrics {
            funding_rate_8h: pick(0),
            oi_level: pick(1),
            oi_change_24h_pct: pick(2),
            ls_accounts: pick(3),
            ls_positions: pick(4),
            liq_24h_long_usd: pick(5),
            liq_24h_short_usd: pick(6),
        };
        let report = score_alpha(&metrics, &[1.2, 0.9]);
        assert!(report.composite_score <= 100);
        assert_eq!(report.label, expected_label(report.composite_score));
        assert!(report.smart_money.score <= 100);
    }
}

#[test]
fn test_non_finite_inputs_are_neutral() {
    let metrics = MarketMetrics {
        funding_rate_8h: Some(f64::NAN),
        oi_change_24h_pct: Some(f64::INFINITY),
        ls_accounts: Some(f64::NEG_INFINITY),
        liq_24h_long_usd: Some(-10.0),
        ..MarketMetrics::default()
    };
    let report = score_alpha(&metrics, &[f64::NAN, 1.0]);
    assert_eq!(report.composite_score, 50);
    assert!(report.reasons.is_empty());
    assert_eq!(report.smart_money.score, 50);
    assert_eq!(report.smart_money.delta_long_share_pp, None);
}

#[test]
fn test_custom_params() {
    let params = ScoringParams {
        weight_oi: 1.0,
        weight_funding: 0.0,
        weight_ratio: 0.0,
        weight_liquidation: 0.0,
        ..ScoringParams::default()
    };
    let report = score_alpha_with(&params, &oi_only(40.0), &[]).unwrap();
    assert_eq!(report.composite_score, 100);
    assert_eq!(report.label, CompositeLabel::Bullish);

    let bad = ScoringParams {
        ratio_floor: 0.0,
        ..ScoringParams::default()
    };
    assert!(score_alpha_with(&bad, &oi_only(40.0), &[]).is_err());
}

// ============================================================
// SMART MONEY
// ============================================================

#[test]
fn test_empty_series_contributes_nothing() {
    let metrics = oi_only(20.0);
    let empty = score_alpha(&metrics, &[]).smart_money;
    let single = score_alpha(&metrics, &[2.0]).smart_money;
    assert_eq!(empty.delta_long_share_pp, None);
    assert_eq!(empty.components.share_norm, 0.0);
    // 50 + 0.6·25
    assert_eq!(empty.score, 65);
    assert_eq!(empty.label, FlowLabel::Inflow);
    assert_eq!(empty, single);
}

#[test]
fn test_falling_long_share_is_outflow() {
    let flow = score_alpha(&MarketMetrics::default(), &[3.0, 2.0, 1.0, 0.5]).smart_money;
    let delta = flow.delta_long_share_pp.unwrap();
    // 0.75 → 1/3
    assert!((delta + 125.0 / 3.0).abs() < 1e-9);
    // Clamped to -20pp → -50, weighted 0.4
    assert_eq!(flow.score, 30);
    assert_eq!(flow.label, FlowLabel::Outflow);
    assert!(flow.reasons[0].starts_with("Top-trader long share ↓41.7"));
}

// ============================================================
// SOURCES
// ============================================================

struct Provider {
    name: &'static str,
    funding: Option<f64>,
    oi: OpenInterest,
    ls: LongShort,
    liq: Liquidations,
    series: Vec<f64>,
}

impl MetricsSource for Provider {
    fn name(&self) -> &str {
        self.name
    }
    fn funding_rate(&self, _: &str) -> Option<f64> {
        self.funding
    }
    fn open_interest(&self, _: &str) -> OpenInterest {
        self.oi
    }
    fn long_short(&self, _: &str) -> LongShort {
        self.ls
    }
    fn liquidations(&self, _: &str) -> Liquidations {
        self.liq
    }
    fn top_trader_series(&self, _: &str) -> Vec<f64> {
        self.series.clone()
    }
}

#[test]
fn test_fallback_then_score() {
    let primary = Provider {
        name: "primary",
        funding: None,
        oi: OpenInterest::default(),
        ls: LongShort::default(),
        liq: Liquidations::default(),
        series: Vec::new(),
    };
    let fallback = Provider {
        name: "fallback",
        funding: Some(-0.01),
        oi: OpenInterest::from_history(&[1_000.0, 1_050.0, 1_200.0]),
        ls: LongShort {
            accounts: Some(0.8),
            positions: Some(0.9),
        },
        liq: Liquidations::from_totals(2_000.0, 10_000.0),
        series: vec![1.0, 1.5],
    };

    let (metrics, series) = collect_metrics(&[&primary, &fallback], "btc/usdt");
    assert_eq!(metrics.funding_rate_8h, Some(-0.01));
    assert_eq!(metrics.oi_level, Some(1_200.0));
    assert_eq!(series, vec![1.0, 1.5]);

    let report = score_alpha(&metrics, &series);
    assert_eq!(report.components.funding_bias, FundingBias::BearishCrowded);
    assert!(report.composite_score > 50);
    assert_eq!(report.smart_money.components.liq_adj, 5.0);
}

#[test]
fn test_report_json() {
    let report = score_alpha(&oi_only(-30.0), &[1.0, 1.1]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["label"], "BEARISH");
    assert!(json["composite_score"].is_u64());
    assert_eq!(json["smart_money"]["components"]["funding_bias"], "neutral");
    assert!(json["smart_money"]["delta_long_share_pp"].is_f64());
}
