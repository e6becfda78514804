//! Integration tests for chart formation detection.
//!
//! These tests drive the public engine API end to end.

use std::collections::HashMap;

use chartsense::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { o, h, l, c }
    }
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

/// Bars whose highs follow `highs`; bodies sit just under each high
fn bars_from_highs(highs: &[f64]) -> Vec<TestBar> {
    highs
        .iter()
        .map(|&h| TestBar::new(h - 1.0, h, h - 2.0, h - 0.5))
        .collect()
}

/// Two equal-ish highs at bars 3 and 15 over a flat 95 base
fn double_top_series() -> Vec<TestBar> {
    let mut highs = vec![95.0; 20];
    highs[3] = 100.0;
    highs[15] = 100.5;
    bars_from_highs(&highs)
}

/// Deterministic wavy series
fn make_wave(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64 * 0.35).sin() * 6.0 + (i as f64 * 0.05);
            TestBar::new(base - 0.4, base + 1.2, base - 1.3, base + 0.3)
        })
        .collect()
}

// ============================================================
// REVERSAL SCENARIOS
// ============================================================

#[test]
fn test_double_top_scenario_through_engine() {
    let bars = double_top_series();
    let engine = EngineBuilder::new()
        .add(BuiltinMatcher::DoubleTop(DoubleTopMatcher {
            order: Period::new(3).unwrap(),
            ..DoubleTopMatcher::with_defaults()
        }))
        .build()
        .unwrap();

    let map = engine.scan(&bars).unwrap();
    let tops = map.get("Double Tops");
    assert_eq!(tops.len(), 1);
    assert_eq!(tops[0].kind(), DetectionKind::DoubleTop);
    assert_eq!(tops[0].index_of("first_top"), Some(3));
    assert_eq!(tops[0].index_of("second_top"), Some(15));
    assert_eq!(tops[0].direction(), Some(Direction::Bearish));
}

#[test]
fn test_double_top_scenario_with_order_override() {
    let bars = double_top_series();
    let params = PatternParams::default().with_order(3).unwrap();
    let map = run_pattern_detection(&bars, Some(&params)).unwrap();

    let tops = map.family(PatternFamily::DoubleTops);
    assert_eq!(tops.len(), 1);
    assert_eq!(tops[0].start_index(), Some(3));
    assert_eq!(tops[0].end_index(), Some(15));
}

#[test]
fn test_threshold_override_rejects_distant_peaks() {
    let mut highs = vec![95.0; 20];
    highs[3] = 100.0;
    highs[15] = 101.5;
    let bars = bars_from_highs(&highs);

    let loose = PatternParams::default().with_order(3).unwrap();
    assert_eq!(
        run_pattern_detection(&bars, Some(&loose)).unwrap().get("Double Tops").len(),
        1
    );

    let strict = loose.with_threshold(0.01).unwrap();
    assert!(run_pattern_detection(&bars, Some(&strict))
        .unwrap()
        .get("Double Tops")
        .is_empty());
}

// ============================================================
// ENGINE API TESTS
// ============================================================

#[test]
fn test_detect_all_covers_every_family_in_order() {
    let bars = make_wave(120);
    let map = detect_all(&bars);
    let names: Vec<_> = map.entries().iter().map(|e| e.name).collect();
    let expected: Vec<_> = PatternFamily::ALL.iter().map(|f| f.name()).collect();
    assert_eq!(names, expected);
    assert_eq!(map.skipped().count(), 0);
}

#[test]
fn test_chart_and_candlestick_defaults_partition_families() {
    let chart = EngineBuilder::new().with_chart_defaults().build().unwrap();
    let candles = EngineBuilder::new().with_candlestick_defaults().build().unwrap();
    assert_eq!(chart.families().len() + candles.families().len(), PatternFamily::ALL.len());
    assert!(candles.families().contains(&"Doji"));
    assert!(!chart.families().contains(&"Doji"));
}

#[test]
fn test_detection_is_idempotent() {
    let bars = make_wave(200);
    let engine = PatternEngine::with_defaults();
    assert_eq!(engine.scan(&bars).unwrap(), engine.scan(&bars).unwrap());
}

#[test]
fn test_detections_in_ascending_order() {
    let bars = make_wave(300);
    for (family, detections) in detect_all(&bars).found() {
        let starts: Vec<_> = detections.iter().map(|d| d.start_index()).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted, "{family} not in scan order");
    }
}

#[test]
fn test_family_filter() {
    let bars = make_wave(60);
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .only_families(["Doji", "Harami"])
        .build()
        .unwrap();
    let map = engine.scan(&bars).unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.outcome("Double Tops").is_none());
}

#[test]
fn test_parallel_scan() {
    let a = make_wave(80);
    let b = double_top_series();
    let engine = PatternEngine::with_defaults();

    let (ok, errors) = scan_parallel(&engine, vec![("AAA", &a[..]), ("BBB", &b[..])]);
    assert!(errors.is_empty());
    assert_eq!(ok.len(), 2);
    for r in &ok {
        let serial = engine.scan(if r.symbol == "AAA" { &a } else { &b }).unwrap();
        assert_eq!(r.patterns, serial);
    }
}

// ============================================================
// EDGE CASES
// ============================================================

#[test]
fn test_empty_bars() {
    let map = detect_all::<TestBar>(&[]);
    assert_eq!(map.len(), PatternFamily::ALL.len());
    assert_eq!(map.total(), 0);
    assert_eq!(map.skipped().count(), PatternFamily::ALL.len());
}

#[test]
fn test_short_series_skips_only_long_matchers() {
    let bars = make_wave(5);
    let map = detect_all(&bars);
    assert!(matches!(
        map.outcome("Double Tops").and_then(|o| o.skip_reason()),
        Some(SkipReason::InsufficientData { need: 10, got: 5 })
    ));
    assert!(map.outcome("Doji").and_then(|o| o.skip_reason()).is_none());
}

#[test]
fn test_nan_bar_isolated_in_lenient_mode() {
    let mut bars = make_wave(120);
    bars[60] = TestBar::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    let map = detect_all(&bars);
    assert_eq!(map.skipped().count(), 0);
    // Candle groups touching the bad bar are dropped
    for family in PatternFamily::ALL.iter().filter(|f| f.is_candlestick()) {
        for d in map.family(*family) {
            assert!(d.anchors().iter().all(|a| a.index != 60), "{}", family.name());
            assert!(d.start_index() > Some(60) || d.end_index() < Some(60));
        }
    }
}

#[test]
fn test_strict_mode_rejects_malformed_bar() {
    let mut bars = make_wave(30);
    bars[7] = TestBar::new(100.0, 99.0, 101.0, 100.0);
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .validate_data(true)
        .build()
        .unwrap();
    assert!(matches!(
        engine.scan(&bars),
        Err(PatternError::InvalidOHLCV { index: 7, .. })
    ));
}

#[test]
fn test_short_window_override_runs_every_family() {
    let bars = make_wave(12);
    for window in 3..=7 {
        let params = PatternParams::default().with_window(window).unwrap();
        let map = run_pattern_detection(&bars, Some(&params)).unwrap();
        assert_eq!(map.len(), PatternFamily::ALL.len(), "window {window}");

        // Pivot wedges keep their 15-bar window, the triangle takes the override
        assert!(matches!(
            map.outcome("Rising Wedge").and_then(|o| o.skip_reason()),
            Some(SkipReason::InsufficientData { need: 15, got: 12 })
        ));
        assert!(map.outcome("Triangles").and_then(|o| o.skip_reason()).is_none());
    }
}

#[test]
fn test_invalid_params_rejected() {
    let raw: HashMap<&str, f64> = [("window", 0.0)].into_iter().collect();
    assert!(PatternParams::from_map(&raw).is_err());

    let raw: HashMap<&str, f64> = [("lookback", 3.0)].into_iter().collect();
    assert!(matches!(
        PatternParams::from_map(&raw),
        Err(PatternError::InvalidConfig(_))
    ));

    assert!(PatternParams::default().with_threshold(1.5).is_err());
}

// ============================================================
// CUSTOM MATCHER TEST
// ============================================================

/// Flags every bar that closes at its high
struct CloseAtHigh;

impl DynPatternMatcher for CloseAtHigh {
    fn name(&self) -> &'static str {
        "Close At High"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn scan(&self, bars: &[&dyn OHLCV]) -> Result<Vec<Detection>> {
        Ok(bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.close() == b.high())
            .map(|(i, _)| Detection::new(DetectionKind::Custom("close_at_high")).anchor("index", i))
            .collect())
    }

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_custom_matcher() {
    let bars = vec![
        TestBar::new(100.0, 102.0, 99.0, 101.0),
        TestBar::new(101.0, 103.0, 100.5, 103.0),
    ];
    let engine = EngineBuilder::new().add_custom(CloseAtHigh).build().unwrap();
    let map = engine.scan(&bars).unwrap();
    let found = map.get("Close At High");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].index_of("index"), Some(1));
    assert_eq!(found[0].kind().as_str(), "close_at_high");
}

// ============================================================
// SERIALIZATION
// ============================================================

#[test]
fn test_pattern_map_json() {
    let bars = double_top_series();
    let params = PatternParams::default().with_order(3).unwrap();
    let map = run_pattern_detection(&bars, Some(&params)).unwrap();
    let json = serde_json::to_value(&map).unwrap();
    let text = json.to_string();
    assert!(text.contains("\"double_top\""));
    assert!(text.contains("\"first_top\""));
    assert!(text.contains("\"skipped\"") || text.contains("\"detected\""));
}
