//! Candlestick formation scenarios.

use chartsense::prelude::{
    BearishEngulfingMatcher, BullishEngulfingMatcher, Candle, DarkCloudCoverMatcher, DetectionKind,
    Direction, DojiMatcher, EngineBuilder, EveningStarMatcher, HammerMatcher, HaramiMatcher,
    MorningStarMatcher, PatternFamily, PatternMatcher, PiercingMatcher,
    ShootingStarMatcher, ThreeBlackCrowsMatcher, ThreeWhiteSoldiersMatcher, TweezerMatcher,
};

fn c(o: f64, h: f64, l: f64, cl: f64) -> Candle {
    Candle::new(0, o, h, l, cl, 1.0)
}

fn kinds<M: PatternMatcher>(m: &M, bars: &[Candle]) -> Vec<DetectionKind> {
    m.scan(bars).unwrap().iter().map(|d| d.kind()).collect()
}

// ============================================================
// SINGLE BAR
// ============================================================

#[test]
fn test_flat_candle_is_ignored() {
    let bars = vec![c(100.0, 100.0, 100.0, 100.0); 3];
    assert!(HammerMatcher::with_defaults().scan(&bars).unwrap().is_empty());
    assert!(DojiMatcher::with_defaults().scan(&bars).unwrap().is_empty());
    assert!(ShootingStarMatcher::with_defaults().scan(&bars).unwrap().is_empty());

    let map = EngineBuilder::new()
        .with_candlestick_defaults()
        .build()
        .unwrap()
        .scan(&bars)
        .unwrap();
    assert_eq!(map.total(), 0);
    assert_eq!(map.skipped().count(), 0);
}

#[test]
fn test_doji_variants() {
    let bars = vec![
        c(100.0, 110.0, 90.0, 100.5),
        c(109.0, 110.0, 90.0, 109.5),
        c(91.0, 110.0, 90.0, 90.5),
        c(95.0, 110.0, 90.0, 105.0),
    ];
    assert_eq!(
        kinds(&DojiMatcher::with_defaults(), &bars),
        vec![
            DetectionKind::StandardDoji,
            DetectionKind::DragonflyDoji,
            DetectionKind::GravestoneDoji,
        ]
    );
}

#[test]
fn test_hammer_and_inverted_hammer() {
    let bars = vec![c(100.0, 101.1, 94.0, 101.0), c(100.0, 106.0, 99.95, 101.0)];
    let found = HammerMatcher::with_defaults().scan(&bars).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].kind(), DetectionKind::Hammer);
    assert_eq!(found[1].kind(), DetectionKind::InvertedHammer);
    assert!((found[0].value_of("strength").unwrap() - 6.0).abs() < 1e-9);
}

// ============================================================
// TWO BAR
// ============================================================

#[test]
fn test_engulfing_pair() {
    let bull = vec![c(102.0, 103.0, 99.0, 100.0), c(99.5, 104.0, 99.0, 103.0)];
    assert_eq!(
        kinds(&BullishEngulfingMatcher, &bull),
        vec![DetectionKind::BullishEngulfing]
    );
    assert!(BearishEngulfingMatcher.scan(&bull).unwrap().is_empty());

    let bear = vec![c(100.0, 103.0, 99.0, 102.0), c(102.5, 103.5, 98.0, 99.5)];
    assert_eq!(
        kinds(&BearishEngulfingMatcher, &bear),
        vec![DetectionKind::BearishEngulfing]
    );
}

#[test]
fn test_shooting_star() {
    let bars = vec![c(100.0, 102.0, 99.0, 101.5), c(102.0, 106.0, 101.4, 101.5)];
    let found = ShootingStarMatcher::with_defaults().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(1));
}

#[test]
fn test_piercing_and_dark_cloud() {
    let piercing = vec![c(110.0, 111.0, 99.0, 100.0), c(98.0, 108.0, 97.5, 107.0)];
    assert_eq!(
        kinds(&PiercingMatcher, &piercing),
        vec![DetectionKind::PiercingPattern]
    );

    let cloud = vec![c(100.0, 111.0, 99.0, 110.0), c(112.0, 113.0, 102.5, 103.0)];
    assert_eq!(
        kinds(&DarkCloudCoverMatcher, &cloud),
        vec![DetectionKind::DarkCloudCover]
    );
}

#[test]
fn test_tweezers() {
    let top = vec![c(100.0, 105.0, 99.5, 104.0), c(104.0, 105.1, 100.0, 101.0)];
    assert_eq!(
        kinds(&TweezerMatcher::with_defaults(), &top),
        vec![DetectionKind::TweezerTop]
    );

    let bottom = vec![c(104.0, 104.5, 99.0, 100.0), c(100.5, 103.0, 99.1, 102.5)];
    let found = TweezerMatcher::with_defaults().scan(&bottom).unwrap();
    assert_eq!(found[0].kind(), DetectionKind::TweezerBottom);
    assert_eq!(found[0].direction(), Some(Direction::Bullish));
}

#[test]
fn test_harami() {
    let bars = vec![c(110.0, 111.0, 99.0, 100.0), c(103.0, 106.0, 102.0, 105.0)];
    assert_eq!(
        kinds(&HaramiMatcher::with_defaults(), &bars),
        vec![DetectionKind::BullishHarami]
    );
}

// ============================================================
// THREE BAR
// ============================================================

#[test]
fn test_stars() {
    let morning = vec![
        c(110.0, 111.0, 99.0, 100.0),
        c(99.0, 100.0, 97.0, 98.5),
        c(99.0, 108.0, 98.5, 107.0),
    ];
    let found = MorningStarMatcher::with_defaults().scan(&morning).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(2));

    let evening = vec![
        c(100.0, 111.0, 99.0, 110.0),
        c(111.0, 112.0, 110.0, 111.5),
        c(110.0, 110.5, 101.0, 102.0),
    ];
    assert_eq!(
        kinds(&EveningStarMatcher::with_defaults(), &evening),
        vec![DetectionKind::EveningStar]
    );
}

#[test]
fn test_soldiers_and_crows() {
    let soldiers = vec![
        c(100.0, 105.0, 99.5, 104.0),
        c(102.0, 108.0, 101.5, 107.0),
        c(105.0, 111.0, 104.5, 110.0),
    ];
    assert_eq!(
        kinds(&ThreeWhiteSoldiersMatcher, &soldiers),
        vec![DetectionKind::ThreeWhiteSoldiers]
    );
    assert!(ThreeBlackCrowsMatcher.scan(&soldiers).unwrap().is_empty());

    let crows = vec![
        c(110.0, 110.5, 105.0, 106.0),
        c(108.0, 108.5, 103.0, 104.0),
        c(106.0, 106.5, 101.0, 102.0),
    ];
    assert_eq!(
        kinds(&ThreeBlackCrowsMatcher, &crows),
        vec![DetectionKind::ThreeBlackCrows]
    );
}

// ============================================================
// ENGINE
// ============================================================

#[test]
fn test_candlestick_engine_groups_by_family() {
    let bars = vec![
        c(110.0, 111.0, 99.0, 100.0),
        c(99.0, 100.0, 97.0, 98.5),
        c(99.0, 108.0, 98.5, 107.0),
    ];
    let map = EngineBuilder::new()
        .with_candlestick_defaults()
        .build()
        .unwrap()
        .scan(&bars)
        .unwrap();
    assert_eq!(map.family(PatternFamily::MorningStar).len(), 1);
    assert!(map
        .family(PatternFamily::MorningStar)
        .iter()
        .all(|d| d.direction() == Some(Direction::Bullish)));
    assert_eq!(map.len(), 13);
}
