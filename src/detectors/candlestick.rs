//! Candlestick formations
//!
//! Families: Hammers, Bullish Engulfing, Bearish Engulfing, Morning Star,
//! Evening Star, Doji, Shooting Star, Piercing Pattern, Dark Cloud,
//! 3 White Soldiers, 3 Black Crows, Tweezers, Harami.
//!
//! Every bar of a candidate group must have finite prices and a positive
//! range; otherwise the group is skipped. Detections anchor `index` at the
//! last bar and, for multi-bar formations, `start` at the first.

#![allow(clippy::default_constructed_unit_structs)]

use super::helpers::{candle_is_sound, rel_diff};
use crate::{
    Detection, DetectionKind, OHLCVExt, PatternError, PatternFamily, PatternMatcher, Result,
    OHLCV,
};

impl_with_defaults!(
    HammerMatcher,
    BullishEngulfingMatcher,
    BearishEngulfingMatcher,
    MorningStarMatcher,
    EveningStarMatcher,
    DojiMatcher,
    ShootingStarMatcher,
    PiercingMatcher,
    DarkCloudCoverMatcher,
    ThreeWhiteSoldiersMatcher,
    ThreeBlackCrowsMatcher,
    TweezerMatcher,
    HaramiMatcher,
);

/// Slide a group of `span` bars ending at each index
fn scan_groups<T, F>(bars: &[T], span: usize, f: F) -> Vec<Detection>
where
    T: OHLCV,
    F: Fn(usize, &[T]) -> Option<DetectionKind>,
{
    if span == 0 || bars.len() < span {
        return Vec::new();
    }
    (span - 1..bars.len())
        .filter_map(|i| {
            let group = &bars[i + 1 - span..=i];
            if !group.iter().all(candle_is_sound) {
                return None;
            }
            let kind = f(i, group)?;
            let d = Detection::new(kind);
            let d = if span > 1 { d.anchor("start", i + 1 - span) } else { d };
            Some(d.anchor("index", i))
        })
        .collect()
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(PatternError::InvalidConfig(format!("{field} must be > 0")));
    }
    Ok(())
}

// ============================================================
// HAMMERS
// ============================================================

/// Hammer / Inverted Hammer: one long shadow, tiny opposite shadow
#[derive(Debug, Clone)]
pub struct HammerMatcher {
    /// Long shadow must exceed `shadow_ratio` × body
    pub shadow_ratio: f64,
    /// Opposite shadow must stay under `max_opposite` × body
    pub max_opposite: f64,
}

impl Default for HammerMatcher {
    fn default() -> Self {
        Self {
            shadow_ratio: 2.0,
            max_opposite: 0.5,
        }
    }
}

impl PatternMatcher for HammerMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Hammers
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let out = bars
            .iter()
            .enumerate()
            .filter(|(_, bar)| candle_is_sound(*bar))
            .filter_map(|(i, bar)| {
                let body = bar.body();
                let upper = bar.upper_shadow();
                let lower = bar.lower_shadow();
                let strength = |shadow: f64| if body > 0.0 { shadow / body } else { 0.0 };

                let (kind, shadow) =
                    if lower > self.shadow_ratio * body && upper < self.max_opposite * body {
                        (DetectionKind::Hammer, lower)
                    } else if upper > self.shadow_ratio * body && lower < self.max_opposite * body {
                        (DetectionKind::InvertedHammer, upper)
                    } else {
                        return None;
                    };

                Some(
                    Detection::new(kind)
                        .anchor("index", i)
                        .measure("strength", strength(shadow)),
                )
            })
            .collect();
        Ok(out)
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_ratio", self.shadow_ratio)?;
        check_positive("max_opposite", self.max_opposite)
    }
}

// ============================================================
// ENGULFING
// ============================================================

/// Bullish Engulfing: bullish body covers the prior bearish body
#[derive(Debug, Clone, Default)]
pub struct BullishEngulfingMatcher;

impl PatternMatcher for BullishEngulfingMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::BullishEngulfing
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let engulfs = curr.open() <= prev.close() && curr.close() >= prev.open();
            (prev.is_bearish() && curr.is_bullish() && engulfs)
                .then_some(DetectionKind::BullishEngulfing)
        }))
    }
}

/// Bearish Engulfing: bearish body covers the prior bullish body
#[derive(Debug, Clone, Default)]
pub struct BearishEngulfingMatcher;

impl PatternMatcher for BearishEngulfingMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::BearishEngulfing
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let engulfs = curr.open() >= prev.close() && curr.close() <= prev.open();
            (prev.is_bullish() && curr.is_bearish() && engulfs)
                .then_some(DetectionKind::BearishEngulfing)
        }))
    }
}

// ============================================================
// STARS
// ============================================================

/// Morning Star: long bearish bar, small star, strong bullish recovery
#[derive(Debug, Clone)]
pub struct MorningStarMatcher {
    /// Star body must be below this fraction of the first body
    pub max_star_body: f64,
    /// Third body must exceed this fraction of the first body
    pub min_third_body: f64,
}

impl Default for MorningStarMatcher {
    fn default() -> Self {
        Self {
            max_star_body: 0.3,
            min_third_body: 0.6,
        }
    }
}

impl PatternMatcher for MorningStarMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::MorningStar
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 3, |_, g| {
            let (first, star, third) = (&g[0], &g[1], &g[2]);
            let fb = first.body();
            (first.is_bearish()
                && star.body() < fb * self.max_star_body
                && third.is_bullish()
                && third.body() > fb * self.min_third_body
                && third.close() > first.body_mid())
            .then_some(DetectionKind::MorningStar)
        }))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("max_star_body", self.max_star_body)?;
        check_positive("min_third_body", self.min_third_body)
    }
}

/// Evening Star: long bullish bar, small star, strong bearish decline
#[derive(Debug, Clone)]
pub struct EveningStarMatcher {
    pub max_star_body: f64,
    pub min_third_body: f64,
}

impl Default for EveningStarMatcher {
    fn default() -> Self {
        Self {
            max_star_body: 0.3,
            min_third_body: 0.6,
        }
    }
}

impl PatternMatcher for EveningStarMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::EveningStar
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 3, |_, g| {
            let (first, star, third) = (&g[0], &g[1], &g[2]);
            let fb = first.body();
            (first.is_bullish()
                && star.body() < fb * self.max_star_body
                && third.is_bearish()
                && third.body() > fb * self.min_third_body
                && third.close() < first.body_mid())
            .then_some(DetectionKind::EveningStar)
        }))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("max_star_body", self.max_star_body)?;
        check_positive("min_third_body", self.min_third_body)
    }
}

// ============================================================
// DOJI
// ============================================================

/// Doji: body under 10% of range, classified by shadow balance
#[derive(Debug, Clone)]
pub struct DojiMatcher {
    pub max_body_ratio: f64,
    /// One shadow must exceed `dominance` × the other for dragonfly/gravestone
    pub dominance: f64,
}

impl Default for DojiMatcher {
    fn default() -> Self {
        Self {
            max_body_ratio: 0.1,
            dominance: 2.0,
        }
    }
}

impl PatternMatcher for DojiMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Doji
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let out = bars
            .iter()
            .enumerate()
            .filter(|(_, bar)| candle_is_sound(*bar))
            .filter_map(|(i, bar)| {
                let ratio = bar.body() / bar.range();
                if ratio >= self.max_body_ratio {
                    return None;
                }
                let (upper, lower) = (bar.upper_shadow(), bar.lower_shadow());
                // Long lower shadow: dragonfly; long upper shadow: gravestone
                let kind = if lower > self.dominance * upper {
                    DetectionKind::DragonflyDoji
                } else if upper > self.dominance * lower {
                    DetectionKind::GravestoneDoji
                } else {
                    DetectionKind::StandardDoji
                };
                Some(Detection::new(kind).anchor("index", i).measure("body_ratio", ratio))
            })
            .collect();
        Ok(out)
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("max_body_ratio", self.max_body_ratio)?;
        check_positive("dominance", self.dominance)
    }
}

// ============================================================
// SHOOTING STAR
// ============================================================

/// Shooting Star: bearish bar with a long upper shadow after a bullish bar
#[derive(Debug, Clone)]
pub struct ShootingStarMatcher {
    pub shadow_ratio: f64,
    pub max_opposite: f64,
}

impl Default for ShootingStarMatcher {
    fn default() -> Self {
        Self {
            shadow_ratio: 2.0,
            max_opposite: 0.5,
        }
    }
}

impl PatternMatcher for ShootingStarMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::ShootingStar
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let body = curr.body();
            (curr.upper_shadow() > self.shadow_ratio * body
                && curr.lower_shadow() < self.max_opposite * body
                && curr.is_bearish()
                && prev.is_bullish())
            .then_some(DetectionKind::ShootingStar)
        }))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_ratio", self.shadow_ratio)?;
        check_positive("max_opposite", self.max_opposite)
    }
}

// ============================================================
// PIERCING / DARK CLOUD
// ============================================================

/// Piercing Pattern: opens under a bearish close, closes past its midpoint
#[derive(Debug, Clone, Default)]
pub struct PiercingMatcher;

impl PatternMatcher for PiercingMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::PiercingPattern
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let pierces = curr.close() > prev.body_mid() && curr.close() < prev.open();
            (prev.is_bearish() && curr.is_bullish() && curr.open() < prev.close() && pierces)
                .then_some(DetectionKind::PiercingPattern)
        }))
    }
}

/// Dark Cloud Cover: opens over a bullish close, closes under its midpoint
#[derive(Debug, Clone, Default)]
pub struct DarkCloudCoverMatcher;

impl PatternMatcher for DarkCloudCoverMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::DarkCloud
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let covers = curr.close() < prev.body_mid() && curr.close() > prev.open();
            (prev.is_bullish() && curr.is_bearish() && curr.open() > prev.close() && covers)
                .then_some(DetectionKind::DarkCloudCover)
        }))
    }
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// 3 White Soldiers: three rising bullish bars, each opening inside the prior body
#[derive(Debug, Clone, Default)]
pub struct ThreeWhiteSoldiersMatcher;

impl PatternMatcher for ThreeWhiteSoldiersMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::ThreeWhiteSoldiers
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 3, |_, g| {
            let all_bullish = g.iter().all(|b| b.is_bullish());
            let higher_closes = g[1].close() > g[0].close() && g[2].close() > g[1].close();
            let opens_within = g.windows(2).all(|w| w[0].open() < w[1].open() && w[1].open() < w[0].close());
            (all_bullish && higher_closes && opens_within).then_some(DetectionKind::ThreeWhiteSoldiers)
        }))
    }
}

/// 3 Black Crows: three falling bearish bars, each opening inside the prior body
#[derive(Debug, Clone, Default)]
pub struct ThreeBlackCrowsMatcher;

impl PatternMatcher for ThreeBlackCrowsMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::ThreeBlackCrows
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 3, |_, g| {
            let all_bearish = g.iter().all(|b| b.is_bearish());
            let lower_closes = g[1].close() < g[0].close() && g[2].close() < g[1].close();
            let opens_within = g.windows(2).all(|w| w[0].close() < w[1].open() && w[1].open() < w[0].open());
            (all_bearish && lower_closes && opens_within).then_some(DetectionKind::ThreeBlackCrows)
        }))
    }
}

// ============================================================
// TWEEZERS
// ============================================================

/// Tweezers: matching highs (top) or lows (bottom) with a colour flip
#[derive(Debug, Clone)]
pub struct TweezerMatcher {
    /// Relative distance under which two extremes count as equal
    pub tolerance: f64,
}

impl Default for TweezerMatcher {
    fn default() -> Self {
        Self { tolerance: 0.002 }
    }
}

impl PatternMatcher for TweezerMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Tweezers
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let t = self.tolerance;
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let same_high = rel_diff(prev.high(), curr.high()).is_some_and(|d| d < t);
            let same_low = rel_diff(prev.low(), curr.low()).is_some_and(|d| d < t);

            if same_high && prev.is_bullish() && curr.is_bearish() {
                Some(DetectionKind::TweezerTop)
            } else if same_low && prev.is_bearish() && curr.is_bullish() {
                Some(DetectionKind::TweezerBottom)
            } else {
                None
            }
        }))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("tolerance", self.tolerance)
    }
}

// ============================================================
// HARAMI
// ============================================================

/// Harami: small opposite-colour body strictly inside the prior body
#[derive(Debug, Clone)]
pub struct HaramiMatcher {
    pub max_body_ratio: f64,
}

impl Default for HaramiMatcher {
    fn default() -> Self {
        Self { max_body_ratio: 0.5 }
    }
}

impl PatternMatcher for HaramiMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Harami
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        Ok(scan_groups(bars, 2, |_, g| {
            let (prev, curr) = (&g[0], &g[1]);
            let inside = curr.body_bottom() > prev.body_bottom() && curr.body_top() < prev.body_top();
            if !inside || curr.body() >= prev.body() * self.max_body_ratio {
                return None;
            }
            if prev.is_bearish() && curr.is_bullish() {
                Some(DetectionKind::BullishHarami)
            } else if prev.is_bullish() && curr.is_bearish() {
                Some(DetectionKind::BearishHarami)
            } else {
                None
            }
        }))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("max_body_ratio", self.max_body_ratio)
    }
}
