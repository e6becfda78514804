//! Reversal formations built from local extrema
//!
//! Families: Double Tops, Double Bottoms, Triple Tops, Triple Bottoms,
//! Head & Shoulders, Inv H&S, Dragon, Adam & Eve.
//!
//! All matchers here run over the whole series: extrema of `high` (peaks) or
//! `low` (troughs) are found once, then consecutive extrema are compared.

use super::helpers::{self, period, rel_diff, DEFAULT_THRESHOLD, MIN_EXTREMA_GAP};
use crate::{
    extrema::{find_peaks, find_troughs, Extremum, DEFAULT_ORDER},
    params::PatternParams,
    Detection, DetectionKind, PatternError, PatternFamily, PatternMatcher, Period, Ratio, Result,
    OHLCV,
};

impl_with_defaults!(
    DoubleTopMatcher,
    DoubleBottomMatcher,
    TripleTopMatcher,
    TripleBottomMatcher,
    HeadAndShouldersMatcher,
    InverseHeadAndShouldersMatcher,
    DragonMatcher,
    AdamAndEveMatcher,
);

fn check_threshold(threshold: Ratio) -> Result<()> {
    if threshold.get() <= 0.0 {
        return Err(PatternError::InvalidConfig(
            "threshold must be > 0".to_string(),
        ));
    }
    Ok(())
}

// ============================================================
// DOUBLE TOP / BOTTOM
// ============================================================

/// Two consecutive extrema at nearly the same price, at least `min_gap` bars apart
fn paired_extrema(
    points: &[Extremum],
    threshold: Ratio,
    min_gap: usize,
    kind: DetectionKind,
    roles: (&'static str, &'static str),
) -> Vec<Detection> {
    points
        .windows(2)
        .filter_map(|w| {
            let (first, second) = (w[0], w[1]);
            let difference = rel_diff(first.price, second.price)?;
            (difference < threshold.get() && second.index - first.index >= min_gap).then(|| {
                Detection::new(kind)
                    .anchor(roles.0, first.index)
                    .anchor(roles.1, second.index)
                    .measure("price", first.price)
                    .measure("difference", difference)
            })
        })
        .collect()
}

/// Double Top: two peaks within `threshold` of each other
#[derive(Debug, Clone)]
pub struct DoubleTopMatcher {
    pub threshold: Ratio,
    pub order: Period,
    pub min_gap: usize,
}

impl Default for DoubleTopMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
            min_gap: MIN_EXTREMA_GAP,
        }
    }
}

impl PatternMatcher for DoubleTopMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::DoubleTops
    }

    fn min_bars(&self) -> usize {
        10
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let peaks = find_peaks(bars, self.order);
        Ok(paired_extrema(
            &peaks,
            self.threshold,
            self.min_gap,
            DetectionKind::DoubleTop,
            ("first_top", "second_top"),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

/// Double Bottom: two troughs within `threshold` of each other
#[derive(Debug, Clone)]
pub struct DoubleBottomMatcher {
    pub threshold: Ratio,
    pub order: Period,
    pub min_gap: usize,
}

impl Default for DoubleBottomMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
            min_gap: MIN_EXTREMA_GAP,
        }
    }
}

impl PatternMatcher for DoubleBottomMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::DoubleBottoms
    }

    fn min_bars(&self) -> usize {
        10
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let troughs = find_troughs(bars, self.order);
        Ok(paired_extrema(
            &troughs,
            self.threshold,
            self.min_gap,
            DetectionKind::DoubleBottom,
            ("first_bottom", "second_bottom"),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

// ============================================================
// TRIPLE TOP / BOTTOM
// ============================================================

/// Three consecutive extrema, every pair within `threshold`
fn triple_extrema(points: &[Extremum], threshold: Ratio, kind: DetectionKind) -> Vec<Detection> {
    let t = threshold.get();
    points
        .windows(3)
        .filter_map(|w| {
            let (a, b, c) = (w[0].price, w[1].price, w[2].price);
            let within = rel_diff(a, b)? < t && rel_diff(b, c)? < t && rel_diff(a, c)? < t;
            within.then(|| {
                Detection::new(kind)
                    .anchor("first", w[0].index)
                    .anchor("second", w[1].index)
                    .anchor("third", w[2].index)
                    .measure("price", (a + b + c) / 3.0)
            })
        })
        .collect()
}

/// Triple Top: three peaks at nearly the same price
#[derive(Debug, Clone)]
pub struct TripleTopMatcher {
    pub threshold: Ratio,
    pub order: Period,
}

impl Default for TripleTopMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
        }
    }
}

impl PatternMatcher for TripleTopMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::TripleTops
    }

    fn min_bars(&self) -> usize {
        15
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let peaks = find_peaks(bars, self.order);
        Ok(triple_extrema(&peaks, self.threshold, DetectionKind::TripleTop))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

/// Triple Bottom: three troughs at nearly the same price
#[derive(Debug, Clone)]
pub struct TripleBottomMatcher {
    pub threshold: Ratio,
    pub order: Period,
}

impl Default for TripleBottomMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
        }
    }
}

impl PatternMatcher for TripleBottomMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::TripleBottoms
    }

    fn min_bars(&self) -> usize {
        15
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let troughs = find_troughs(bars, self.order);
        Ok(triple_extrema(&troughs, self.threshold, DetectionKind::TripleBottom))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

// ============================================================
// HEAD & SHOULDERS
// ============================================================

/// Middle extremum beyond both neighbours, shoulders level, both legs `min_gap` wide.
///
/// `head_beyond(head, shoulder)` is `>` for tops and `<` for the inverse form.
fn head_and_shoulders(
    points: &[Extremum],
    threshold: Ratio,
    min_gap: usize,
    kind: DetectionKind,
    head_beyond: fn(f64, f64) -> bool,
) -> Vec<Detection> {
    points
        .windows(3)
        .filter_map(|w| {
            let (left, head, right) = (w[0], w[1], w[2]);
            if !(head_beyond(head.price, left.price) && head_beyond(head.price, right.price)) {
                return None;
            }
            let shoulder_diff = rel_diff(left.price, right.price)?;
            let spaced = head.index - left.index >= min_gap && right.index - head.index >= min_gap;
            (shoulder_diff < threshold.get() && spaced).then(|| {
                Detection::new(kind)
                    .anchor("left_shoulder", left.index)
                    .anchor("head", head.index)
                    .anchor("right_shoulder", right.index)
                    .measure("shoulder_price", (left.price + right.price) / 2.0)
            })
        })
        .collect()
}

/// Head & Shoulders: three peaks, the middle one strictly highest
#[derive(Debug, Clone)]
pub struct HeadAndShouldersMatcher {
    pub threshold: Ratio,
    pub order: Period,
    pub min_gap: usize,
}

impl Default for HeadAndShouldersMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
            min_gap: MIN_EXTREMA_GAP,
        }
    }
}

impl PatternMatcher for HeadAndShouldersMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::HeadAndShoulders
    }

    fn min_bars(&self) -> usize {
        15
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let peaks = find_peaks(bars, self.order);
        Ok(head_and_shoulders(
            &peaks,
            self.threshold,
            self.min_gap,
            DetectionKind::HeadAndShoulders,
            |head, shoulder| head > shoulder,
        ))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

/// Inverse Head & Shoulders: three troughs, the middle one strictly lowest
#[derive(Debug, Clone)]
pub struct InverseHeadAndShouldersMatcher {
    pub threshold: Ratio,
    pub order: Period,
    pub min_gap: usize,
}

impl Default for InverseHeadAndShouldersMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: DEFAULT_ORDER,
            min_gap: MIN_EXTREMA_GAP,
        }
    }
}

impl PatternMatcher for InverseHeadAndShouldersMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::InverseHeadAndShoulders
    }

    fn min_bars(&self) -> usize {
        15
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let troughs = find_troughs(bars, self.order);
        Ok(head_and_shoulders(
            &troughs,
            self.threshold,
            self.min_gap,
            DetectionKind::InverseHeadAndShoulders,
            |head, shoulder| head < shoulder,
        ))
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}

// ============================================================
// DRAGON
// ============================================================

/// Dragon: three troughs, each no more than 2% under the previous one
#[derive(Debug, Clone)]
pub struct DragonMatcher {
    pub order: Period,
    /// Each trough must exceed `floor_factor` × the previous one
    pub floor_factor: f64,
}

impl Default for DragonMatcher {
    fn default() -> Self {
        Self {
            order: period(4),
            floor_factor: 0.98,
        }
    }
}

impl PatternMatcher for DragonMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Dragon
    }

    fn min_bars(&self) -> usize {
        20
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let troughs = find_troughs(bars, self.order);
        let f = self.floor_factor;
        Ok(troughs
            .windows(3)
            .filter(|w| w[1].price > w[0].price * f && w[2].price > w[1].price * f)
            .map(|w| {
                Detection::new(DetectionKind::Dragon)
                    .anchor("first", w[0].index)
                    .anchor("second", w[1].index)
                    .anchor("third", w[2].index)
            })
            .collect())
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.floor_factor.is_finite() && self.floor_factor > 0.0) {
            return Err(PatternError::InvalidConfig(
                "floor_factor must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    fn tune(&mut self, params: &PatternParams) {
        self.order = params.order.unwrap_or(self.order);
    }
}

// ============================================================
// ADAM & EVE
// ============================================================

/// Adam & Eve: a sharp trough followed by a rounded one at nearly the same price
#[derive(Debug, Clone)]
pub struct AdamAndEveMatcher {
    pub threshold: Ratio,
    pub order: Period,
    /// Bars each side of the second trough used for the curvature fit
    pub eve_radius: usize,
}

impl Default for AdamAndEveMatcher {
    fn default() -> Self {
        Self {
            threshold: Ratio::new_const(0.03),
            order: DEFAULT_ORDER,
            eve_radius: 5,
        }
    }
}

impl PatternMatcher for AdamAndEveMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::AdamAndEve
    }

    fn min_bars(&self) -> usize {
        20
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        let lows = helpers::lows(bars);
        let troughs = find_troughs(bars, self.order);
        let mut out = Vec::new();

        for w in troughs.windows(2) {
            let (adam, eve) = (w[0], w[1]);

            // Adam needs bars on both sides to read as a V
            if adam.index == 0 || adam.index + 1 >= bars.len() {
                continue;
            }

            let lo = eve.index.saturating_sub(self.eve_radius);
            let hi = (eve.index + self.eve_radius + 1).min(bars.len());
            let segment = &lows[lo..hi];
            if segment.len() < 5 || !helpers::window_is_sound(&bars[lo..hi]) {
                continue;
            }

            let Some(curvature) = helpers::quadratic_curvature(segment) else {
                continue;
            };
            let Some(difference) = rel_diff(adam.price, eve.price) else {
                continue;
            };

            if curvature > 0.0 && difference < self.threshold.get() {
                out.push(
                    Detection::new(DetectionKind::AdamAndEveDoubleBottom)
                        .anchor("adam", adam.index)
                        .anchor("eve", eve.index)
                        .measure("difference", difference)
                        .measure("curvature", curvature),
                );
            }
        }

        Ok(out)
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)?;
        if self.eve_radius < 2 {
            return Err(PatternError::InvalidConfig(
                "eve_radius must be >= 2".to_string(),
            ));
        }
        Ok(())
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}
