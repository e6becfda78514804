//! Harmonic swing formations
//!
//! Family: ABCD Pattern.

use super::helpers::{period, DEFAULT_THRESHOLD};
use crate::{
    extrema::{find_peaks, find_troughs, Extremum},
    params::PatternParams,
    Detection, DetectionKind, PatternError, PatternFamily, PatternMatcher, Period, Ratio, Result,
    OHLCV,
};

impl_with_defaults!(AbcdMatcher);

/// AB=CD: four alternating swing points whose first and last legs match in length
#[derive(Debug, Clone)]
pub struct AbcdMatcher {
    pub threshold: Ratio,
    pub order: Period,
}

impl Default for AbcdMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            order: period(4),
        }
    }
}

impl PatternMatcher for AbcdMatcher {
    fn family(&self) -> PatternFamily {
        PatternFamily::Abcd
    }

    fn min_bars(&self) -> usize {
        20
    }

    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
        // Peaks precede troughs on the same bar; the sort is stable
        let mut swings: Vec<Extremum> = find_peaks(bars, self.order);
        swings.extend(find_troughs(bars, self.order));
        swings.sort_by_key(|e| e.index);

        let out = swings
            .windows(4)
            .filter_map(|w| {
                let (a, b, c, d) = (w[0], w[1], w[2], w[3]);
                let alternating = a.kind != b.kind && b.kind != c.kind && c.kind != d.kind;
                if !alternating {
                    return None;
                }
                let ab = (b.price - a.price).abs();
                let cd = (d.price - c.price).abs();
                if !(ab > 0.0 && ab.is_finite() && cd.is_finite()) {
                    return None;
                }
                ((ab - cd).abs() / ab < self.threshold.get()).then(|| {
                    Detection::new(DetectionKind::Abcd)
                        .anchor("a", a.index)
                        .anchor("b", b.index)
                        .anchor("c", c.index)
                        .anchor("d", d.index)
                        .measure("ab", ab)
                        .measure("cd", cd)
                })
            })
            .collect();

        Ok(out)
    }

    fn validate_config(&self) -> Result<()> {
        if self.threshold.get() <= 0.0 {
            return Err(PatternError::InvalidConfig(
                "threshold must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn tune(&mut self, params: &PatternParams) {
        self.threshold = params.threshold.unwrap_or(self.threshold);
        self.order = params.order.unwrap_or(self.order);
    }
}
