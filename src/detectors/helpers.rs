//! Shared thresholds and numeric helpers for pattern matchers
//!
//! Regression helpers return `None` on degenerate input (too few points,
//! zero x-variance, non-finite values) so matchers can skip a window without
//! producing an error.

use crate::{Detection, OHLCVExt, PatternError, Period, Ratio, Result, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Relative price tolerance for "equal" extrema
pub const DEFAULT_THRESHOLD: Ratio = Ratio::new_const(0.02);
/// Minimum bar distance between paired extrema
pub const MIN_EXTREMA_GAP: usize = 5;
/// Slopes inside ±FLAT_SLOPE count as horizontal
pub const FLAT_SLOPE: f64 = 0.001;
/// Channel lines are parallel when `|hs - ls| / |hs|` is below this
pub const PARALLEL_TOLERANCE: f64 = 0.3;
/// Leading quadratic coefficient a U-shape must exceed
pub const MIN_CURVATURE: f64 = 1e-5;
/// Pole move (fraction of price) that starts a flag or pennant
pub const POLE_MOVE: f64 = 0.05;
/// Bars in a flag/pennant pole and a dead-cat drop leg
pub const POLE_BARS: usize = 5;

pub(crate) const fn period(n: usize) -> Period {
    Period::new_const(n)
}

// ============================================================
// SERIES EXTRACTION
// ============================================================

#[inline]
pub fn highs<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.high()).collect()
}

#[inline]
pub fn lows<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.low()).collect()
}

#[inline]
pub fn closes<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}

/// Every bar finite with `high >= low`
#[inline]
pub fn window_is_sound<T: OHLCV>(bars: &[T]) -> bool {
    bars.iter().all(|b| b.is_sound())
}

/// Finite prices and a strictly positive range
#[inline]
pub fn candle_is_sound<T: OHLCV>(bar: &T) -> bool {
    bar.is_sound() && bar.range() > 0.0
}

// ============================================================
// REGRESSION
// ============================================================

/// Least-squares slope of `ys` against `0..n`
pub fn linear_slope(ys: &[f64]) -> Option<f64> {
    let n = ys.len();
    if n < 2 || ys.iter().any(|y| !y.is_finite()) {
        return None;
    }
    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    Some(sxy / sxx)
}

/// Least-squares slope through arbitrary `(x, y)` points
pub fn slope_xy(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len();
    if n < 2 || points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return None;
    }
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in points {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    (sxx > 0.0).then(|| sxy / sxx)
}

/// Leading coefficient `a` of the least-squares fit `y = a·x² + b·x + c`, x = `0..n`.
///
/// Computed on centred x, where odd moments vanish:
/// `a = (n·Σt²y − S2·Σy) / (n·S4 − S2²)`.
pub fn quadratic_curvature(ys: &[f64]) -> Option<f64> {
    let n = ys.len();
    if n < 3 || ys.iter().any(|y| !y.is_finite()) {
        return None;
    }
    let mid = (n - 1) as f64 / 2.0;
    let (mut s2, mut s4, mut sy, mut st2y) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let t = i as f64 - mid;
        let t2 = t * t;
        s2 += t2;
        s4 += t2 * t2;
        sy += y;
        st2y += t2 * y;
    }
    let nf = n as f64;
    let denom = nf * s4 - s2 * s2;
    (denom > 0.0).then(|| (nf * st2y - s2 * sy) / denom)
}

// ============================================================
// SLIDING WINDOWS
// ============================================================

/// Evaluate `f(i, &bars[i - window..i])` for every `i` in `window..len`.
///
/// Windows holding a non-finite price or an inverted bar are skipped.
pub fn scan_windows<T, F>(bars: &[T], window: usize, mut f: F) -> Vec<Detection>
where
    T: OHLCV,
    F: FnMut(usize, &[T]) -> Option<Detection>,
{
    if window == 0 || bars.len() < window {
        return Vec::new();
    }
    (window..bars.len())
        .filter_map(|i| {
            let segment = &bars[i - window..i];
            if !window_is_sound(segment) {
                return None;
            }
            f(i, segment)
        })
        .collect()
}

/// Window override for a matcher that needs at least `min` bars.
///
/// Overrides shorter than `min` leave the matcher's own window in place.
pub fn tuned_window(current: Period, window: Option<Period>, min: usize) -> Period {
    window.filter(|w| w.get() >= min).unwrap_or(current)
}

/// Require a minimum window length at configuration time
pub fn check_window(window: Period, min: usize) -> Result<()> {
    if window.get() < min {
        return Err(PatternError::InvalidConfig(format!(
            "window must be >= {min}, got {}",
            window.get()
        )));
    }
    Ok(())
}

// ============================================================
// PRICE COMPARISONS
// ============================================================

/// `|a - b| / a`; `None` when `a` is not a positive finite price
#[inline]
pub fn rel_diff(a: f64, b: f64) -> Option<f64> {
    (a.is_finite() && b.is_finite() && a > 0.0).then(|| (a - b).abs() / a)
}

/// `(to - from) / from`; `None` when `from` is not a positive finite price
#[inline]
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    (from.is_finite() && to.is_finite() && from > 0.0).then(|| (to - from) / from)
}
