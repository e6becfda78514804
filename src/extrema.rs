//! Local extremum detection
//!
//! An index is a peak of order `n` when its value is strictly greater than
//! each of the `n` values on both sides (trough: strictly smaller). Indices
//! closer than `n` bars to either end are never extrema.

use serde::Serialize;

use crate::{Period, OHLCV};

/// Default neighbourhood for whole-series extrema
pub const DEFAULT_ORDER: Period = Period::new_const(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtremumKind {
    Peak,
    Trough,
}

impl ExtremumKind {
    #[inline]
    fn dominates(self, candidate: f64, neighbour: f64) -> bool {
        match self {
            ExtremumKind::Peak => candidate > neighbour,
            ExtremumKind::Trough => candidate < neighbour,
        }
    }
}

/// Extremum position with the price it was found at
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremum {
    pub index: usize,
    pub price: f64,
    pub kind: ExtremumKind,
}

/// Indices of strict local extrema, ascending.
///
/// Non-finite values are never extrema and never dominated, so a NaN only
/// removes the candidates whose neighbourhood contains it.
pub fn find_extrema(series: &[f64], order: Period, kind: ExtremumKind) -> Vec<usize> {
    let n = order.get();
    let len = series.len();
    if len < 2 * n + 1 {
        return Vec::new();
    }

    (n..len - n)
        .filter(|&i| {
            let v = series[i];
            v.is_finite()
                && (1..=n).all(|k| {
                    let (left, right) = (series[i - k], series[i + k]);
                    left.is_finite()
                        && right.is_finite()
                        && kind.dominates(v, left)
                        && kind.dominates(v, right)
                })
        })
        .collect()
}

/// Peaks of the `high` series
pub fn find_peaks<T: OHLCV>(bars: &[T], order: Period) -> Vec<Extremum> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();
    find_extrema(&highs, order, ExtremumKind::Peak)
        .into_iter()
        .map(|index| Extremum {
            index,
            price: highs[index],
            kind: ExtremumKind::Peak,
        })
        .collect()
}

/// Troughs of the `low` series
pub fn find_troughs<T: OHLCV>(bars: &[T], order: Period) -> Vec<Extremum> {
    let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();
    find_extrema(&lows, order, ExtremumKind::Trough)
        .into_iter()
        .map(|index| Extremum {
            index,
            price: lows[index],
            kind: ExtremumKind::Trough,
        })
        .collect()
}
