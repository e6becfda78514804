//! Trend-line geometry over sliding windows
//!
//! Families: Triangles, Ascending Wedge, Descending Wedge, Rising Wedge,
//! Falling Wedge, Channels, Rectangle, Megaphone, Bump & Run.
//!
//! Each matcher slides a window of `window` bars; the window for bar `i`
//! covers `[i - window, i)` and detections anchor `start = i - window` and
//! `index = i`.

use super::helpers::{
  self, check_window, closes, highs, linear_slope, lows, period, rel_diff, scan_windows,
  slope_xy, tuned_window, DEFAULT_THRESHOLD, FLAT_SLOPE, PARALLEL_TOLERANCE,
};
use crate::{
  extrema::{find_peaks, find_troughs, Extremum},
  params::PatternParams,
  Detection, DetectionKind, PatternError, PatternFamily, PatternMatcher, Period, Ratio, Result,
  OHLCV,
};

impl_with_defaults!(
  TriangleMatcher,
  AscendingWedgeMatcher,
  DescendingWedgeMatcher,
  RisingWedgeMatcher,
  FallingWedgeMatcher,
  ChannelMatcher,
  RectangleMatcher,
  MegaphoneMatcher,
  BumpAndRunMatcher,
);

/// Regression slopes of window highs and lows
fn band_slopes<T: OHLCV>(segment: &[T]) -> Option<(f64, f64)> {
  Some((linear_slope(&highs(segment))?, linear_slope(&lows(segment))?))
}

fn windowed(kind: DetectionKind, i: usize, window: usize) -> Detection {
  Detection::new(kind).anchor("start", i - window).anchor("index", i)
}

// ============================================================
// TRIANGLES
// ============================================================

/// Triangles: converging or flat-topped/bottomed trend lines
#[derive(Debug, Clone)]
pub struct TriangleMatcher {
  pub window: Period,
  /// Slopes inside ±flat_slope count as horizontal
  pub flat_slope: f64,
}

impl Default for TriangleMatcher {
  fn default() -> Self {
    Self { window: period(20), flat_slope: FLAT_SLOPE }
  }
}

impl TriangleMatcher {
  fn classify(&self, hs: f64, ls: f64) -> Option<DetectionKind> {
    let flat = self.flat_slope;
    if hs.abs() < flat && ls > flat {
      Some(DetectionKind::AscendingTriangle)
    } else if hs < -flat && ls.abs() < flat {
      Some(DetectionKind::DescendingTriangle)
    } else if hs < -flat && ls > flat {
      Some(DetectionKind::SymmetricTriangle)
    } else {
      None
    }
  }
}

impl PatternMatcher for TriangleMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Triangles
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let (hs, ls) = band_slopes(seg)?;
      let kind = self.classify(hs, ls)?;
      Some(windowed(kind, i, w).measure("high_slope", hs).measure("low_slope", ls))
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)?;
    if !(self.flat_slope.is_finite() && self.flat_slope >= 0.0) {
      return Err(PatternError::InvalidConfig("flat_slope must be >= 0".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// WEDGES (band regression)
// ============================================================

/// Ascending Wedge: both bands rising, upper line rising less than twice the lower
#[derive(Debug, Clone)]
pub struct AscendingWedgeMatcher {
  pub window: Period,
}

impl Default for AscendingWedgeMatcher {
  fn default() -> Self {
    Self { window: period(15) }
  }
}

impl PatternMatcher for AscendingWedgeMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::AscendingWedge
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let (hs, ls) = band_slopes(seg)?;
      (hs > 0.0 && ls > 0.0 && hs < ls * 2.0).then(|| {
        windowed(DetectionKind::AscendingWedge, i, w)
          .measure("high_slope", hs)
          .measure("low_slope", ls)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

/// Descending Wedge: both bands falling, lower line falling more than twice the upper
#[derive(Debug, Clone)]
pub struct DescendingWedgeMatcher {
  pub window: Period,
}

impl Default for DescendingWedgeMatcher {
  fn default() -> Self {
    Self { window: period(15) }
  }
}

impl PatternMatcher for DescendingWedgeMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::DescendingWedge
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let (hs, ls) = band_slopes(seg)?;
      (hs < 0.0 && ls < 0.0 && ls < hs * 2.0).then(|| {
        windowed(DetectionKind::DescendingWedge, i, w)
          .measure("high_slope", hs)
          .measure("low_slope", ls)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// WEDGES (pivot regression)
// ============================================================

fn pivot_line(points: &[Extremum]) -> Option<f64> {
  let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.index as f64, p.price)).collect();
  slope_xy(&xy)
}

/// Slopes through the peaks and the troughs found inside one window
fn pivot_slopes<T: OHLCV>(segment: &[T], order: Period) -> Option<(f64, f64)> {
  let peaks = find_peaks(segment, order);
  let troughs = find_troughs(segment, order);
  if peaks.len() < 2 || troughs.len() < 2 {
    return None;
  }
  Some((pivot_line(&peaks)?, pivot_line(&troughs)?))
}

/// Rising Wedge: peaks and troughs both rising, troughs rising faster
#[derive(Debug, Clone)]
pub struct RisingWedgeMatcher {
  pub window: Period,
  /// Extremum order used inside each window
  pub pivot_order: Period,
}

impl Default for RisingWedgeMatcher {
  fn default() -> Self {
    Self { window: period(15), pivot_order: period(3) }
  }
}

impl PatternMatcher for RisingWedgeMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::RisingWedge
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let (ps, ts) = pivot_slopes(seg, self.pivot_order)?;
      (ps > 0.0 && ts > 0.0 && ts > ps).then(|| {
        windowed(DetectionKind::RisingWedge, i, w)
          .measure("peak_slope", ps)
          .measure("trough_slope", ts)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2 * self.pivot_order.get() + 1)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = tuned_window(self.window, params.window, 2 * self.pivot_order.get() + 1);
  }
}

/// Falling Wedge: peaks and troughs both falling, peaks falling faster
#[derive(Debug, Clone)]
pub struct FallingWedgeMatcher {
  pub window: Period,
  pub pivot_order: Period,
}

impl Default for FallingWedgeMatcher {
  fn default() -> Self {
    Self { window: period(15), pivot_order: period(3) }
  }
}

impl PatternMatcher for FallingWedgeMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::FallingWedge
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let (ps, ts) = pivot_slopes(seg, self.pivot_order)?;
      (ps < 0.0 && ts < 0.0 && ps < ts).then(|| {
        windowed(DetectionKind::FallingWedge, i, w)
          .measure("peak_slope", ps)
          .measure("trough_slope", ts)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2 * self.pivot_order.get() + 1)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = tuned_window(self.window, params.window, 2 * self.pivot_order.get() + 1);
  }
}

// ============================================================
// CHANNELS
// ============================================================

/// Channels: parallel band lines sloping the same way
#[derive(Debug, Clone)]
pub struct ChannelMatcher {
  pub window: Period,
  pub parallel_tolerance: f64,
  pub flat_slope: f64,
}

impl Default for ChannelMatcher {
  fn default() -> Self {
    Self { window: period(20), parallel_tolerance: PARALLEL_TOLERANCE, flat_slope: FLAT_SLOPE }
  }
}

impl PatternMatcher for ChannelMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Channels
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    let flat = self.flat_slope;
    Ok(scan_windows(bars, w, |i, seg| {
      let (hs, ls) = band_slopes(seg)?;
      let slope_diff = if hs != 0.0 { (hs - ls).abs() / hs.abs() } else { 1.0 };
      if slope_diff >= self.parallel_tolerance {
        return None;
      }
      let kind = if hs > flat && ls > flat {
        DetectionKind::AscendingChannel
      } else if hs < -flat && ls < -flat {
        DetectionKind::DescendingChannel
      } else {
        return None;
      };
      Some(windowed(kind, i, w).measure("high_slope", hs).measure("low_slope", ls))
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)?;
    if !(self.parallel_tolerance > 0.0 && self.parallel_tolerance.is_finite()) {
      return Err(PatternError::InvalidConfig("parallel_tolerance must be > 0".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// RECTANGLE
// ============================================================

/// Rectangle: repeated touches of a flat resistance and support
#[derive(Debug, Clone)]
pub struct RectangleMatcher {
  pub window: Period,
  /// Relative distance that counts as a touch
  pub threshold: Ratio,
  pub min_touches: usize,
  /// Accepted `(resistance - support) / support`, exclusive bounds
  pub height_bounds: (f64, f64),
}

impl Default for RectangleMatcher {
  fn default() -> Self {
    Self {
      window: period(20),
      threshold: DEFAULT_THRESHOLD,
      min_touches: 2,
      height_bounds: (0.03, 0.15),
    }
  }
}

impl PatternMatcher for RectangleMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Rectangle
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    let t = self.threshold.get();
    Ok(scan_windows(bars, w, |i, seg| {
      let hi = highs(seg);
      let lo = lows(seg);
      let resistance = hi.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      let support = lo.iter().copied().fold(f64::INFINITY, f64::min);

      let resistance_touches =
        hi.iter().filter(|&&h| rel_diff(resistance, h).is_some_and(|d| d < t)).count();
      let support_touches =
        lo.iter().filter(|&&l| rel_diff(support, l).is_some_and(|d| d < t)).count();
      let height = helpers::pct_change(support, resistance)?;

      let (min_h, max_h) = self.height_bounds;
      (resistance_touches >= self.min_touches
        && support_touches >= self.min_touches
        && height > min_h
        && height < max_h)
        .then(|| {
          windowed(DetectionKind::Rectangle, i, w)
            .measure("resistance", resistance)
            .measure("support", support)
        })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)?;
    if self.threshold.get() <= 0.0 {
      return Err(PatternError::InvalidConfig("threshold must be > 0".to_string()));
    }
    let (lo, hi) = self.height_bounds;
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
      return Err(PatternError::InvalidConfig("height_bounds must be finite and ordered".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
    self.threshold = params.threshold.unwrap_or(self.threshold);
  }
}

// ============================================================
// MEGAPHONE
// ============================================================

/// Megaphone: rolling 5-bar range widening through the window
#[derive(Debug, Clone)]
pub struct MegaphoneMatcher {
  pub window: Period,
  /// Bars per rolling range
  pub span: usize,
}

impl Default for MegaphoneMatcher {
  fn default() -> Self {
    Self { window: period(15), span: 5 }
  }
}

impl PatternMatcher for MegaphoneMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Megaphone
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    let span = self.span;
    Ok(scan_windows(bars, w, |i, seg| {
      let ranges: Vec<f64> = (span..seg.len())
        .map(|j| {
          let recent = &seg[j - span..j];
          let top = recent.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
          let bottom = recent.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
          top - bottom
        })
        .collect();
      if ranges.len() < 3 {
        return None;
      }
      let slope = linear_slope(&ranges)?;
      (slope > 0.0).then(|| windowed(DetectionKind::Megaphone, i, w).measure("range_slope", slope))
    }))
  }

  fn validate_config(&self) -> Result<()> {
    if self.span == 0 {
      return Err(PatternError::InvalidConfig("span must be > 0".to_string()));
    }
    check_window(self.window, self.span + 3)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = tuned_window(self.window, params.window, self.span + 3);
  }
}

// ============================================================
// BUMP & RUN
// ============================================================

/// Each third of the window needs two points for a slope
const BUMP_MIN_WINDOW: usize = 6;

/// Bump & Run Reversal: gentle rise, steep bump, then a falling run
#[derive(Debug, Clone)]
pub struct BumpAndRunMatcher {
  pub window: Period,
  /// Bump slope must exceed `bump_factor` × lead-in slope
  pub bump_factor: f64,
}

impl Default for BumpAndRunMatcher {
  fn default() -> Self {
    Self { window: period(30), bump_factor: 2.0 }
  }
}

impl PatternMatcher for BumpAndRunMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::BumpAndRun
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let w = self.window.get();
    let (first, second) = (w / 3, 2 * w / 3);
    Ok(scan_windows(bars, w, |i, seg| {
      let c = closes(seg);
      let lead = linear_slope(&c[..first])?;
      let bump = linear_slope(&c[first..second])?;
      let run = linear_slope(&c[second..])?;
      (lead > 0.0 && bump > lead * self.bump_factor && run < 0.0).then(|| {
        windowed(DetectionKind::BumpAndRunReversal, i, w)
          .measure("lead_slope", lead)
          .measure("bump_slope", bump)
          .measure("run_slope", run)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, BUMP_MIN_WINDOW)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = tuned_window(self.window, params.window, BUMP_MIN_WINDOW);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Candle;

  fn bars_from_bands(highs: &[f64], lows: &[f64]) -> Vec<Candle> {
    highs
      .iter()
      .zip(lows)
      .enumerate()
      .map(|(i, (&h, &l))| {
        let mid = (h + l) / 2.0;
        Candle::new(i as i64, mid, h, l, mid, 1.0)
      })
      .collect()
  }

  #[test]
  fn test_ascending_triangle() {
    let highs = vec![110.0; 25];
    let lows: Vec<f64> = (0..25).map(|i| 100.0 + i as f64 * 0.2).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = TriangleMatcher::default().scan(&bars).unwrap();
    // i = 20..25 → five windows
    assert_eq!(found.len(), 5);
    assert!(found.iter().all(|d| d.kind() == DetectionKind::AscendingTriangle));
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(20));
    assert!((found[0].value_of("low_slope").unwrap() - 0.2).abs() < 1e-9);
  }

  #[test]
  fn test_symmetric_triangle() {
    let highs: Vec<f64> = (0..21).map(|i| 120.0 - i as f64 * 0.3).collect();
    let lows: Vec<f64> = (0..21).map(|i| 100.0 + i as f64 * 0.3).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = TriangleMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind(), DetectionKind::SymmetricTriangle);
  }

  #[test]
  fn test_flat_series_has_no_triangle() {
    let bars = bars_from_bands(&[101.0; 30], &[99.0; 30]);
    assert!(TriangleMatcher::default().scan(&bars).unwrap().is_empty());
  }

  #[test]
  fn test_ascending_channel() {
    let highs: Vec<f64> = (0..21).map(|i| 105.0 + i as f64 * 0.5).collect();
    let lows: Vec<f64> = (0..21).map(|i| 100.0 + i as f64 * 0.5).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = ChannelMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind(), DetectionKind::AscendingChannel);
  }

  #[test]
  fn test_ascending_wedge() {
    // Upper line rises 0.3/bar, lower 0.5/bar: hs < 2·ls
    let highs: Vec<f64> = (0..16).map(|i| 110.0 + i as f64 * 0.3).collect();
    let lows: Vec<f64> = (0..16).map(|i| 100.0 + i as f64 * 0.5).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = AscendingWedgeMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(15));
  }

  #[test]
  fn test_descending_wedge() {
    // Lower line falls 0.5/bar, upper 0.2/bar: ls < 2·hs
    let highs: Vec<f64> = (0..16).map(|i| 120.0 - i as f64 * 0.2).collect();
    let lows: Vec<f64> = (0..16).map(|i| 110.0 - i as f64 * 0.5).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = DescendingWedgeMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind(), DetectionKind::DescendingWedge);
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(15));
    assert!((found[0].value_of("high_slope").unwrap() + 0.2).abs() < 1e-9);
    assert!((found[0].value_of("low_slope").unwrap() + 0.5).abs() < 1e-9);
    assert!(AscendingWedgeMatcher::default().scan(&bars).unwrap().is_empty());

    // Lower line only 1.5x steeper
    let lows: Vec<f64> = (0..16).map(|i| 110.0 - i as f64 * 0.3).collect();
    let bars = bars_from_bands(&highs, &lows);
    assert!(DescendingWedgeMatcher::default().scan(&bars).unwrap().is_empty());
  }

  /// Bands along the given slopes with a spike every 4 bars (from bar 0) on
  /// the highs and a dip every 4 bars (from bar 2) on the lows, so each
  /// 15-bar window holds at least two order-3 peaks and two order-3 troughs
  fn pivot_bands(n: usize, high: (f64, f64, f64), low: (f64, f64, f64)) -> Vec<Candle> {
    let (h0, hs, spike) = high;
    let (l0, ls, dip) = low;
    let highs: Vec<f64> = (0..n)
      .map(|i| h0 + hs * i as f64 + if i % 4 == 0 { spike } else { 0.0 })
      .collect();
    let lows: Vec<f64> = (0..n)
      .map(|i| l0 + ls * i as f64 - if i % 4 == 2 { dip } else { 0.0 })
      .collect();
    bars_from_bands(&highs, &lows)
  }

  #[test]
  fn test_rising_wedge_troughs_outpace_peaks() {
    let bars = pivot_bands(24, (110.0, 0.2, 1.0), (100.0, 0.5, 2.0));

    let found = RisingWedgeMatcher::default().scan(&bars).unwrap();
    // i = 15..24
    assert_eq!(found.len(), 9);
    assert!(found.iter().all(|d| d.kind() == DetectionKind::RisingWedge));
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(15));
    assert!((found[0].value_of("peak_slope").unwrap() - 0.2).abs() < 1e-9);
    assert!((found[0].value_of("trough_slope").unwrap() - 0.5).abs() < 1e-9);
    assert!(FallingWedgeMatcher::default().scan(&bars).unwrap().is_empty());
  }

  #[test]
  fn test_falling_wedge_peaks_outpace_troughs() {
    let bars = pivot_bands(24, (130.0, -0.5, 2.0), (120.0, -0.2, 2.0));

    let found = FallingWedgeMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 9);
    assert!(found.iter().all(|d| d.kind() == DetectionKind::FallingWedge));
    assert_eq!(found[8].index_of("start"), Some(8));
    assert_eq!(found[8].index_of("index"), Some(23));
    assert!((found[0].value_of("peak_slope").unwrap() + 0.5).abs() < 1e-9);
    assert!((found[0].value_of("trough_slope").unwrap() + 0.2).abs() < 1e-9);
    assert!(RisingWedgeMatcher::default().scan(&bars).unwrap().is_empty());
  }

  #[test]
  fn test_diverging_pivots_are_not_wedges() {
    // Both rising, peaks faster: widening
    let rising = pivot_bands(24, (110.0, 0.5, 2.0), (100.0, 0.2, 2.0));
    assert!(RisingWedgeMatcher::default().scan(&rising).unwrap().is_empty());
    assert!(FallingWedgeMatcher::default().scan(&rising).unwrap().is_empty());

    // Both falling, troughs faster: widening
    let falling = pivot_bands(24, (130.0, -0.2, 2.0), (120.0, -0.5, 2.0));
    assert!(FallingWedgeMatcher::default().scan(&falling).unwrap().is_empty());
    assert!(RisingWedgeMatcher::default().scan(&falling).unwrap().is_empty());
  }

  fn bars_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
      .iter()
      .enumerate()
      .map(|(i, &c)| Candle::new(i as i64, c, c + 1.0, c - 1.0, c, 1.0))
      .collect()
  }

  /// 31 closes: three 10-bar legs with the given slopes, then one trailing bar
  fn three_legs(lead: f64, bump: f64, run: f64) -> Vec<f64> {
    let mut closes = Vec::with_capacity(31);
    let mut price = 100.0;
    for slope in [lead, bump, run] {
      // Restart each leg at the previous leg's last close
      let base = price;
      for k in 0..10 {
        price = base + slope * k as f64;
        closes.push(price);
      }
    }
    closes.push(price);
    closes
  }

  #[test]
  fn test_bump_and_run() {
    let bars = bars_from_closes(&three_legs(0.2, 1.0, -1.0));

    let found = BumpAndRunMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind(), DetectionKind::BumpAndRunReversal);
    assert_eq!(found[0].index_of("start"), Some(0));
    assert_eq!(found[0].index_of("index"), Some(30));
    assert!((found[0].value_of("lead_slope").unwrap() - 0.2).abs() < 1e-9);
    assert!((found[0].value_of("bump_slope").unwrap() - 1.0).abs() < 1e-9);
    assert!((found[0].value_of("run_slope").unwrap() + 1.0).abs() < 1e-9);

    // Bump under twice the lead-in slope
    let bars = bars_from_closes(&three_legs(0.2, 0.3, -1.0));
    assert!(BumpAndRunMatcher::default().scan(&bars).unwrap().is_empty());

    // No falling run
    let bars = bars_from_closes(&three_legs(0.2, 1.0, 0.5));
    assert!(BumpAndRunMatcher::default().scan(&bars).unwrap().is_empty());
  }

  #[test]
  fn test_short_window_override_keeps_usable_window() {
    let params = PatternParams::default().with_window(4).unwrap();

    let mut wedge = RisingWedgeMatcher::default();
    wedge.tune(&params);
    assert_eq!(wedge.window.get(), 15);
    assert!(wedge.validate_config().is_ok());

    let mut megaphone = MegaphoneMatcher::default();
    megaphone.tune(&params);
    assert_eq!(megaphone.window.get(), 15);

    let mut bump = BumpAndRunMatcher::default();
    bump.tune(&params);
    assert_eq!(bump.window.get(), 30);

    let mut triangle = TriangleMatcher::default();
    triangle.tune(&params);
    assert_eq!(triangle.window.get(), 4);

    let params = PatternParams::default().with_window(9).unwrap();
    wedge.tune(&params);
    megaphone.tune(&params);
    assert_eq!(wedge.window.get(), 9);
    assert_eq!(megaphone.window.get(), 9);
  }

  #[test]
  fn test_rectangle() {
    // Oscillates between 100 and 108
    let highs: Vec<f64> = (0..21).map(|i| if i % 4 == 0 { 108.0 } else { 105.0 }).collect();
    let lows: Vec<f64> = (0..21).map(|i| if i % 4 == 2 { 100.0 } else { 103.0 }).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = RectangleMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value_of("resistance"), Some(108.0));
    assert_eq!(found[0].value_of("support"), Some(100.0));
  }

  #[test]
  fn test_megaphone_widening_ranges() {
    let highs: Vec<f64> = (0..16).map(|i| 100.0 + i as f64 * 0.5).collect();
    let lows: Vec<f64> = (0..16).map(|i| 100.0 - i as f64 * 0.5).collect();
    let bars = bars_from_bands(&highs, &lows);

    let found = MegaphoneMatcher::default().scan(&bars).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].value_of("range_slope").unwrap() > 0.0);
  }

  #[test]
  fn test_window_with_inverted_bar_skipped() {
    let highs = vec![110.0; 21];
    let mut lows: Vec<f64> = (0..21).map(|i| 100.0 + i as f64 * 0.2).collect();
    lows[7] = 115.0;
    let bars = bars_from_bands(&highs, &lows);
    assert!(TriangleMatcher::default().scan(&bars).unwrap().is_empty());
  }

  #[test]
  fn test_invalid_windows_rejected() {
    let m = MegaphoneMatcher { window: period(6), ..Default::default() };
    assert!(m.validate_config().is_err());
    let m = BumpAndRunMatcher { window: period(5), ..Default::default() };
    assert!(m.validate_config().is_err());
    assert!(TriangleMatcher::default().validate_config().is_ok());
  }
}
