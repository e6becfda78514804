//! Rounding and continuation formations
//!
//! Families: Rounding Bottom, Cup & Handle, Flag Patterns, Pennants,
//! Dead Cat Bounce.

use super::helpers::{
  check_window, closes, linear_slope, lows, pct_change, period, quadratic_curvature,
  scan_windows, window_is_sound, MIN_CURVATURE, POLE_BARS, POLE_MOVE,
};
use crate::{
  params::PatternParams, Detection, DetectionKind, OHLCVExt, PatternError, PatternFamily,
  PatternMatcher, Period, Result, OHLCV,
};

impl_with_defaults!(
  RoundingBottomMatcher,
  CupAndHandleMatcher,
  FlagMatcher,
  PennantMatcher,
  DeadCatBounceMatcher,
);

/// Windows `[i - window, i)` whose lows fit a U-shaped parabola
fn rounding_windows<T: OHLCV>(bars: &[T], window: usize, min_curvature: f64) -> Vec<Detection> {
  scan_windows(bars, window, |i, seg| {
    let curvature = quadratic_curvature(&lows(seg))?;
    (curvature > min_curvature).then(|| {
      Detection::new(DetectionKind::RoundingBottom)
        .anchor("start", i - window)
        .anchor("index", i)
        .measure("curvature", curvature)
    })
  })
}

// ============================================================
// ROUNDING BOTTOM
// ============================================================

/// Rounding Bottom: lows of the window bend upward
#[derive(Debug, Clone)]
pub struct RoundingBottomMatcher {
  pub window: Period,
  pub min_curvature: f64,
}

impl Default for RoundingBottomMatcher {
  fn default() -> Self {
    Self { window: period(20), min_curvature: MIN_CURVATURE }
  }
}

impl PatternMatcher for RoundingBottomMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::RoundingBottom
  }

  fn min_bars(&self) -> usize {
    self.window.get()
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    Ok(rounding_windows(bars, self.window.get(), self.min_curvature))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 3)
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// CUP & HANDLE
// ============================================================

/// Cup & Handle: a rounding bottom followed by a shallow consolidation
#[derive(Debug, Clone)]
pub struct CupAndHandleMatcher {
  /// Cup length
  pub window: Period,
  pub min_curvature: f64,
  /// Bars examined after the cup
  pub handle_bars: usize,
  /// Fewest handle bars that must exist
  pub min_handle_bars: usize,
  /// Largest `(max_high - min_low) / max_high` inside the handle
  pub max_handle_depth: f64,
}

impl Default for CupAndHandleMatcher {
  fn default() -> Self {
    Self {
      window: period(30),
      min_curvature: MIN_CURVATURE,
      handle_bars: 10,
      min_handle_bars: 5,
      max_handle_depth: 0.15,
    }
  }
}

impl PatternMatcher for CupAndHandleMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::CupAndHandle
  }

  fn min_bars(&self) -> usize {
    self.window.get() + self.handle_bars
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let cups = rounding_windows(bars, self.window.get(), self.min_curvature);
    let mut out = Vec::new();

    for cup in &cups {
      let (Some(cup_start), Some(cup_end)) = (cup.index_of("start"), cup.index_of("index")) else {
        continue;
      };
      let handle_stop = (cup_end + self.handle_bars).min(bars.len());
      let handle = &bars[cup_end..handle_stop];
      if handle.len() < self.min_handle_bars || !window_is_sound(handle) {
        continue;
      }

      let handle_high = handle.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
      let handle_low = handle.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
      if handle_high <= 0.0 {
        continue;
      }
      let depth = (handle_high - handle_low) / handle_high;

      if depth < self.max_handle_depth {
        out.push(
          Detection::new(DetectionKind::CupAndHandle)
            .anchor("cup_start", cup_start)
            .anchor("cup_end", cup_end)
            .anchor("handle_end", handle_stop - 1)
            .measure("handle_depth", depth),
        );
      }
    }

    Ok(out)
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 3)?;
    if self.min_handle_bars == 0 || self.min_handle_bars > self.handle_bars {
      return Err(PatternError::InvalidConfig(
        "min_handle_bars must be in 1..=handle_bars".to_string(),
      ));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// FLAGS & PENNANTS
// ============================================================

/// Close-to-close change across the pole
fn pole_change<T: OHLCV>(pole: &[T]) -> Option<f64> {
  pct_change(pole.first()?.close(), pole.last()?.close())
}

/// Flag Patterns: strong pole, then a gently counter-sloped consolidation
#[derive(Debug, Clone)]
pub struct FlagMatcher {
  /// Consolidation length
  pub window: Period,
  pub pole_bars: usize,
  pub pole_move: f64,
  /// Consolidation close slope must lie strictly inside (0, max_flag_slope) against the pole
  pub max_flag_slope: f64,
}

impl Default for FlagMatcher {
  fn default() -> Self {
    Self { window: period(10), pole_bars: POLE_BARS, pole_move: POLE_MOVE, max_flag_slope: 0.002 }
  }
}

impl PatternMatcher for FlagMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Flags
  }

  fn min_bars(&self) -> usize {
    self.window.get() + self.pole_bars
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let p = self.pole_bars;
    let max = self.max_flag_slope;
    Ok(scan_windows(bars, self.window.get() + p, |i, seg| {
      let (pole, flag) = seg.split_at(p);
      let change = pole_change(pole)?;

      let kind = if change > self.pole_move {
        DetectionKind::BullishFlag
      } else if change < -self.pole_move {
        DetectionKind::BearishFlag
      } else {
        return None;
      };

      let slope = linear_slope(&closes(flag))?;
      let drifts_back = match kind {
        DetectionKind::BullishFlag => -max < slope && slope < 0.0,
        _ => 0.0 < slope && slope < max,
      };
      drifts_back.then(|| {
        Detection::new(kind)
          .anchor("pole_start", i - seg.len())
          .anchor("index", i)
          .measure("pole_change", change)
          .measure("flag_slope", slope)
      })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)?;
    if self.pole_bars < 2 {
      return Err(PatternError::InvalidConfig("pole_bars must be >= 2".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

/// Pennants: strong pole, then a consolidation whose bar range halves
#[derive(Debug, Clone)]
pub struct PennantMatcher {
  pub window: Period,
  pub pole_bars: usize,
  pub pole_move: f64,
  /// Last consolidation range must be below `contraction` × the first
  pub contraction: f64,
}

impl Default for PennantMatcher {
  fn default() -> Self {
    Self { window: period(10), pole_bars: POLE_BARS, pole_move: POLE_MOVE, contraction: 0.5 }
  }
}

impl PatternMatcher for PennantMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::Pennants
  }

  fn min_bars(&self) -> usize {
    self.window.get() + self.pole_bars
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let p = self.pole_bars;
    Ok(scan_windows(bars, self.window.get() + p, |i, seg| {
      let (pole, pennant) = seg.split_at(p);
      let change = pole_change(pole)?;
      if change.abs() <= self.pole_move {
        return None;
      }

      let range_start = pennant.first()?.range();
      let range_end = pennant.last()?.range();
      if range_end >= range_start * self.contraction {
        return None;
      }

      let kind =
        if change > 0.0 { DetectionKind::BullishPennant } else { DetectionKind::BearishPennant };
      Some(
        Detection::new(kind)
          .anchor("pole_start", i - seg.len())
          .anchor("index", i)
          .measure("pole_change", change),
      )
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 2)?;
    if self.pole_bars < 2 {
      return Err(PatternError::InvalidConfig("pole_bars must be >= 2".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}

// ============================================================
// DEAD CAT BOUNCE
// ============================================================

/// Dead Cat Bounce: sharp drop, weak bounce, then closes turning lower
#[derive(Debug, Clone)]
pub struct DeadCatBounceMatcher {
  /// Bounce length
  pub window: Period,
  pub drop_bars: usize,
  /// Drop leg must fall more than this fraction
  pub min_drop: f64,
  /// Best bounce close must stay under this gain
  pub max_bounce: f64,
}

impl Default for DeadCatBounceMatcher {
  fn default() -> Self {
    Self { window: period(10), drop_bars: POLE_BARS, min_drop: 0.10, max_bounce: 0.05 }
  }
}

impl PatternMatcher for DeadCatBounceMatcher {
  fn family(&self) -> PatternFamily {
    PatternFamily::DeadCatBounce
  }

  fn min_bars(&self) -> usize {
    self.window.get() + self.drop_bars
  }

  fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
    let d = self.drop_bars;
    Ok(scan_windows(bars, self.window.get() + d, |i, seg| {
      let (drop, bounce) = seg.split_at(d);
      let drop_pct = pole_change(drop)?;

      let bounce_open = bounce.first()?.close();
      let bounce_best = bounce.iter().map(|b| b.close()).fold(f64::NEG_INFINITY, f64::max);
      let bounce_pct = pct_change(bounce_open, bounce_best)?;

      let tail = &seg[seg.len() - 3..];
      let rolling_over = tail[2].close() < tail[0].close();

      (drop_pct < -self.min_drop && 0.0 < bounce_pct && bounce_pct < self.max_bounce && rolling_over)
        .then(|| {
          Detection::new(DetectionKind::DeadCatBounce)
            .anchor("drop_start", i - seg.len())
            .anchor("bounce_start", i - bounce.len())
            .anchor("index", i)
            .measure("drop_pct", drop_pct)
            .measure("bounce_pct", bounce_pct)
        })
    }))
  }

  fn validate_config(&self) -> Result<()> {
    check_window(self.window, 3)?;
    if self.drop_bars < 2 {
      return Err(PatternError::InvalidConfig("drop_bars must be >= 2".to_string()));
    }
    Ok(())
  }

  fn tune(&mut self, params: &PatternParams) {
    self.window = params.window.unwrap_or(self.window);
  }
}
