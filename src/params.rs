//! Parameter metadata and caller overrides for pattern matchers
//!
//! Matchers carry their own named parameters with defaults. Callers can
//! override the three shared knobs (`threshold`, `window`, `order`) for
//! every matcher that has them through [`PatternParams`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use chartsense::params::PatternParams;
//!
//! for param in PatternParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut raw = HashMap::new();
//! raw.insert("threshold", 0.03);
//! raw.insert("window", 25.0);
//! let params = PatternParams::from_map(&raw).unwrap();
//! assert_eq!(params.window.map(|w| w.get()), Some(25));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
}

/// Metadata for a single matcher parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "threshold")
  pub name: &'static str,
  /// Parameter type (Ratio or Period)
  pub param_type: ParamType,
  /// Default value of the most common matcher
  pub default: f64,
  /// Accepted range: (min, max)
  pub range: (f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(PatternError::InvalidValue("parameter must be finite"));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(PatternError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

static PATTERN_PARAMS: &[ParamMeta] = &[
  ParamMeta::ratio(
    "threshold",
    0.02,
    (0.0001, 1.0),
    "Relative price tolerance for matching extrema and touches",
  ),
  ParamMeta::period("window", 20.0, (3.0, 5000.0), "Sliding window length in bars"),
  ParamMeta::period("order", 5.0, (1.0, 100.0), "Neighbours each side for local extrema"),
];

// ============================================================
// PATTERN OVERRIDES
// ============================================================

/// Overrides applied to every builtin matcher that has the parameter.
///
/// `None` keeps each matcher's own default, so a window override of 20 is
/// applied both to the triangle matcher (default 20) and the wedge matchers
/// (default 15). Matchers that need more bars than a window override
/// provides (the pivot wedges, Megaphone, Bump & Run) keep their own window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
  pub threshold: Option<Ratio>,
  pub window: Option<Period>,
  pub order: Option<Period>,
}

impl PatternParams {
  /// Metadata for the recognized override keys
  pub fn param_meta() -> &'static [ParamMeta] {
    PATTERN_PARAMS
  }

  pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
    self.threshold = Some(Ratio::new(threshold)?);
    Ok(self)
  }

  pub fn with_window(mut self, window: usize) -> Result<Self> {
    self.window = Some(Period::new(window)?);
    Ok(self)
  }

  pub fn with_order(mut self, order: usize) -> Result<Self> {
    self.order = Some(Period::new(order)?);
    Ok(self)
  }

  /// Build overrides from loosely typed key/value pairs.
  ///
  /// Unknown keys are rejected.
  pub fn from_map(params: &HashMap<&str, f64>) -> Result<Self> {
    for (key, value) in params {
      let meta = meta_for(key)
        .ok_or_else(|| PatternError::InvalidConfig(format!("unknown pattern parameter `{key}`")))?;
      meta.validate(*value)?;
    }

    let out = Self {
      threshold: params
        .contains_key("threshold")
        .then(|| get_ratio(params, "threshold", 0.02))
        .transpose()?,
      window: params.contains_key("window").then(|| get_period(params, "window", 20)).transpose()?,
      order: params.contains_key("order").then(|| get_period(params, "order", 5)).transpose()?,
    };
    out.validate()?;
    Ok(out)
  }

  /// Check every present override against its accepted range
  pub fn validate(&self) -> Result<()> {
    if let Some(t) = self.threshold {
      meta_for("threshold").map_or(Ok(()), |m| m.validate(t.get()))?;
    }
    if let Some(w) = self.window {
      meta_for("window").map_or(Ok(()), |m| m.validate(w.get() as f64))?;
    }
    if let Some(o) = self.order {
      meta_for("order").map_or(Ok(()), |m| m.validate(o.get() as f64))?;
    }
    Ok(())
  }
}

fn meta_for(key: &str) -> Option<&'static ParamMeta> {
  PATTERN_PARAMS.iter().find(|m| m.name == key)
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
