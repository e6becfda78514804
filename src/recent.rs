//! Recent-window pattern detection
//!
//! Re-runs every matcher on the trailing slice covering the last N days and
//! translates detections back to full-series bar indices, so callers can
//! overlay them on the complete chart.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{params::PatternParams, run_pattern_detection, Direction, PatternError, PatternMap, Result, OHLCV};

const MINUTES_PER_DAY: u64 = 1440;
const MS_PER_MINUTE: i64 = 60_000;

// ============================================================
// TIMEFRAME
// ============================================================

/// Exchange candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "8h")]
    H8,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "3d")]
    D3,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 14] = [
        Self::M1,
        Self::M3,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H4,
        Self::H6,
        Self::H8,
        Self::H12,
        Self::D1,
        Self::D3,
        Self::W1,
    ];

    pub fn minutes(self) -> u64 {
        match self {
            Self::M1 => 1,
            Self::M3 => 3,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H2 => 120,
            Self::H4 => 240,
            Self::H6 => 360,
            Self::H8 => 480,
            Self::H12 => 720,
            Self::D1 => 1440,
            Self::D3 => 4320,
            Self::W1 => 10080,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M3 => "3m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H6 => "6h",
            Self::H8 => "8h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::D3 => "3d",
            Self::W1 => "1w",
        }
    }

    pub fn from_minutes(minutes: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|tf| tf.minutes() == minutes)
    }

    /// Interval matching the smallest positive spacing between consecutive timestamps
    pub fn infer<T: OHLCV>(bars: &[T]) -> Option<Self> {
        let spacing = bars
            .windows(2)
            .filter_map(|w| Some(w[1].timestamp()? - w[0].timestamp()?))
            .filter(|&d| d > 0)
            .min()?;
        if spacing % MS_PER_MINUTE != 0 {
            return None;
        }
        Self::from_minutes((spacing / MS_PER_MINUTE) as u64)
    }

    /// Bars covering `days` days, rounded up, at least one
    pub fn bars_in(self, days: u32) -> usize {
        let bars = (u64::from(days) * MINUTES_PER_DAY).div_ceil(self.minutes());
        usize::try_from(bars.max(1)).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| PatternError::InvalidConfig(format!("unknown timeframe `{s}`")))
    }
}

// ============================================================
// PARAMETERS & RESULT
// ============================================================

/// Options for [`run_recent_pattern_detection`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentParams {
    /// Bar interval; inferred from timestamps when absent
    pub timeframe: Option<Timeframe>,
    /// Overrides forwarded to every matcher
    pub pattern: PatternParams,
}

/// Detections from the trailing window, in full-series coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPatterns {
    pub lookback_days: u32,
    pub timeframe: Option<Timeframe>,
    /// First bar of the window in the full series
    pub window_start: usize,
    pub window_len: usize,
    pub patterns: PatternMap,
    pub summary: String,
}

// ============================================================
// DETECTION
// ============================================================

/// Detect patterns formed within the last `lookback_days` days.
///
/// The window holds `ceil(days · 1440 / timeframe_minutes)` bars, clipped to
/// the series. Every reported index is relative to the full series.
pub fn run_recent_pattern_detection<T: OHLCV>(
    bars: &[T],
    lookback_days: u32,
    params: Option<&RecentParams>,
) -> Result<RecentPatterns> {
    if lookback_days == 0 {
        return Err(PatternError::InvalidConfig(
            "lookback_days must be > 0".to_string(),
        ));
    }
    let params = params.copied().unwrap_or_default();
    let len = bars.len();

    let timeframe = params.timeframe.or_else(|| Timeframe::infer(bars));
    let window_len = match timeframe {
        Some(tf) => tf.bars_in(lookback_days).min(len),
        // Nothing to infer from; the whole series is the window
        None if len <= 1 => len,
        None => {
            return Err(PatternError::InvalidConfig(
                "timeframe not given and not inferable from timestamps".to_string(),
            ))
        }
    };
    let window_start = len - window_len;

    let local = run_pattern_detection(&bars[window_start..], Some(&params.pattern))?;
    let patterns = local.shifted(window_start);
    let summary = summarize(&patterns, len, lookback_days);

    debug!(
        lookback_days,
        window_start,
        window_len,
        detections = patterns.total(),
        "recent pattern scan complete"
    );

    Ok(RecentPatterns {
        lookback_days,
        timeframe,
        window_start,
        window_len,
        patterns,
        summary,
    })
}

// ============================================================
// SUMMARY
// ============================================================

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn bias(patterns: &[crate::Detection]) -> &'static str {
    let mut dirs = patterns.iter().filter_map(|d| d.direction());
    let Some(first) = dirs.next() else {
        return "unclassified";
    };
    if dirs.all(|d| d == first) {
        first.as_str()
    } else {
        "mixed"
    }
}

/// One paragraph per family with detections, or a single "none" sentence
fn summarize(patterns: &PatternMap, series_len: usize, days: u32) -> String {
    let paragraphs: Vec<String> = patterns
        .found()
        .map(|(family, detections)| {
            let latest = detections.iter().filter_map(|d| d.end_index()).max();
            let when = match latest {
                Some(bar) => {
                    let ago = series_len.saturating_sub(bar + 1);
                    format!(", most recent at bar {bar} ({} ago)", plural(ago, "bar", "bars"))
                }
                None => String::new(),
            };
            let direction = match bias(detections) {
                "mixed" => "mixed bias".to_string(),
                d if d == Direction::Neutral.as_str() => "neutral bias".to_string(),
                d => format!("{d} bias"),
            };
            format!(
                "{family}: {}{when}; {direction}.",
                plural(detections.len(), "detection", "detections")
            )
        })
        .collect();

    if paragraphs.is_empty() {
        format!(
            "No patterns detected in the last {}.",
            plural(days as usize, "day", "days")
        )
    } else {
        paragraphs.join("\n\n")
    }
}
