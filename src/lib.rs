//! # chartsense
//!
//! Chart formation detection and derivatives alpha scoring for OHLCV series.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartsense::prelude::*;
//!
//! let bars: Vec<Candle> = (0..40)
//!     .map(|i| {
//!         let base = 100.0 + (i as f64 * 0.7).sin() * 5.0;
//!         Candle::new(i * 3_600_000, base, base + 1.0, base - 1.0, base + 0.3, 10.0)
//!     })
//!     .collect();
//!
//! // Every builtin matcher with default parameters
//! let patterns = detect_all(&bars);
//! for (family, detections) in patterns.found() {
//!     println!("{family}: {}", detections.len());
//! }
//!
//! // Composite and smart-money scores from derivatives metrics
//! let metrics = MarketMetrics {
//!     funding_rate_8h: Some(0.0001),
//!     oi_change_24h_pct: Some(4.2),
//!     ..MarketMetrics::default()
//! };
//! let report = score_alpha(&metrics, &[1.1, 1.25]);
//! assert!(report.composite_score <= 100);
//! ```

pub mod alpha;
pub mod detectors;
pub mod extrema;
pub mod indicators;
pub mod params;
pub mod recent;

pub mod prelude {
    pub use crate::{
        // Scoring
        alpha::{
            collect_metrics, normalize_pct, ratio_to_score, score_alpha, score_alpha_with,
            AlphaReport, CompositeLabel, FlowLabel, FundingBias, MarketMetrics, MetricsSource,
            ScoringParams, SmartMoneyFlow,
        },
        // Matchers
        detectors::*,
        // Extrema
        extrema::{find_extrema, find_peaks, find_troughs, Extremum, ExtremumKind},
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, PatternParams},
        // Recent window
        recent::{run_recent_pattern_detection, RecentParams, RecentPatterns, Timeframe},
        // Entry points
        detect_all,
        run_matcher_safely,
        run_pattern_detection,
        scan_parallel,
        // Engine
        BuiltinMatcher,
        // Types
        Anchor,
        Candle,
        Detection,
        DetectionKind,
        Direction,
        // Core traits
        DynPatternMatcher,
        EngineBuilder,
        FamilyResult,
        MatcherOutcome,
        Measure,
        OHLCVExt,
        PatternEngine,
        // Errors
        PatternError,
        PatternFamily,
        PatternMap,
        PatternMatcher,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        SkipReason,
        OHLCV,
    };
}

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised by configuration checks and strict-mode data validation.
///
/// Sparse or missing data is never an error: matchers return empty results
/// and scorers fall back to neutral values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Matcher {family} failed: {reason}")]
    MatcherFailed { family: &'static str, reason: String },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0). Used for windows and extremum orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Bar open time in epoch milliseconds, if known
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    /// Midpoint of the real body
    #[inline]
    fn body_mid(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// All four prices finite and `high >= low`
    #[inline]
    fn is_sound(&self) -> bool {
        self.open().is_finite()
            && self.high().is_finite()
            && self.low().is_finite()
            && self.close().is_finite()
            && self.high() >= self.low()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Plain OHLCV bar with an epoch-millisecond open time
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// DETECTION RECORDS
// ============================================================

/// Direction/bias of a formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Neutral => "neutral",
            Direction::Bearish => "bearish",
        }
    }
}

/// Concrete formation type carried by a [`Detection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionKind {
    // Reversal
    DoubleTop,
    DoubleBottom,
    TripleTop,
    TripleBottom,
    HeadAndShoulders,
    InverseHeadAndShoulders,
    AdamAndEveDoubleBottom,
    Dragon,
    BumpAndRunReversal,
    DeadCatBounce,

    // Trend geometry
    AscendingTriangle,
    DescendingTriangle,
    SymmetricTriangle,
    AscendingWedge,
    DescendingWedge,
    RisingWedge,
    FallingWedge,
    AscendingChannel,
    DescendingChannel,
    Rectangle,
    Megaphone,

    // Continuation / rounding
    RoundingBottom,
    CupAndHandle,
    BullishFlag,
    BearishFlag,
    BullishPennant,
    BearishPennant,

    // Harmonic
    Abcd,

    // Candlesticks
    Hammer,
    InvertedHammer,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    StandardDoji,
    DragonflyDoji,
    GravestoneDoji,
    ShootingStar,
    PiercingPattern,
    DarkCloudCover,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    TweezerTop,
    TweezerBottom,
    BullishHarami,
    BearishHarami,

    /// Emitted by user-supplied matchers
    Custom(&'static str),
}

impl DetectionKind {
    /// Snake-case type tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoubleTop => "double_top",
            Self::DoubleBottom => "double_bottom",
            Self::TripleTop => "triple_top",
            Self::TripleBottom => "triple_bottom",
            Self::HeadAndShoulders => "head_and_shoulders",
            Self::InverseHeadAndShoulders => "inverse_head_and_shoulders",
            Self::AdamAndEveDoubleBottom => "adam_and_eve_double_bottom",
            Self::Dragon => "dragon",
            Self::BumpAndRunReversal => "bump_and_run_reversal",
            Self::DeadCatBounce => "dead_cat_bounce",
            Self::AscendingTriangle => "ascending_triangle",
            Self::DescendingTriangle => "descending_triangle",
            Self::SymmetricTriangle => "symmetric_triangle",
            Self::AscendingWedge => "ascending_wedge",
            Self::DescendingWedge => "descending_wedge",
            Self::RisingWedge => "rising_wedge",
            Self::FallingWedge => "falling_wedge",
            Self::AscendingChannel => "ascending_channel",
            Self::DescendingChannel => "descending_channel",
            Self::Rectangle => "rectangle",
            Self::Megaphone => "megaphone",
            Self::RoundingBottom => "rounding_bottom",
            Self::CupAndHandle => "cup_and_handle",
            Self::BullishFlag => "bullish_flag",
            Self::BearishFlag => "bearish_flag",
            Self::BullishPennant => "bullish_pennant",
            Self::BearishPennant => "bearish_pennant",
            Self::Abcd => "abcd_pattern",
            Self::Hammer => "hammer",
            Self::InvertedHammer => "inverted_hammer",
            Self::BullishEngulfing => "bullish_engulfing",
            Self::BearishEngulfing => "bearish_engulfing",
            Self::MorningStar => "morning_star",
            Self::EveningStar => "evening_star",
            Self::StandardDoji => "standard_doji",
            Self::DragonflyDoji => "dragonfly_doji",
            Self::GravestoneDoji => "gravestone_doji",
            Self::ShootingStar => "shooting_star",
            Self::PiercingPattern => "piercing_pattern",
            Self::DarkCloudCover => "dark_cloud_cover",
            Self::ThreeWhiteSoldiers => "three_white_soldiers",
            Self::ThreeBlackCrows => "three_black_crows",
            Self::TweezerTop => "tweezer_top",
            Self::TweezerBottom => "tweezer_bottom",
            Self::BullishHarami => "bullish_harami",
            Self::BearishHarami => "bearish_harami",
            Self::Custom(tag) => tag,
        }
    }

    /// Typical bias of the formation. `None` for custom kinds.
    pub fn typical_direction(&self) -> Option<Direction> {
        match self {
            Self::DoubleBottom
            | Self::TripleBottom
            | Self::InverseHeadAndShoulders
            | Self::AdamAndEveDoubleBottom
            | Self::Dragon
            | Self::AscendingTriangle
            | Self::DescendingWedge
            | Self::FallingWedge
            | Self::AscendingChannel
            | Self::RoundingBottom
            | Self::CupAndHandle
            | Self::BullishFlag
            | Self::BullishPennant
            | Self::Hammer
            | Self::InvertedHammer
            | Self::BullishEngulfing
            | Self::MorningStar
            | Self::DragonflyDoji
            | Self::PiercingPattern
            | Self::ThreeWhiteSoldiers
            | Self::TweezerBottom
            | Self::BullishHarami => Some(Direction::Bullish),
            Self::DoubleTop
            | Self::TripleTop
            | Self::HeadAndShoulders
            | Self::BumpAndRunReversal
            | Self::DeadCatBounce
            | Self::DescendingTriangle
            | Self::AscendingWedge
            | Self::RisingWedge
            | Self::DescendingChannel
            | Self::BearishFlag
            | Self::BearishPennant
            | Self::BearishEngulfing
            | Self::EveningStar
            | Self::GravestoneDoji
            | Self::ShootingStar
            | Self::DarkCloudCover
            | Self::ThreeBlackCrows
            | Self::TweezerTop
            | Self::BearishHarami => Some(Direction::Bearish),
            Self::SymmetricTriangle
            | Self::Rectangle
            | Self::Megaphone
            | Self::Abcd
            | Self::StandardDoji => Some(Direction::Neutral),
            Self::Custom(_) => None,
        }
    }
}

impl serde::Serialize for DetectionKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Named bar position inside a detection (e.g. `"head"`, `"first_top"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Anchor {
    pub role: &'static str,
    pub index: usize,
}

/// Named measurement attached to a detection (e.g. `"price"`, `"high_slope"`)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Measure {
    pub name: &'static str,
    pub value: f64,
}

/// One occurrence of a formation.
///
/// Positions are indices into the exact series the detection was computed
/// against. Records are immutable once built; [`Detection::shifted`] returns
/// a translated copy.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Detection {
    kind: DetectionKind,
    anchors: Vec<Anchor>,
    measures: Vec<Measure>,
}

impl Detection {
    pub fn new(kind: DetectionKind) -> Self {
        Self {
            kind,
            anchors: Vec::new(),
            measures: Vec::new(),
        }
    }

    /// Builder step: attach a bar position
    pub fn anchor(mut self, role: &'static str, index: usize) -> Self {
        self.anchors.push(Anchor { role, index });
        self
    }

    /// Builder step: attach a measurement
    pub fn measure(mut self, name: &'static str, value: f64) -> Self {
        self.measures.push(Measure { name, value });
        self
    }

    #[inline]
    pub fn kind(&self) -> DetectionKind {
        self.kind
    }

    #[inline]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    #[inline]
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn index_of(&self, role: &str) -> Option<usize> {
        self.anchors.iter().find(|a| a.role == role).map(|a| a.index)
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.measures.iter().find(|m| m.name == name).map(|m| m.value)
    }

    /// Earliest anchored bar
    pub fn start_index(&self) -> Option<usize> {
        self.anchors.iter().map(|a| a.index).min()
    }

    /// Latest anchored bar
    pub fn end_index(&self) -> Option<usize> {
        self.anchors.iter().map(|a| a.index).max()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.kind.typical_direction()
    }

    /// Copy with every anchor moved forward by `offset` bars
    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            kind: self.kind,
            anchors: self
                .anchors
                .iter()
                .map(|a| Anchor {
                    role: a.role,
                    index: a.index + offset,
                })
                .collect(),
            measures: self.measures.clone(),
        }
    }
}

// ============================================================
// PATTERN FAMILIES & MAP
// ============================================================

/// Builtin pattern families, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFamily {
    DoubleTops,
    DoubleBottoms,
    HeadAndShoulders,
    Triangles,
    Hammers,
    TripleTops,
    TripleBottoms,
    RoundingBottom,
    CupAndHandle,
    AscendingWedge,
    DescendingWedge,
    RisingWedge,
    FallingWedge,
    Flags,
    Pennants,
    Channels,
    BumpAndRun,
    Dragon,
    InverseHeadAndShoulders,
    AdamAndEve,
    Megaphone,
    DeadCatBounce,
    Abcd,
    Rectangle,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    Doji,
    ShootingStar,
    PiercingPattern,
    DarkCloud,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    Tweezers,
    Harami,
}

impl PatternFamily {
    pub const ALL: [PatternFamily; 36] = [
        Self::DoubleTops,
        Self::DoubleBottoms,
        Self::HeadAndShoulders,
        Self::Triangles,
        Self::Hammers,
        Self::TripleTops,
        Self::TripleBottoms,
        Self::RoundingBottom,
        Self::CupAndHandle,
        Self::AscendingWedge,
        Self::DescendingWedge,
        Self::RisingWedge,
        Self::FallingWedge,
        Self::Flags,
        Self::Pennants,
        Self::Channels,
        Self::BumpAndRun,
        Self::Dragon,
        Self::InverseHeadAndShoulders,
        Self::AdamAndEve,
        Self::Megaphone,
        Self::DeadCatBounce,
        Self::Abcd,
        Self::Rectangle,
        Self::BullishEngulfing,
        Self::BearishEngulfing,
        Self::MorningStar,
        Self::EveningStar,
        Self::Doji,
        Self::ShootingStar,
        Self::PiercingPattern,
        Self::DarkCloud,
        Self::ThreeWhiteSoldiers,
        Self::ThreeBlackCrows,
        Self::Tweezers,
        Self::Harami,
    ];

    /// Display name used as the [`PatternMap`] key
    pub fn name(self) -> &'static str {
        match self {
            Self::DoubleTops => "Double Tops",
            Self::DoubleBottoms => "Double Bottoms",
            Self::HeadAndShoulders => "Head & Shoulders",
            Self::Triangles => "Triangles",
            Self::Hammers => "Hammers",
            Self::TripleTops => "Triple Tops",
            Self::TripleBottoms => "Triple Bottoms",
            Self::RoundingBottom => "Rounding Bottom",
            Self::CupAndHandle => "Cup & Handle",
            Self::AscendingWedge => "Ascending Wedge",
            Self::DescendingWedge => "Descending Wedge",
            Self::RisingWedge => "Rising Wedge",
            Self::FallingWedge => "Falling Wedge",
            Self::Flags => "Flag Patterns",
            Self::Pennants => "Pennants",
            Self::Channels => "Channels",
            Self::BumpAndRun => "Bump & Run",
            Self::Dragon => "Dragon",
            Self::InverseHeadAndShoulders => "Inv H&S",
            Self::AdamAndEve => "Adam & Eve",
            Self::Megaphone => "Megaphone",
            Self::DeadCatBounce => "Dead Cat Bounce",
            Self::Abcd => "ABCD Pattern",
            Self::Rectangle => "Rectangle",
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::Doji => "Doji",
            Self::ShootingStar => "Shooting Star",
            Self::PiercingPattern => "Piercing Pattern",
            Self::DarkCloud => "Dark Cloud",
            Self::ThreeWhiteSoldiers => "3 White Soldiers",
            Self::ThreeBlackCrows => "3 Black Crows",
            Self::Tweezers => "Tweezers",
            Self::Harami => "Harami",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Single/multi-candle formations as opposed to chart geometry
    pub fn is_candlestick(self) -> bool {
        matches!(
            self,
            Self::Hammers
                | Self::BullishEngulfing
                | Self::BearishEngulfing
                | Self::MorningStar
                | Self::EveningStar
                | Self::Doji
                | Self::ShootingStar
                | Self::PiercingPattern
                | Self::DarkCloud
                | Self::ThreeWhiteSoldiers
                | Self::ThreeBlackCrows
                | Self::Tweezers
                | Self::Harami
        )
    }
}

/// Why a matcher produced no result list
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum SkipReason {
    InsufficientData { need: usize, got: usize },
    Failed(String),
}

/// Outcome of running one matcher over a series
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatcherOutcome {
    Detected { detections: Vec<Detection> },
    Skipped { reason: SkipReason },
}

impl MatcherOutcome {
    /// Detections, or an empty slice when skipped
    pub fn detections(&self) -> &[Detection] {
        match self {
            Self::Detected { detections } => detections,
            Self::Skipped { .. } => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Detected { .. } => None,
            Self::Skipped { reason } => Some(reason),
        }
    }

    fn shifted(&self, offset: usize) -> Self {
        match self {
            Self::Detected { detections } => Self::Detected {
                detections: detections.iter().map(|d| d.shifted(offset)).collect(),
            },
            Self::Skipped { reason } => Self::Skipped {
                reason: reason.clone(),
            },
        }
    }
}

/// Result of one family within a [`PatternMap`]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FamilyResult {
    pub name: &'static str,
    pub outcome: MatcherOutcome,
}

/// Family name → ordered detections, in matcher registration order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PatternMap {
    entries: Vec<FamilyResult>,
}

impl PatternMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, outcome: MatcherOutcome) {
        self.entries.push(FamilyResult { name, outcome });
    }

    /// Detections for a family name; empty when absent or skipped
    pub fn get(&self, name: &str) -> &[Detection] {
        self.outcome(name).map_or(&[], MatcherOutcome::detections)
    }

    pub fn family(&self, family: PatternFamily) -> &[Detection] {
        self.get(family.name())
    }

    pub fn outcome(&self, name: &str) -> Option<&MatcherOutcome> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }

    pub fn entries(&self) -> &[FamilyResult] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Detection])> + '_ {
        self.entries.iter().map(|e| (e.name, e.outcome.detections()))
    }

    /// Families with at least one detection
    pub fn found(&self) -> impl Iterator<Item = (&'static str, &[Detection])> + '_ {
        self.iter().filter(|(_, d)| !d.is_empty())
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&'static str, &SkipReason)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.skip_reason().map(|r| (e.name, r)))
    }

    /// Total detections across all families
    pub fn total(&self) -> usize {
        self.iter().map(|(_, d)| d.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy with every detection translated forward by `offset` bars
    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|e| FamilyResult {
                    name: e.name,
                    outcome: e.outcome.shifted(offset),
                })
                .collect(),
        }
    }
}

// ============================================================
// PATTERN MATCHER TRAITS
// ============================================================

/// Generic whole-series matcher trait - for concrete types
pub trait PatternMatcher: Send + Sync {
    fn family(&self) -> PatternFamily;

    /// Shortest series the matcher can say anything about
    fn min_bars(&self) -> usize;

    /// Scan the series; detections must come out in ascending scan order
    fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    /// Apply caller overrides for the parameters this matcher has
    fn tune(&mut self, _params: &params::PatternParams) {}
}

/// Object-safe matcher trait - for custom matchers
pub trait DynPatternMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_bars(&self) -> usize;
    fn scan(&self, bars: &[&dyn OHLCV]) -> Result<Vec<Detection>>;
    fn validate_config(&self) -> Result<()>;
}

impl<M: PatternMatcher> DynPatternMatcher for M {
    fn name(&self) -> &'static str {
        PatternMatcher::family(self).name()
    }

    fn min_bars(&self) -> usize {
        PatternMatcher::min_bars(self)
    }

    fn scan(&self, bars: &[&dyn OHLCV]) -> Result<Vec<Detection>> {
        PatternMatcher::scan(self, bars)
    }

    fn validate_config(&self) -> Result<()> {
        PatternMatcher::validate_config(self)
    }
}

/// Run one matcher with failure isolation.
///
/// Short input yields `Skipped(InsufficientData)`; an error or a panic inside
/// `scan` yields `Skipped(Failed)` and is logged. Never propagates.
pub fn run_matcher_safely<F>(
    name: &'static str,
    bars_len: usize,
    min_bars: usize,
    scan: F,
) -> MatcherOutcome
where
    F: FnOnce() -> Result<Vec<Detection>>,
{
    if bars_len < min_bars {
        return MatcherOutcome::Skipped {
            reason: SkipReason::InsufficientData {
                need: min_bars,
                got: bars_len,
            },
        };
    }

    match panic::catch_unwind(AssertUnwindSafe(scan)) {
        Ok(Ok(detections)) => MatcherOutcome::Detected { detections },
        Ok(Err(PatternError::InsufficientData { need, got })) => MatcherOutcome::Skipped {
            reason: SkipReason::InsufficientData { need, got },
        },
        Ok(Err(err)) => {
            warn!(family = name, error = %err, "matcher failed, skipping");
            MatcherOutcome::Skipped {
                reason: SkipReason::Failed(err.to_string()),
            }
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "matcher panicked".to_string());
            warn!(family = name, %reason, "matcher panicked, skipping");
            MatcherOutcome::Skipped {
                reason: SkipReason::Failed(reason),
            }
        }
    }
}

// ============================================================
// BUILTIN MATCHERS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinMatcher enum without boilerplate
macro_rules! define_builtin_matchers {
    (
        $(
            $variant:ident($matcher:ty)
        ),* $(,)?
    ) => {
        /// All builtin matchers - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinMatcher {
            $($variant($matcher)),*
        }

        impl BuiltinMatcher {
            #[inline]
            pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Detection>> {
                match self {
                    $(Self::$variant(m) => PatternMatcher::scan(m, bars)),*
                }
            }

            #[inline]
            pub fn family(&self) -> PatternFamily {
                match self {
                    $(Self::$variant(m) => PatternMatcher::family(m)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(m) => PatternMatcher::min_bars(m)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(m) => PatternMatcher::validate_config(m)),*
                }
            }

            pub fn tune(&mut self, params: &params::PatternParams) {
                match self {
                    $(Self::$variant(m) => PatternMatcher::tune(m, params)),*
                }
            }
        }
    };
}

define_builtin_matchers! {
    // Reversal (extrema based)
    DoubleTop(DoubleTopMatcher),
    DoubleBottom(DoubleBottomMatcher),
    HeadAndShoulders(HeadAndShouldersMatcher),
    TripleTop(TripleTopMatcher),
    TripleBottom(TripleBottomMatcher),
    InverseHeadAndShoulders(InverseHeadAndShouldersMatcher),
    Dragon(DragonMatcher),
    AdamAndEve(AdamAndEveMatcher),

    // Trend geometry (sliding window)
    Triangle(TriangleMatcher),
    AscendingWedge(AscendingWedgeMatcher),
    DescendingWedge(DescendingWedgeMatcher),
    RisingWedge(RisingWedgeMatcher),
    FallingWedge(FallingWedgeMatcher),
    Channel(ChannelMatcher),
    Rectangle(RectangleMatcher),
    Megaphone(MegaphoneMatcher),
    BumpAndRun(BumpAndRunMatcher),

    // Continuation / rounding
    RoundingBottom(RoundingBottomMatcher),
    CupAndHandle(CupAndHandleMatcher),
    Flag(FlagMatcher),
    Pennant(PennantMatcher),
    DeadCatBounce(DeadCatBounceMatcher),

    // Harmonic
    Abcd(AbcdMatcher),

    // Candlesticks
    Hammer(HammerMatcher),
    BullishEngulfing(BullishEngulfingMatcher),
    BearishEngulfing(BearishEngulfingMatcher),
    MorningStar(MorningStarMatcher),
    EveningStar(EveningStarMatcher),
    Doji(DojiMatcher),
    ShootingStar(ShootingStarMatcher),
    Piercing(PiercingMatcher),
    DarkCloudCover(DarkCloudCoverMatcher),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersMatcher),
    ThreeBlackCrows(ThreeBlackCrowsMatcher),
    Tweezer(TweezerMatcher),
    Harami(HaramiMatcher),
}

/// Generate an array of `BuiltinMatcher` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinMatcher::$variant(Default::default())),*]
  };
}

impl BuiltinMatcher {
    /// Chart-geometry matchers with defaults, in report order
    pub fn chart_defaults() -> Vec<BuiltinMatcher> {
        let mut matchers = Vec::with_capacity(23);
        matchers.extend(builtin_defaults![
            DoubleTop,
            DoubleBottom,
            HeadAndShoulders,
            Triangle,
        ]);
        // "Hammers" sits between the classic and the extended chart families
        matchers.extend(builtin_defaults![Hammer]);
        matchers.extend(builtin_defaults![
            TripleTop,
            TripleBottom,
            RoundingBottom,
            CupAndHandle,
            AscendingWedge,
            DescendingWedge,
            RisingWedge,
            FallingWedge,
            Flag,
            Pennant,
            Channel,
            BumpAndRun,
            Dragon,
            InverseHeadAndShoulders,
            AdamAndEve,
            Megaphone,
            DeadCatBounce,
            Abcd,
            Rectangle,
        ]);
        matchers
    }

    /// Candlestick matchers with defaults (hammers excluded, see `chart_defaults`)
    pub fn candlestick_defaults() -> Vec<BuiltinMatcher> {
        builtin_defaults![
            BullishEngulfing,
            BearishEngulfing,
            MorningStar,
            EveningStar,
            Doji,
            ShootingStar,
            Piercing,
            DarkCloudCover,
            ThreeWhiteSoldiers,
            ThreeBlackCrows,
            Tweezer,
            Harami,
        ]
        .into()
    }

    /// Every builtin matcher, one per [`PatternFamily`], in report order
    pub fn all_defaults() -> Vec<BuiltinMatcher> {
        let mut matchers = Self::chart_defaults();
        matchers.extend(Self::candlestick_defaults());
        matchers
    }
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Reject malformed bars up front instead of skipping them
    pub validate_data: bool,
    pub family_filter: Option<Vec<&'static str>>,
}

/// Main pattern detection engine
pub struct PatternEngine {
    builtin: Vec<BuiltinMatcher>,
    custom: Vec<Box<dyn DynPatternMatcher>>,
    config: EngineConfig,
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PatternEngine {
    /// Engine running every builtin matcher with default parameters
    pub fn with_defaults() -> Self {
        Self {
            builtin: BuiltinMatcher::all_defaults(),
            custom: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Family names this engine reports, in order
    pub fn families(&self) -> Vec<&'static str> {
        self.builtin
            .iter()
            .map(|m| m.family().name())
            .chain(self.custom.iter().map(|m| m.name()))
            .filter(|name| self.should_include(name))
            .collect()
    }

    /// Run every matcher over `bars` and assemble the pattern map.
    ///
    /// Fails only in strict mode (`validate_data`) on malformed bars.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<PatternMap> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }
        Ok(self.scan_lenient(bars))
    }

    /// Run a single family; `None` if the engine has no such matcher
    pub fn scan_family<T: OHLCV>(&self, bars: &[T], name: &str) -> Option<MatcherOutcome> {
        if let Some(m) = self.builtin.iter().find(|m| m.family().name() == name) {
            let family = m.family().name();
            return Some(run_matcher_safely(family, bars.len(), m.min_bars(), || {
                m.scan(bars)
            }));
        }
        let m = self.custom.iter().find(|m| m.name() == name)?;
        let bar_refs: Vec<&dyn OHLCV> = bars.iter().map(|b| b as &dyn OHLCV).collect();
        Some(run_matcher_safely(m.name(), bars.len(), m.min_bars(), || {
            m.scan(&bar_refs)
        }))
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn scan_lenient<T: OHLCV>(&self, bars: &[T]) -> PatternMap {
        let mut map = PatternMap::new();

        // Fast path: builtin matchers (enum dispatch, no vtable)
        for matcher in &self.builtin {
            let name = matcher.family().name();
            if !self.should_include(name) {
                continue;
            }
            let outcome = run_matcher_safely(name, bars.len(), matcher.min_bars(), || {
                matcher.scan(bars)
            });
            map.push(name, outcome);
        }

        // Slow path: custom matchers (vtable)
        if !self.custom.is_empty() {
            let bar_refs: Vec<&dyn OHLCV> = bars.iter().map(|b| b as &dyn OHLCV).collect();
            for matcher in &self.custom {
                let name = matcher.name();
                if !self.should_include(name) {
                    continue;
                }
                let outcome = run_matcher_safely(name, bars.len(), matcher.min_bars(), || {
                    matcher.scan(&bar_refs)
                });
                map.push(name, outcome);
            }
        }

        debug!(
            bars = bars.len(),
            families = map.len(),
            detections = map.total(),
            "pattern scan complete"
        );
        map
    }

    fn should_include(&self, name: &str) -> bool {
        match self.config.family_filter {
            Some(ref filter) => filter.iter().any(|f| *f == name),
            None => true,
        }
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidOHLCV { reason, .. } => {
                    PatternError::InvalidOHLCV { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for m in &self.builtin {
            m.validate_config()?;
        }
        for m in &self.custom {
            m.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Default)]
pub struct EngineBuilder {
    builtin: Vec<BuiltinMatcher>,
    custom: Vec<Box<dyn DynPatternMatcher>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every builtin matcher with default parameters
    pub fn with_all_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinMatcher::all_defaults());
        self
    }

    /// Add chart-geometry matchers (including hammers) with defaults
    pub fn with_chart_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinMatcher::chart_defaults());
        self
    }

    /// Add candlestick matchers with defaults
    pub fn with_candlestick_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinMatcher::candlestick_defaults());
        self
    }

    /// Apply `threshold` / `window` / `order` overrides to the matchers added so far
    pub fn with_params(mut self, params: &params::PatternParams) -> Result<Self> {
        params.validate()?;
        for m in &mut self.builtin {
            m.tune(params);
        }
        Ok(self)
    }

    /// Add a builtin matcher
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, matcher: BuiltinMatcher) -> Self {
        self.builtin.push(matcher);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, matcher: BuiltinMatcher) -> Result<Self> {
        matcher.validate_config()?;
        self.builtin.push(matcher);
        Ok(self)
    }

    /// Add a custom matcher (slow path)
    pub fn add_custom<M: DynPatternMatcher + 'static>(mut self, matcher: M) -> Self {
        self.custom.push(Box::new(matcher));
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Report only the named families
    pub fn only_families(mut self, names: impl IntoIterator<Item = &'static str>) -> Self {
        self.config.family_filter = Some(names.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        let engine = PatternEngine {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// ENTRY POINTS
// ============================================================

/// Run every builtin matcher with default parameters
pub fn detect_all<T: OHLCV>(bars: &[T]) -> PatternMap {
    PatternEngine::with_defaults().scan_lenient(bars)
}

/// Run every builtin matcher, optionally overriding `threshold` / `window` / `order`.
///
/// Fails only when `params` is invalid.
pub fn run_pattern_detection<T: OHLCV>(
    bars: &[T],
    params: Option<&params::PatternParams>,
) -> Result<PatternMap> {
    match params {
        Some(p) => EngineBuilder::new()
            .with_all_defaults()
            .with_params(p)?
            .build()?
            .scan(bars),
        None => Ok(detect_all(bars)),
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub patterns: PatternMap,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(engine: &PatternEngine, instruments: I) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|patterns| ScanResult {
                    symbol: symbol.to_string(),
                    patterns,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self { o, h, l, c }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            1000.0
        }
    }

    fn make_wave_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.5).sin() * 4.0;
                Bar::new(base, base + 1.0, base - 1.0, base + 0.2)
            })
            .collect()
    }

    struct PanickingMatcher;

    impl DynPatternMatcher for PanickingMatcher {
        fn name(&self) -> &'static str {
            "Exploding"
        }

        fn min_bars(&self) -> usize {
            1
        }

        fn scan(&self, _bars: &[&dyn OHLCV]) -> Result<Vec<Detection>> {
            panic!("boom")
        }

        fn validate_config(&self) -> Result<()> {
            Ok(())
        }
    }

    struct FailingMatcher;

    impl DynPatternMatcher for FailingMatcher {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn min_bars(&self) -> usize {
            1
        }

        fn scan(&self, _bars: &[&dyn OHLCV]) -> Result<Vec<Detection>> {
            Err(PatternError::MatcherFailed {
                family: "Failing",
                reason: "bad input".into(),
            })
        }

        fn validate_config(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.02).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(30).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_shadow(), 5.0);
        assert_eq!(bar.lower_shadow(), 10.0);
        assert_eq!(bar.body_mid(), 102.5);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!(bar.is_sound());
        assert!((bar.body_ratio().unwrap() - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_flat_bar_has_no_body_ratio() {
        let bar = Bar::new(100.0, 100.0, 100.0, 100.0);
        assert!(bar.body_ratio().is_none());
        assert!(bar.is_sound());
    }

    #[test]
    fn test_inverted_bar_is_not_sound() {
        let bar = Bar::new(100.0, 95.0, 105.0, 100.0);
        assert!(!bar.is_sound());
        assert!(bar.validate().is_err());
    }

    #[test]
    fn test_detection_accessors() {
        let d = Detection::new(DetectionKind::DoubleTop)
            .anchor("first_top", 3)
            .anchor("second_top", 15)
            .measure("price", 100.0);

        assert_eq!(d.kind(), DetectionKind::DoubleTop);
        assert_eq!(d.index_of("first_top"), Some(3));
        assert_eq!(d.index_of("head"), None);
        assert_eq!(d.value_of("price"), Some(100.0));
        assert_eq!(d.start_index(), Some(3));
        assert_eq!(d.end_index(), Some(15));
        assert_eq!(d.direction(), Some(Direction::Bearish));
    }

    #[test]
    fn test_detection_shifted_leaves_source_unchanged() {
        let d = Detection::new(DetectionKind::Hammer).anchor("index", 4);
        let moved = d.shifted(10);
        assert_eq!(moved.index_of("index"), Some(14));
        assert_eq!(d.index_of("index"), Some(4));
    }

    #[test]
    fn test_family_names_round_trip() {
        for family in PatternFamily::ALL {
            assert_eq!(PatternFamily::from_name(family.name()), Some(family));
        }
        assert_eq!(PatternFamily::from_name("Nope"), None);
    }

    #[test]
    fn test_all_defaults_cover_every_family_once() {
        let families: Vec<_> = BuiltinMatcher::all_defaults()
            .iter()
            .map(|m| m.family())
            .collect();
        assert_eq!(families, PatternFamily::ALL.to_vec());
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_empty_scan() {
        let bars: Vec<Bar> = vec![];
        let map = detect_all(&bars);
        assert_eq!(map.len(), 36);
        assert_eq!(map.total(), 0);
        // Doji needs one bar; everything reports insufficient data
        assert_eq!(map.skipped().count(), 36);
    }

    #[test]
    fn test_insufficient_data_is_skip_not_error() {
        let bars = make_wave_bars(5);
        let map = detect_all(&bars);
        assert_eq!(
            map.outcome("Double Tops").and_then(MatcherOutcome::skip_reason),
            Some(&SkipReason::InsufficientData { need: 10, got: 5 })
        );
        assert!(map.get("Double Tops").is_empty());
        assert!(map.outcome("Doji").unwrap().skip_reason().is_none());
    }

    #[test]
    fn test_panicking_matcher_is_isolated() {
        let engine = EngineBuilder::new()
            .add(BuiltinMatcher::Doji(DojiMatcher::with_defaults()))
            .add_custom(PanickingMatcher)
            .build()
            .unwrap();

        let bars = vec![Bar::new(100.0, 110.0, 90.0, 100.5)];
        let map = engine.scan(&bars).unwrap();
        assert_eq!(map.get("Doji").len(), 1);
        assert_eq!(
            map.outcome("Exploding").and_then(MatcherOutcome::skip_reason),
            Some(&SkipReason::Failed("boom".into()))
        );
    }

    #[test]
    fn test_failing_matcher_is_isolated() {
        let engine = EngineBuilder::new()
            .add_custom(FailingMatcher)
            .add(BuiltinMatcher::Doji(DojiMatcher::with_defaults()))
            .build()
            .unwrap();

        let bars = vec![Bar::new(100.0, 110.0, 90.0, 100.5)];
        let map = engine.scan(&bars).unwrap();
        assert!(matches!(
            map.outcome("Failing").and_then(MatcherOutcome::skip_reason),
            Some(SkipReason::Failed(_))
        ));
        assert_eq!(map.get("Doji").len(), 1);
    }

    #[test]
    fn test_family_filter() {
        let engine = EngineBuilder::new()
            .with_all_defaults()
            .only_families(["Doji", "Harami"])
            .build()
            .unwrap();

        assert_eq!(engine.families(), vec!["Doji", "Harami"]);
        let map = engine.scan(&make_wave_bars(40)).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_scan_family() {
        let engine = PatternEngine::with_defaults();
        let bars = vec![Bar::new(100.0, 110.0, 90.0, 100.5)];
        let outcome = engine.scan_family(&bars, "Doji").unwrap();
        assert_eq!(outcome.detections().len(), 1);
        assert!(engine.scan_family(&bars, "Unknown").is_none());
    }

    #[test]
    fn test_validate_data_rejects_nan() {
        let engine = EngineBuilder::new()
            .with_candlestick_defaults()
            .validate_data(true)
            .build()
            .unwrap();

        let bars = vec![
            Bar::new(100.0, 101.0, 99.0, 100.5),
            Bar::new(100.0, f64::NAN, 99.0, 100.5),
        ];
        match engine.scan(&bars) {
            Err(PatternError::InvalidOHLCV { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidOHLCV, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_scan_tolerates_nan() {
        let mut bars = make_wave_bars(60);
        bars[30] = Bar::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN);
        let map = detect_all(&bars);
        assert_eq!(map.skipped().count(), 0);
    }

    #[test]
    fn test_parallel_scan() {
        let engine = PatternEngine::with_defaults();
        let bars1 = make_wave_bars(80);
        let bars2 = make_wave_bars(120);

        let instruments: Vec<(&str, &[Bar])> = vec![("BTC", &bars1), ("ETH", &bars2)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_detection_kind_serializes_as_tag() {
        let json = serde_json::to_string(&DetectionKind::InverseHeadAndShoulders).unwrap();
        assert_eq!(json, "\"inverse_head_and_shoulders\"");
    }
}
