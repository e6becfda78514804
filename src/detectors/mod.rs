//! Whole-series pattern matchers
//!
//! Every matcher scans the full series and emits [`Detection`](crate::Detection)
//! records in ascending scan order.
//!
//! # Matcher Families
//!
//! - **Reversal (8)**: Double/Triple tops and bottoms, Head & Shoulders, Dragon, Adam & Eve
//! - **Trend (9)**: Triangles, Wedges, Channels, Rectangle, Megaphone, Bump & Run
//! - **Continuation (5)**: Rounding Bottom, Cup & Handle, Flags, Pennants, Dead Cat Bounce
//! - **Harmonic (1)**: ABCD
//! - **Candlestick (13)**: Hammers, Engulfing, Stars, Doji, Harami, etc.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple matcher types.
macro_rules! impl_with_defaults {
  ($($matcher:ty),* $(,)?) => {
    $(impl $matcher {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod candlestick;
pub mod continuation;
pub mod harmonic;
pub mod reversal;
pub mod trend;

// Re-export all matchers for convenience
pub use candlestick::*;
pub use continuation::*;
pub use harmonic::*;
pub use helpers::*;
pub use reversal::*;
pub use trend::*;
