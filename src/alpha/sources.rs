//! Prioritized metric providers
//!
//! Fetching lives outside the crate. Callers wrap each provider in a
//! [`MetricsSource`] and [`collect_metrics`] merges them: every metric group
//! comes from the first source that reports any member of that group.

use tracing::debug;

use super::MarketMetrics;

fn known(x: Option<f64>) -> bool {
    x.is_some_and(f64::is_finite)
}

/// Open-interest level (USD) and its 24h change in percent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpenInterest {
    pub level: Option<f64>,
    pub change_24h_pct: Option<f64>,
}

impl OpenInterest {
    /// From an OI history, oldest first. The change compares the last value
    /// against the first; it is unknown with fewer than two values or a zero
    /// base.
    pub fn from_history(values: &[f64]) -> Self {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        match values.as_slice() {
            [first, .., last] => Self {
                level: Some(*last),
                change_24h_pct: (*first != 0.0).then(|| (last - first) / first * 100.0),
            },
            _ => Self::default(),
        }
    }

    pub fn is_known(&self) -> bool {
        known(self.level) || known(self.change_24h_pct)
    }
}

/// Long/short ratios for top-trader accounts and positions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LongShort {
    pub accounts: Option<f64>,
    pub positions: Option<f64>,
}

impl LongShort {
    pub fn is_known(&self) -> bool {
        known(self.accounts) || known(self.positions)
    }
}

/// 24h liquidation volume per side, USD
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Liquidations {
    pub long_usd: Option<f64>,
    pub short_usd: Option<f64>,
}

impl Liquidations {
    /// Summed totals; a zero side is reported as unknown
    pub fn from_totals(long_usd: f64, short_usd: f64) -> Self {
        let side = |v: f64| (v.is_finite() && v > 0.0).then_some(v);
        Self {
            long_usd: side(long_usd),
            short_usd: side(short_usd),
        }
    }

    pub fn is_known(&self) -> bool {
        known(self.long_usd) || known(self.short_usd)
    }
}

/// One derivatives-data provider. Every query may come back empty.
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &str;

    fn funding_rate(&self, symbol: &str) -> Option<f64>;

    fn open_interest(&self, symbol: &str) -> OpenInterest;

    fn long_short(&self, symbol: &str) -> LongShort;

    fn liquidations(&self, symbol: &str) -> Liquidations;

    /// Top-trader position ratios, oldest first
    fn top_trader_series(&self, _symbol: &str) -> Vec<f64> {
        Vec::new()
    }
}

/// First non-empty answer across `sources`, in priority order
fn first_known<'a, V>(
    sources: &[&'a dyn MetricsSource],
    group: &'static str,
    query: impl Fn(&'a dyn MetricsSource) -> V,
    is_known: impl Fn(&V) -> bool,
) -> Option<V> {
    sources.iter().find_map(|&source| {
        let value = query(source);
        is_known(&value).then(|| {
            debug!(group, source = source.name(), "metric group resolved");
            value
        })
    })
}

/// Merge metrics for `symbol` from `sources`, highest priority first.
///
/// Returns the merged metrics and the first non-empty top-trader series.
pub fn collect_metrics(
    sources: &[&dyn MetricsSource],
    symbol: &str,
) -> (MarketMetrics, Vec<f64>) {
    let funding = first_known(sources, "funding", |s| s.funding_rate(symbol), |v| known(*v))
        .flatten();
    let oi = first_known(sources, "open_interest", |s| s.open_interest(symbol), OpenInterest::is_known)
        .unwrap_or_default();
    let ls = first_known(sources, "long_short", |s| s.long_short(symbol), LongShort::is_known)
        .unwrap_or_default();
    let liq = first_known(sources, "liquidations", |s| s.liquidations(symbol), Liquidations::is_known)
        .unwrap_or_default();
    let series = first_known(
        sources,
        "top_trader_series",
        |s| s.top_trader_series(symbol),
        |v: &Vec<f64>| !v.is_empty(),
    )
    .unwrap_or_default();

    let metrics = MarketMetrics {
        funding_rate_8h: funding,
        oi_level: oi.level,
        oi_change_24h_pct: oi.change_24h_pct,
        ls_accounts: ls.accounts,
        ls_positions: ls.positions,
        liq_24h_long_usd: liq.long_usd,
        liq_24h_short_usd: liq.short_usd,
    };
    (metrics, series)
}

// ============================================================
// SYMBOLS
// ============================================================

const QUOTE_SUFFIXES: [&str; 4] = ["USDT", "USDC", "USD", "PERP"];

/// Base asset: `"btc/usdt"` and `"BTCUSDT"` both give `"BTC"`
pub fn base_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    let mut base = upper.split('/').next().unwrap_or_default();
    for suffix in QUOTE_SUFFIXES {
        if let Some(stripped) = base.strip_suffix(suffix) {
            if !stripped.is_empty() {
                base = stripped;
                break;
            }
        }
    }
    base.to_string()
}

/// USDT-margined perpetual contract: `"BTC"` gives `"BTCUSDT"`
pub fn perp_symbol(symbol: &str) -> String {
    let joined: String = symbol.trim().to_uppercase().replace('/', "");
    if joined.ends_with("USDT") {
        joined
    } else {
        joined + "USDT"
    }
}
