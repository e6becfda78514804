//! Technical indicators over OHLCV series
//!
//! Every function returns one value per input bar. `None` marks warm-up bars
//! and undefined values (zero denominators, non-finite input).
//!
//! ```
//! use chartsense::{indicators::sma, Period};
//!
//! let out = sma(&[1.0, 2.0, 3.0, 4.0], Period::new_const(2));
//! assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::{detectors::helpers::closes, Period, OHLCV};

pub type Series = Vec<Option<f64>>;

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

// ============================================================
// MOVING AVERAGES
// ============================================================

pub fn sma(values: &[f64], period: Period) -> Series {
    let n = period.get();
    let mut out = vec![None; values.len()];
    for (i, w) in values.windows(n).enumerate() {
        out[i + n - 1] = finite(w.iter().sum::<f64>() / n as f64);
    }
    out
}

/// Exponential moving average, `k = 2 / (period + 1)`, seeded with the SMA of
/// the first `period` values
pub fn ema(values: &[f64], period: Period) -> Series {
    let n = period.get();
    let mut out = vec![None; values.len()];
    if values.len() < n {
        return out;
    }
    let k = 2.0 / (n as f64 + 1.0);
    let mut prev = values[..n].iter().sum::<f64>() / n as f64;
    out[n - 1] = finite(prev);
    for (i, &v) in values.iter().enumerate().skip(n) {
        prev = v * k + prev * (1.0 - k);
        out[i] = finite(prev);
    }
    out
}

/// EMA over the defined tail of a partially-`None` series
fn ema_defined(values: &[Option<f64>], period: Period) -> Series {
    let Some(start) = values.iter().position(Option::is_some) else {
        return vec![None; values.len()];
    };
    let tail: Vec<f64> = values[start..]
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    let mut out = vec![None; start];
    out.extend(ema(&tail, period));
    out
}

// ============================================================
// MOMENTUM
// ============================================================

/// Relative strength index with Wilder smoothing (`1 / period`)
pub fn rsi(values: &[f64], period: Period) -> Series {
    let n = period.get();
    let mut out = vec![None; values.len()];
    if values.len() <= n {
        return out;
    }
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let nf = n as f64;

    let mut gain = changes[..n].iter().map(|c| c.max(0.0)).sum::<f64>() / nf;
    let mut loss = changes[..n].iter().map(|c| (-c).max(0.0)).sum::<f64>() / nf;
    let value = |gain: f64, loss: f64| {
        if loss == 0.0 {
            // Flat window reads as neutral, pure gains as overbought
            if gain == 0.0 {
                Some(50.0)
            } else {
                Some(100.0)
            }
        } else {
            finite(100.0 - 100.0 / (1.0 + gain / loss))
        }
    };

    out[n] = value(gain, loss);
    for (i, &c) in changes.iter().enumerate().skip(n) {
        gain = (gain * (nf - 1.0) + c.max(0.0)) / nf;
        loss = (loss * (nf - 1.0) + (-c).max(0.0)) / nf;
        out[i + 1] = value(gain, loss);
    }
    out
}

/// Rate of change in percent over `period` bars
pub fn roc(values: &[f64], period: Period) -> Series {
    let n = period.get();
    (0..values.len())
        .map(|i| {
            let base = values[i.checked_sub(n)?];
            if base == 0.0 {
                return None;
            }
            finite((values[i] - base) / base * 100.0)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macd {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

pub fn macd(values: &[f64], fast: Period, slow: Period, signal: Period) -> Macd {
    let fast = ema(values, fast);
    let slow = ema(values, slow);
    let line: Series = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal = ema_defined(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();
    Macd {
        line,
        signal,
        histogram,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stochastic {
    pub k: Series,
    pub d: Series,
}

/// %K over `period` bars, %D as the `smooth`-bar SMA of %K
pub fn stochastic<T: OHLCV>(bars: &[T], period: Period, smooth: Period) -> Stochastic {
    let n = period.get();
    let mut k = vec![None; bars.len()];
    for (i, w) in bars.windows(n).enumerate() {
        let hh = w.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
        let ll = w.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        let close = w[n - 1].close();
        if hh > ll {
            k[i + n - 1] = finite((close - ll) / (hh - ll) * 100.0);
        }
    }

    let s = smooth.get();
    let mut d = vec![None; bars.len()];
    for (i, w) in k.windows(s).enumerate() {
        let sum: Option<f64> = w.iter().copied().sum();
        d[i + s - 1] = sum.map(|sum| sum / s as f64);
    }
    Stochastic { k, d }
}

// ============================================================
// VOLATILITY
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bollinger {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// SMA middle band, `k` population standard deviations either side
pub fn bollinger(values: &[f64], period: Period, k: f64) -> Bollinger {
    let n = period.get();
    let middle = sma(values, period);
    let mut upper = vec![None; values.len()];
    let mut lower = vec![None; values.len()];
    for (i, w) in values.windows(n).enumerate() {
        let idx = i + n - 1;
        let Some(mean) = middle[idx] else { continue };
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let sd = var.sqrt();
        upper[idx] = finite(mean + k * sd);
        lower[idx] = finite(mean - k * sd);
    }
    Bollinger {
        upper,
        middle,
        lower,
    }
}

/// `max(H-L, |H-prevC|, |L-prevC|)`; the first bar uses `H-L`
fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let hl = b.high() - b.low();
            match i.checked_sub(1).map(|p| bars[p].close()) {
                Some(pc) => hl.max((b.high() - pc).abs()).max((b.low() - pc).abs()),
                None => hl,
            }
        })
        .collect()
}

/// Average true range with Wilder smoothing; first value at bar `period`
pub fn atr<T: OHLCV>(bars: &[T], period: Period) -> Series {
    let n = period.get();
    let mut out = vec![None; bars.len()];
    if bars.len() <= n {
        return out;
    }
    let tr = true_range(bars);
    let nf = n as f64;
    let mut prev = tr[1..=n].iter().sum::<f64>() / nf;
    out[n] = finite(prev);
    for i in n + 1..bars.len() {
        prev = (prev * (nf - 1.0) + tr[i]) / nf;
        out[i] = finite(prev);
    }
    out
}

// ============================================================
// TREND STRENGTH
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adx {
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

/// Wilder's directional movement system
///
/// DI values start at bar `period`, ADX at bar `2 * period - 1`.
pub fn adx<T: OHLCV>(bars: &[T], period: Period) -> Adx {
    let n = period.get();
    let len = bars.len();
    let mut plus_di = vec![None; len];
    let mut minus_di = vec![None; len];
    let mut adx = vec![None; len];
    if len <= n {
        return Adx {
            adx,
            plus_di,
            minus_di,
        };
    }

    let tr = true_range(bars);
    let (mut plus_dm, mut minus_dm) = (vec![0.0; len], vec![0.0; len]);
    for i in 1..len {
        let up = bars[i].high() - bars[i - 1].high();
        let down = bars[i - 1].low() - bars[i].low();
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let nf = n as f64;
    let (mut s_tr, mut s_plus, mut s_minus) = (
        tr[1..=n].iter().sum::<f64>(),
        plus_dm[1..=n].iter().sum::<f64>(),
        minus_dm[1..=n].iter().sum::<f64>(),
    );
    let mut dx = vec![None; len];
    for i in n..len {
        if i > n {
            s_tr = s_tr - s_tr / nf + tr[i];
            s_plus = s_plus - s_plus / nf + plus_dm[i];
            s_minus = s_minus - s_minus / nf + minus_dm[i];
        }
        if s_tr > 0.0 {
            let p = 100.0 * s_plus / s_tr;
            let m = 100.0 * s_minus / s_tr;
            plus_di[i] = finite(p);
            minus_di[i] = finite(m);
            dx[i] = if p + m > 0.0 {
                finite(100.0 * (p - m).abs() / (p + m))
            } else {
                Some(0.0)
            };
        }
    }

    let first = 2 * n - 1;
    if first < len {
        let seed: Option<f64> = dx[n..=first].iter().copied().sum();
        if let Some(seed) = seed {
            let mut prev = seed / nf;
            adx[first] = finite(prev);
            for i in first + 1..len {
                let Some(d) = dx[i] else { break };
                prev = (prev * (nf - 1.0) + d) / nf;
                adx[i] = finite(prev);
            }
        }
    }

    Adx {
        adx,
        plus_di,
        minus_di,
    }
}

// ============================================================
// VOLUME
// ============================================================

/// On-balance volume; the first bar contributes its full volume
pub fn obv<T: OHLCV>(bars: &[T]) -> Series {
    let mut total = 0.0;
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let falling = i > 0 && b.close() < bars[i - 1].close();
            total += if falling { -b.volume() } else { b.volume() };
            finite(total)
        })
        .collect()
}

/// Volume-weighted typical price over a rolling window
pub fn rolling_vwap<T: OHLCV>(bars: &[T], period: Period) -> Series {
    let n = period.get();
    let mut out = vec![None; bars.len()];
    for (i, w) in bars.windows(n).enumerate() {
        let vol: f64 = w.iter().map(|b| b.volume()).sum();
        if vol > 0.0 {
            let pv: f64 = w
                .iter()
                .map(|b| (b.high() + b.low() + b.close()) / 3.0 * b.volume())
                .sum();
            out[i + n - 1] = finite(pv / vol);
        }
    }
    out
}

// ============================================================
// DASHBOARD SET
// ============================================================

const fn p(n: usize) -> Period {
    Period::new_const(n)
}

/// Standard indicator columns computed together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub sma_20: Series,
    pub sma_50: Series,
    pub sma_200: Series,
    pub ema_20: Series,
    pub ema_50: Series,
    pub rsi: Series,
    pub macd: Macd,
    pub bollinger: Bollinger,
    pub stochastic: Stochastic,
    pub vwap: Series,
    pub atr: Series,
    pub adx: Adx,
    pub obv: Series,
    pub roc: Series,
}

impl IndicatorSet {
    pub fn compute<T: OHLCV>(bars: &[T]) -> Self {
        let close = closes(bars);
        let set = Self {
            sma_20: sma(&close, p(20)),
            sma_50: sma(&close, p(50)),
            sma_200: sma(&close, p(200)),
            ema_20: ema(&close, p(20)),
            ema_50: ema(&close, p(50)),
            rsi: rsi(&close, p(14)),
            macd: macd(&close, p(12), p(26), p(9)),
            bollinger: bollinger(&close, p(20), 2.0),
            stochastic: stochastic(bars, p(14), p(3)),
            vwap: rolling_vwap(bars, p(14)),
            atr: atr(bars, p(14)),
            adx: adx(bars, p(14)),
            obv: obv(bars),
            roc: roc(&close, p(12)),
        };
        debug!(bars = bars.len(), "indicator set computed");
        set
    }
}
