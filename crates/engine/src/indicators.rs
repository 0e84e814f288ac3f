//! Technical indicators over a close-price series
//!
//! Every function here is total: short history yields a documented neutral
//! or degenerate value instead of an error. Nothing keeps state between
//! calls; the full snapshot is rebuilt from the series on every tick.

use serde::{Deserialize, Serialize};
use ta::indicators::{BollingerBands as BollingerIndicator, ExponentialMovingAverage};
use ta::Next;

use crate::config::IndicatorParams;
use crate::types::Trend;

/// ATR is never reported below this fraction of the current price
pub const ATR_FLOOR_PCT: f64 = 0.0015;

/// Retracement ratios, scanned in this order by [`nearest_fib_retracement`]
pub const FIB_RETRACEMENT_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];
pub const FIB_EXTENSION_RATIOS: [f64; 4] = [1.272, 1.618, 2.0, 2.618];

/// Points needed for pivots: a 23-point proxy period plus the live price
pub const PIVOT_MIN_HISTORY: usize = 24;
const PIVOT_WINDOW: usize = PIVOT_MIN_HISTORY - 1;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

// ============================================================================
// Trend
// ============================================================================

/// Exponential moving average with `k = 2 / (period + 1)`, seeded with the
/// first price.
///
/// With fewer than `period` prices the input is returned unchanged. That
/// passthrough is not a smoothed series.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if data.len() < period {
        return data.to_vec();
    }
    match ExponentialMovingAverage::new(period) {
        Ok(mut ema) => data.iter().map(|&p| ema.next(p)).collect(),
        Err(_) => data.to_vec(),
    }
}

/// Simple moving average over a trailing window.
///
/// Indices before the window fills carry the raw price, and a series shorter
/// than `period` is returned unchanged.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return data.to_vec();
    }
    data.iter()
        .enumerate()
        .map(|(i, &price)| {
            if i + 1 < period {
                price
            } else {
                data[i + 1 - period..=i].iter().sum::<f64>() / period as f64
            }
        })
        .collect()
}

// ============================================================================
// Momentum
// ============================================================================

/// Relative strength index from summed gains and losses of the trailing
/// `period` changes.
///
/// Returns 50 with fewer than `period + 1` prices and 100 when the window has
/// no losses.
pub fn rsi(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return 50.0;
    }

    let (gain, loss) = data[data.len() - period - 1..]
        .windows(2)
        .fold((0.0, 0.0), |(gain, loss), w| {
            let diff = w[1] - w[0];
            if diff > 0.0 {
                (gain + diff, loss)
            } else {
                (gain, loss - diff)
            }
        });

    if loss == 0.0 {
        return 100.0;
    }

    let rs = gain / loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram at the latest price
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdResult {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD(12, 26, 9). All zero with fewer than 26 prices.
pub fn macd(data: &[f64]) -> MacdResult {
    if data.len() < MACD_SLOW {
        return MacdResult::default();
    }

    let fast = ema(data, MACD_FAST);
    let slow = ema(data, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, MACD_SIGNAL);

    let line = last(&line);
    let signal = last(&signal);
    MacdResult {
        line,
        signal,
        histogram: line - signal,
    }
}

/// Stochastic oscillator. %D is not smoothed and always equals %K.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self { k: 50.0, d: 50.0 }
    }
}

/// %K of the latest price within the trailing `period` range.
///
/// Neutral 50 on short history or a flat window.
pub fn stochastic(prices: &[f64], period: usize) -> Stochastic {
    if period == 0 || prices.len() < period {
        return Stochastic::default();
    }

    let (lowest, highest) = min_max(&prices[prices.len() - period..]);
    let current = last(prices);
    let range = highest - lowest;

    let k = if range == 0.0 {
        50.0
    } else {
        (current - lowest) / range * 100.0
    };

    Stochastic { k, d: k }
}

// ============================================================================
// Volatility
// ============================================================================

fn atr_floor(price: f64) -> f64 {
    price.abs() * ATR_FLOOR_PCT
}

/// Close-to-close ATR: mean absolute change over the trailing window, never
/// below 0.15% of the current price.
///
/// Returns 0 with fewer than `period + 1` prices.
pub fn atr(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 0.0;
    }

    let mean_move = prices[prices.len() - period - 1..]
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f64>()
        / period as f64;

    mean_move.max(atr_floor(last(prices)))
}

/// ATR from proper true ranges, with the same floor as [`atr`].
///
/// Series of different lengths are truncated to the shortest one.
pub fn true_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || n < period + 1 {
        return 0.0;
    }

    let sum: f64 = (n - period..n)
        .map(|i| {
            let prev_close = closes[i - 1];
            (highs[i] - lows[i])
                .max((highs[i] - prev_close).abs())
                .max((lows[i] - prev_close).abs())
        })
        .sum();

    (sum / period as f64).max(atr_floor(closes[n - 1]))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bollinger {
    pub fn bandwidth(&self) -> f64 {
        self.upper - self.lower
    }
}

/// SMA(period) ± multiplier × population standard deviation of the trailing
/// window. All zero with fewer than `period` prices.
pub fn bollinger_bands(data: &[f64], period: usize, multiplier: f64) -> Bollinger {
    if period == 0 || data.len() < period {
        return Bollinger::default();
    }
    let Ok(mut bb) = BollingerIndicator::new(period, multiplier) else {
        return Bollinger::default();
    };

    data[data.len() - period..]
        .iter()
        .map(|&p| bb.next(p))
        .last()
        .map(|out| Bollinger {
            upper: out.upper,
            middle: out.average,
            lower: out.lower,
        })
        .unwrap_or_default()
}

// ============================================================================
// Trend strength
// ============================================================================

/// ADX approximation from close prices only.
///
/// Each tick is treated as a bar with high = low = close, so true range and
/// directional movement come from close-to-close changes. Returns 0 on short
/// history or a flat window.
pub fn adx(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 0.0;
    }

    let mut plus_dm = 0.0;
    let mut minus_dm = 0.0;
    let mut tr = 0.0;

    for w in prices[prices.len() - period - 1..].windows(2) {
        let (prev, price) = (w[0], w[1]);
        tr += (price - prev).abs();

        let up_move = price - prev;
        let down_move = prev - price;
        if up_move > down_move && up_move > 0.0 {
            plus_dm += up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm += down_move;
        }
    }

    if tr == 0.0 {
        return 0.0;
    }

    let plus_di = plus_dm / tr * 100.0;
    let minus_di = minus_dm / tr * 100.0;
    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        return 0.0;
    }

    (plus_di - minus_di).abs() / di_sum * 100.0
}

// ============================================================================
// Levels
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Min and max over the trailing `lookback` prices (clamped to what exists)
pub fn support_resistance(prices: &[f64], lookback: usize) -> SupportResistance {
    if prices.is_empty() {
        return SupportResistance::default();
    }
    let lookback = lookback.clamp(1, prices.len());
    let (support, resistance) = min_max(&prices[prices.len() - lookback..]);
    SupportResistance {
        support,
        resistance,
    }
}

/// A named Fibonacci level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

impl FibLevel {
    /// e.g. "61.8%"
    pub fn label(&self) -> String {
        format!("{:.1}%", self.ratio * 100.0)
    }
}

/// Retracement and extension levels of the swing in the lookback window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fibonacci {
    pub high: f64,
    pub low: f64,
    pub trend: Trend,
    /// In [`FIB_RETRACEMENT_RATIOS`] order
    pub retracements: [FibLevel; 5],
    /// In [`FIB_EXTENSION_RATIOS`] order
    pub extensions: [FibLevel; 4],
}

impl Fibonacci {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn retracement(&self, ratio: f64) -> Option<FibLevel> {
        self.retracements
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-9)
            .copied()
    }
}

/// Fibonacci levels of the swing inside the trailing `lookback` prices.
///
/// The swing is bullish when the high comes after the low; retracements are
/// then measured down from the high and extensions projected above it. A
/// bearish swing mirrors this from the low. `None` for an empty series.
pub fn fibonacci(prices: &[f64], lookback: usize) -> Option<Fibonacci> {
    if prices.is_empty() {
        return None;
    }
    let lookback = lookback.clamp(1, prices.len());
    let window = &prices[prices.len() - lookback..];

    let mut high_idx = 0;
    let mut low_idx = 0;
    for (i, &p) in window.iter().enumerate() {
        if p > window[high_idx] {
            high_idx = i;
        }
        if p < window[low_idx] {
            low_idx = i;
        }
    }

    let high = window[high_idx];
    let low = window[low_idx];
    let range = high - low;
    let trend = if high_idx > low_idx {
        Trend::Bullish
    } else {
        Trend::Bearish
    };

    let retracements = FIB_RETRACEMENT_RATIOS.map(|ratio| FibLevel {
        ratio,
        price: match trend {
            Trend::Bullish => high - range * ratio,
            Trend::Bearish => low + range * ratio,
        },
    });
    let extensions = FIB_EXTENSION_RATIOS.map(|ratio| FibLevel {
        ratio,
        price: match trend {
            Trend::Bullish => high + range * (ratio - 1.0),
            Trend::Bearish => low - range * (ratio - 1.0),
        },
    });

    Some(Fibonacci {
        high,
        low,
        trend,
        retracements,
        extensions,
    })
}

/// Closest level within `tolerance` of `price`.
///
/// Levels are scanned in slice order and only a strictly closer level
/// replaces the current best, so the earlier level wins a tie.
pub fn nearest_fib_retracement(price: f64, levels: &[FibLevel], tolerance: f64) -> Option<FibLevel> {
    let mut best: Option<(FibLevel, f64)> = None;
    for level in levels {
        let distance = (price - level.price).abs();
        if distance > tolerance {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((*level, distance));
        }
    }
    best.map(|(level, _)| level)
}

/// Classic floor-trader pivots
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pp: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

/// Pivots from the 23 prices before the latest one, used as the previous
/// period's high/low/close. All zero with fewer than 24 prices.
pub fn pivot_points(prices: &[f64]) -> PivotPoints {
    if prices.len() < PIVOT_MIN_HISTORY {
        return PivotPoints::default();
    }

    let end = prices.len() - 1;
    let window = &prices[end - PIVOT_WINDOW..end];
    let (low, high) = min_max(window);
    let close = last(window);

    let pp = (high + low + close) / 3.0;
    PivotPoints {
        pp,
        r1: 2.0 * pp - low,
        r2: pp + (high - low),
        r3: high + 2.0 * (pp - low),
        s1: 2.0 * pp - high,
        s2: pp - (high - low),
        s3: low - 2.0 * (high - pp),
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Every indicator value for a single tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub macd: MacdResult,
    pub bollinger: Bollinger,
    pub stochastic: Stochastic,
    pub adx: f64,
    pub atr: f64,
    pub levels: SupportResistance,
    pub fibonacci: Option<Fibonacci>,
    pub pivots: PivotPoints,
}

impl IndicatorSnapshot {
    /// Compute the full snapshot from scratch. `None` for an empty series.
    pub fn compute(prices: &[f64], params: &IndicatorParams) -> Option<Self> {
        let price = *prices.last()?;

        Some(Self {
            price,
            ema_fast: last(&ema(prices, params.ema_fast)),
            ema_mid: last(&ema(prices, params.ema_mid)),
            ema_slow: last(&ema(prices, params.ema_slow)),
            rsi: rsi(prices, params.rsi_period),
            macd: macd(prices),
            bollinger: bollinger_bands(prices, params.bb_period, params.bb_multiplier),
            stochastic: stochastic(prices, params.stoch_period),
            adx: adx(prices, params.adx_period),
            atr: atr(prices, params.atr_period),
            levels: support_resistance(prices, params.sr_lookback),
            fibonacci: fibonacci(prices, params.fib_lookback),
            pivots: pivot_points(prices),
        })
    }
}
