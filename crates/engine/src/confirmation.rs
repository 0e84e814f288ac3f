//! Multi-factor confirmation scoring
//!
//! The bullish and bearish hypotheses are scored independently against the
//! same snapshot. Each satisfied check adds its weight and a reason line.
//! London/New York sessions use a trend-following check list; the Asia
//! session swaps the EMA stack and ADX checks for range and bounce checks and
//! asks for more confirmations before a signal is allowed.

use serde::{Deserialize, Serialize};

use crate::config::StrategyMode;
use crate::indicators::{nearest_fib_retracement, FibLevel, IndicatorSnapshot};
use crate::session::Session;
use crate::types::{Trend, Volatility};

/// Highest attainable score in the London/New York check list
pub const PRIMARY_MAX_SCORE: u32 = 12;
/// Highest attainable score in the Asia check list
pub const ASIA_MAX_SCORE: u32 = 12;

const ADX_TREND_THRESHOLD: f64 = 25.0;
const ADX_TREND_THRESHOLD_VERY_HIGH: f64 = 30.0;
/// Max distance of price from the fast EMA for the Asia alignment check
const ASIA_EMA_MAX_GAP_PCT: f64 = 0.003;
/// Share of the Bollinger bandwidth counted as "at the band"
const BAND_BOUNCE_ZONE: f64 = 0.10;
/// Retracements that count as a pullback entry
const PULLBACK_RATIOS: [f64; 3] = [0.382, 0.5, 0.618];

/// Votes collected for one hypothesis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub count: u32,
    pub reasons: Vec<String>,
}

impl Confirmation {
    fn add(&mut self, weight: u32, reason: impl Into<String>) {
        self.count += weight;
        self.reasons.push(reason.into());
    }

    pub fn meets(&self, threshold: u32) -> bool {
        self.count >= threshold
    }
}

/// Both hypotheses plus the bar they have to clear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub bullish: Confirmation,
    pub bearish: Confirmation,
    pub threshold: u32,
    pub max_score: u32,
}

impl Scorecard {
    pub fn bullish_confirmed(&self) -> bool {
        self.bullish.meets(self.threshold)
    }

    pub fn bearish_confirmed(&self) -> bool {
        self.bearish.meets(self.threshold)
    }

    pub fn confidence(&self, trend: Trend) -> u8 {
        let count = match trend {
            Trend::Bullish => self.bullish.count,
            Trend::Bearish => self.bearish.count,
        };
        confidence(count, self.max_score)
    }
}

/// Confirmations needed before a signal may be emitted
pub fn min_confirmations(session: &Session, mode: StrategyMode) -> u32 {
    match (session.is_asia_session(), mode.is_aggressive()) {
        (true, true) => 5,
        (true, false) => 6,
        (false, true) => 4,
        (false, false) => 5,
    }
}

/// Map a score onto 50–100
pub fn confidence(count: u32, max_score: u32) -> u8 {
    if max_score == 0 {
        return 0;
    }
    let ratio = (count as f64 / max_score as f64).min(1.0);
    (50.0 + 50.0 * ratio).round().clamp(0.0, 100.0) as u8
}

/// How close counts as "at" a level
pub fn level_tolerance(snapshot: &IndicatorSnapshot) -> f64 {
    (snapshot.atr * 0.5).max(snapshot.price * 0.001)
}

/// Score both hypotheses for the given session
pub fn score(snapshot: &IndicatorSnapshot, session: &Session, mode: StrategyMode) -> Scorecard {
    let (bullish, bearish, max_score) = if session.is_asia_session() {
        (
            score_asia(snapshot, Trend::Bullish),
            score_asia(snapshot, Trend::Bearish),
            ASIA_MAX_SCORE,
        )
    } else {
        (
            score_primary(snapshot, session, Trend::Bullish),
            score_primary(snapshot, session, Trend::Bearish),
            PRIMARY_MAX_SCORE,
        )
    };

    Scorecard {
        bullish,
        bearish,
        threshold: min_confirmations(session, mode),
        max_score,
    }
}

/// `a` is on the trend side of `b`: above for bullish, below for bearish
fn beyond(trend: Trend, a: f64, b: f64) -> bool {
    match trend {
        Trend::Bullish => a > b,
        Trend::Bearish => a < b,
    }
}

fn label(trend: Trend) -> &'static str {
    match trend {
        Trend::Bullish => "bullish",
        Trend::Bearish => "bearish",
    }
}

fn side(trend: Trend) -> &'static str {
    match trend {
        Trend::Bullish => "above",
        Trend::Bearish => "below",
    }
}

fn pullback_levels(snapshot: &IndicatorSnapshot, trend: Trend) -> Option<Vec<FibLevel>> {
    let fib = snapshot.fibonacci.as_ref()?;
    if fib.trend != trend || fib.range() <= 0.0 {
        return None;
    }
    Some(
        PULLBACK_RATIOS
            .iter()
            .filter_map(|&ratio| fib.retracement(ratio))
            .collect(),
    )
}

fn check_key_level(snapshot: &IndicatorSnapshot, trend: Trend, tolerance: f64, votes: &mut Confirmation) {
    let price = snapshot.price;
    match trend {
        Trend::Bullish => {
            if snapshot.levels.support > 0.0 && (price - snapshot.levels.support).abs() <= tolerance {
                votes.add(2, format!("Price at support {:.2}", snapshot.levels.support));
            }
        }
        Trend::Bearish => {
            if snapshot.levels.resistance > 0.0
                && (price - snapshot.levels.resistance).abs() <= tolerance
            {
                votes.add(2, format!("Price at resistance {:.2}", snapshot.levels.resistance));
            }
        }
    }
}

fn check_fib_pullback(snapshot: &IndicatorSnapshot, trend: Trend, tolerance: f64, votes: &mut Confirmation) {
    let Some(levels) = pullback_levels(snapshot, trend) else {
        return;
    };
    if let Some(level) = nearest_fib_retracement(snapshot.price, &levels, tolerance) {
        votes.add(
            2,
            format!(
                "Fibonacci {} pullback at {:.2} in {} swing",
                level.label(),
                level.price,
                label(trend)
            ),
        );
    }
}

fn score_primary(snapshot: &IndicatorSnapshot, session: &Session, trend: Trend) -> Confirmation {
    let mut votes = Confirmation::default();
    let s = snapshot;
    let tolerance = level_tolerance(s);

    if beyond(trend, s.price, s.ema_fast)
        && beyond(trend, s.ema_fast, s.ema_mid)
        && beyond(trend, s.ema_mid, s.ema_slow)
    {
        votes.add(1, format!("Triple EMA stack {}", label(trend)));
    }

    let rsi_momentum = match trend {
        Trend::Bullish => s.rsi > 50.0 && s.rsi < 70.0,
        Trend::Bearish => s.rsi > 30.0 && s.rsi < 50.0,
    };
    if rsi_momentum {
        votes.add(1, format!("RSI {:.1} {} momentum", s.rsi, label(trend)));
    }

    if beyond(trend, s.macd.line, s.macd.signal) && beyond(trend, s.macd.histogram, 0.0) {
        votes.add(1, format!("MACD {} signal line", side(trend)));
    }

    if beyond(trend, s.macd.line, 0.0) {
        votes.add(1, format!("MACD {:.2} {} zero", s.macd.line, side(trend)));
    }

    let adx_threshold = if session.volatility == Volatility::VeryHigh {
        ADX_TREND_THRESHOLD_VERY_HIGH
    } else {
        ADX_TREND_THRESHOLD
    };
    if s.adx > adx_threshold && beyond(trend, s.ema_fast, s.ema_mid) {
        votes.add(
            1,
            format!("ADX {:.1} strong {} trend (>{:.0})", s.adx, label(trend), adx_threshold),
        );
    }

    let stoch_momentum = match trend {
        Trend::Bullish => s.stochastic.k > 50.0 && s.stochastic.k < 80.0,
        Trend::Bearish => s.stochastic.k > 20.0 && s.stochastic.k < 50.0,
    };
    if stoch_momentum {
        votes.add(1, format!("Stochastic %K {:.1} {}", s.stochastic.k, label(trend)));
    }

    if s.bollinger.middle > 0.0 {
        let inside = match trend {
            Trend::Bullish => s.price > s.bollinger.middle && s.price < s.bollinger.upper,
            Trend::Bearish => s.price < s.bollinger.middle && s.price > s.bollinger.lower,
        };
        if inside {
            let band = match trend {
                Trend::Bullish => "upper",
                Trend::Bearish => "lower",
            };
            votes.add(1, format!("Price between Bollinger middle and {} band", band));
        }
    }

    check_key_level(s, trend, tolerance, &mut votes);
    check_fib_pullback(s, trend, tolerance, &mut votes);

    if s.pivots.pp > 0.0 && beyond(trend, s.price, s.pivots.pp) {
        votes.add(1, format!("Price {} pivot {:.2}", side(trend), s.pivots.pp));
    }

    votes
}

fn score_asia(snapshot: &IndicatorSnapshot, trend: Trend) -> Confirmation {
    let mut votes = Confirmation::default();
    let s = snapshot;
    let tolerance = level_tolerance(s);

    if beyond(trend, s.ema_fast, s.ema_mid)
        && s.price > 0.0
        && (s.price - s.ema_fast).abs() / s.price <= ASIA_EMA_MAX_GAP_PCT
    {
        votes.add(1, format!("EMA fast/mid aligned {}, price hugging fast EMA", label(trend)));
    }

    let rsi_range = match trend {
        Trend::Bullish => s.rsi > 50.0 && s.rsi <= 60.0,
        Trend::Bearish => s.rsi >= 40.0 && s.rsi < 50.0,
    };
    if rsi_range {
        votes.add(1, format!("RSI {:.1} in {} range", s.rsi, label(trend)));
    }

    let bounce = match trend {
        Trend::Bullish => (s.rsi < 35.0 || s.stochastic.k < 20.0) && s.macd.histogram > 0.0,
        Trend::Bearish => (s.rsi > 65.0 || s.stochastic.k > 80.0) && s.macd.histogram < 0.0,
    };
    if bounce {
        let zone = match trend {
            Trend::Bullish => "Oversold",
            Trend::Bearish => "Overbought",
        };
        votes.add(
            1,
            format!("{} bounce (RSI {:.1}, %K {:.1})", zone, s.rsi, s.stochastic.k),
        );
    }

    if beyond(trend, s.macd.histogram, 0.0) {
        votes.add(1, format!("MACD histogram {:.3} {}", s.macd.histogram, label(trend)));
    }

    if beyond(trend, s.macd.line, 0.0) {
        votes.add(1, format!("MACD line {:.2} {}", s.macd.line, label(trend)));
    }

    let bandwidth = s.bollinger.bandwidth();
    if s.bollinger.middle > 0.0 && bandwidth > 0.0 {
        let zone = bandwidth * BAND_BOUNCE_ZONE;
        let at_band = match trend {
            Trend::Bullish => s.price <= s.bollinger.lower + zone,
            Trend::Bearish => s.price >= s.bollinger.upper - zone,
        };
        if at_band {
            let band = match trend {
                Trend::Bullish => "lower",
                Trend::Bearish => "upper",
            };
            votes.add(2, format!("Bollinger {} band bounce", band));
        }
    }

    check_key_level(s, trend, tolerance, &mut votes);
    check_fib_pullback(s, trend, tolerance, &mut votes);

    if s.pivots.pp > 0.0 {
        let (past_pivot, level, name) = match trend {
            Trend::Bullish => (s.price > s.pivots.pp, s.pivots.s1, "S1"),
            Trend::Bearish => (s.price < s.pivots.pp, s.pivots.r1, "R1"),
        };
        if past_pivot {
            votes.add(1, format!("Price {} pivot {:.2}", side(trend), s.pivots.pp));
        } else if (s.price - level).abs() <= tolerance {
            votes.add(1, format!("Price at pivot {} {:.2}", name, level));
        }
    }

    votes
}
