//! Stop-loss and take-profit sizing
//!
//! Distances start from ATR multiples and are floored at a percentage of
//! price per session and mode, so a quiet ATR never yields an implausibly
//! tight stop or target. Scalping may swap targets for Fibonacci extensions.
//! Candidates whose first target pays less than 1.3× the risk are rejected.

use serde::{Deserialize, Serialize};

use crate::config::StrategyMode;
use crate::indicators::Fibonacci;
use crate::session::{Session, SessionKind};
use crate::types::{Trend, Volatility};

/// Smallest acceptable TP1 distance / stop distance
pub const MIN_RISK_REWARD: f64 = 1.3;

/// Stop and three target values, either ATR multiples or percent of price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub stop: f64,
    pub targets: [f64; 3],
}

impl LevelSet {
    const fn new(stop: f64, tp1: f64, tp2: f64, tp3: f64) -> Self {
        Self {
            stop,
            targets: [tp1, tp2, tp3],
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            stop: self.stop * factor,
            targets: self.targets.map(|t| t * factor),
        }
    }
}

/// Accepted stop and targets for a candidate signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profits: [f64; 3],
    pub risk_reward: f64,
    /// At least one target was replaced by a Fibonacci extension
    pub fib_targets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskOutcome {
    Accepted(RiskLevels),
    Rejected { risk_reward: f64, reason: String },
}

/// ATR multiples by session and mode, widened in busy London/New York hours
pub fn atr_multipliers(session: &Session, mode: StrategyMode) -> LevelSet {
    if session.is_asia_session() {
        return match mode {
            StrategyMode::Scalping => LevelSet::new(1.2, 1.6, 2.4, 3.6),
            StrategyMode::Long => LevelSet::new(1.6, 2.4, 4.0, 6.0),
        };
    }

    let base = match mode {
        StrategyMode::Scalping => LevelSet::new(1.5, 2.0, 3.0, 4.5),
        StrategyMode::Long => LevelSet::new(2.0, 3.0, 5.0, 8.0),
    };
    match session.volatility {
        Volatility::VeryHigh => base.scaled(1.20),
        Volatility::High => base.scaled(1.15),
        _ => base,
    }
}

/// Minimum distances in percent of price, one set per session and mode
pub fn floor_pcts(session: &Session, mode: StrategyMode) -> LevelSet {
    use StrategyMode::{Long, Scalping};

    match (session.kind, mode) {
        (SessionKind::LondonNyOverlap, Scalping) => LevelSet::new(0.18, 0.27, 0.42, 0.65),
        (SessionKind::LondonNyOverlap, Long) => LevelSet::new(0.35, 0.55, 0.90, 1.40),
        (SessionKind::NewYork, Scalping) => LevelSet::new(0.16, 0.24, 0.38, 0.60),
        (SessionKind::NewYork, Long) => LevelSet::new(0.32, 0.50, 0.80, 1.30),
        (SessionKind::Asia, Scalping) => LevelSet::new(0.10, 0.15, 0.25, 0.40),
        (SessionKind::Asia, Long) => LevelSet::new(0.20, 0.30, 0.50, 0.80),
        (_, Scalping) => LevelSet::new(0.15, 0.22, 0.35, 0.55),
        (_, Long) => LevelSet::new(0.30, 0.45, 0.75, 1.20),
    }
}

/// The larger of the ATR-derived distance and its floor
pub fn apply_floor(raw_distance: f64, floor_distance: f64) -> f64 {
    raw_distance.max(floor_distance)
}

fn offset(trend: Trend, price: f64, distance: f64) -> f64 {
    match trend {
        Trend::Bullish => price + distance,
        Trend::Bearish => price - distance,
    }
}

/// Size stop and targets for a candidate in direction `trend`
pub fn size(
    trend: Trend,
    price: f64,
    atr: f64,
    session: &Session,
    mode: StrategyMode,
    fibonacci: Option<&Fibonacci>,
) -> RiskOutcome {
    let multipliers = atr_multipliers(session, mode);
    let floors = floor_pcts(session, mode);
    let floor_distance = |pct: f64| price * pct / 100.0;

    let stop_distance = apply_floor(atr * multipliers.stop, floor_distance(floors.stop));
    let target_distances: Vec<f64> = multipliers
        .targets
        .iter()
        .zip(floors.targets)
        .map(|(m, pct)| apply_floor(atr * m, floor_distance(pct)))
        .collect();

    let stop_loss = offset(trend, price, -stop_distance);
    let mut take_profits = [0.0; 3];
    for (tp, &distance) in take_profits.iter_mut().zip(&target_distances) {
        *tp = offset(trend, price, distance);
    }

    let mut fib_targets = false;
    if let Some(fib) = fibonacci.filter(|f| mode.is_aggressive() && f.trend == trend) {
        for ((tp, &distance), extension) in take_profits
            .iter_mut()
            .zip(&target_distances)
            .zip(&fib.extensions)
        {
            let ext_distance = match trend {
                Trend::Bullish => extension.price - price,
                Trend::Bearish => price - extension.price,
            };
            if ext_distance > 0.0 && ext_distance < 2.0 * distance {
                *tp = extension.price;
                fib_targets = true;
            }
        }
    }

    let risk_reward = if stop_distance > 0.0 {
        (take_profits[0] - price).abs() / stop_distance
    } else {
        0.0
    };

    if risk_reward < MIN_RISK_REWARD {
        return RiskOutcome::Rejected {
            risk_reward,
            reason: format!(
                "Risk/Reward 1:{:.2} below minimum 1:{:.2}",
                risk_reward, MIN_RISK_REWARD
            ),
        };
    }

    RiskOutcome::Accepted(RiskLevels {
        stop_loss,
        take_profits,
        risk_reward,
        fib_targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionPolicy;
    use crate::indicators::fibonacci;
    use crate::session::classify;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn accepted(outcome: RiskOutcome) -> RiskLevels {
        match outcome {
            RiskOutcome::Accepted(levels) => levels,
            RiskOutcome::Rejected { reason, .. } => panic!("unexpected rejection: {reason}"),
        }
    }

    #[test]
    fn test_floor_used_when_atr_is_tiny() {
        let london = classify(9, SessionPolicy::Auto);
        let levels = accepted(size(Trend::Bullish, 4600.0, 0.0, &london, StrategyMode::Scalping, None));
        assert_close(levels.stop_loss, 4600.0 - 6.9);
        assert_close(levels.take_profits[0], 4600.0 + 4600.0 * 0.0022);
        assert_close(levels.take_profits[2], 4600.0 + 4600.0 * 0.0055);
        assert_close(levels.risk_reward, 0.22 / 0.15);
        assert!(!levels.fib_targets);
    }

    #[test]
    fn test_atr_distance_with_high_volatility_scale() {
        let london = classify(9, SessionPolicy::Auto);
        let levels = accepted(size(Trend::Bullish, 4600.0, 10.0, &london, StrategyMode::Scalping, None));
        assert_close(levels.stop_loss, 4600.0 - 17.25);
        assert_close(levels.take_profits[0], 4600.0 + 23.0);
        assert_close(levels.take_profits[1], 4600.0 + 34.5);
        assert_close(levels.take_profits[2], 4600.0 + 51.75);
        assert_close(levels.risk_reward, 23.0 / 17.25);
    }

    #[test]
    fn test_sell_levels_mirror_buy() {
        let overlap = classify(13, SessionPolicy::Auto);
        let buy = accepted(size(Trend::Bullish, 4600.0, 10.0, &overlap, StrategyMode::Long, None));
        let sell = accepted(size(Trend::Bearish, 4600.0, 10.0, &overlap, StrategyMode::Long, None));
        assert_close(4600.0 - buy.stop_loss, sell.stop_loss - 4600.0);
        for i in 0..3 {
            assert_close(buy.take_profits[i] - 4600.0, 4600.0 - sell.take_profits[i]);
        }
        assert!(sell.stop_loss > 4600.0);
        assert!(sell.take_profits[2] < sell.take_profits[0]);
    }

    #[test]
    fn test_asia_multipliers_ignore_volatility_scale() {
        let asia = classify(5, SessionPolicy::Auto);
        assert_eq!(
            atr_multipliers(&asia, StrategyMode::Scalping),
            LevelSet::new(1.2, 1.6, 2.4, 3.6)
        );
        let new_york = classify(18, SessionPolicy::Auto);
        let ny = atr_multipliers(&new_york, StrategyMode::Long);
        assert_close(ny.stop, 2.0 * 1.15);
        let overlap = classify(13, SessionPolicy::Auto);
        assert_close(atr_multipliers(&overlap, StrategyMode::Long).stop, 2.0 * 1.20);
    }

    #[test]
    fn test_eight_distinct_floor_sets() {
        let mut sets = Vec::new();
        for hour in [9, 13, 18, 5] {
            let session = classify(hour, SessionPolicy::Auto);
            for mode in [StrategyMode::Scalping, StrategyMode::Long] {
                sets.push(floor_pcts(&session, mode));
            }
        }
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                assert_ne!(a, b);
            }
        }
        // off-hours under ALWAYS_ON falls back to the London set
        let off = classify(22, SessionPolicy::AlwaysOn);
        let london = classify(9, SessionPolicy::Auto);
        assert_eq!(
            floor_pcts(&off, StrategyMode::Scalping),
            floor_pcts(&london, StrategyMode::Scalping)
        );
    }

    #[test]
    fn test_dead_hours_follow_the_asia_session_rule() {
        let dead = classify(3, SessionPolicy::Auto);
        let london = classify(9, SessionPolicy::Auto);
        assert!(!dead.is_asia_session());
        for mode in [StrategyMode::Scalping, StrategyMode::Long] {
            assert_eq!(floor_pcts(&dead, mode), floor_pcts(&london, mode));
            assert_ne!(
                atr_multipliers(&dead, mode),
                atr_multipliers(&classify(5, SessionPolicy::Auto), mode)
            );
        }
    }

    #[test]
    fn test_apply_floor() {
        assert_eq!(apply_floor(3.0, 6.9), 6.9);
        assert_eq!(apply_floor(12.0, 6.9), 12.0);
    }

    #[test]
    fn test_fib_extensions_replace_targets_when_scalping() {
        let london = classify(9, SessionPolicy::Auto);
        // swing 4560 -> 4610, extensions at 4623.6, 4640.9, 4660.0
        let fib = fibonacci(&[4560.0, 4610.0], 2).unwrap();
        let levels = accepted(size(
            Trend::Bullish,
            4600.0,
            10.0,
            &london,
            StrategyMode::Scalping,
            Some(&fib),
        ));
        assert!(levels.fib_targets);
        assert_close(levels.take_profits[0], 4610.0 + 50.0 * 0.272);
        assert_close(levels.take_profits[1], 4610.0 + 50.0 * 0.618);
        assert_close(levels.take_profits[2], 4660.0);
        assert_close(levels.risk_reward, (50.0 * 0.272 + 10.0) / 17.25);
    }

    #[test]
    fn test_fib_extensions_ignored_in_long_mode_or_against_trend() {
        let london = classify(9, SessionPolicy::Auto);
        let fib = fibonacci(&[4560.0, 4610.0], 2).unwrap();

        let long = accepted(size(Trend::Bullish, 4600.0, 10.0, &london, StrategyMode::Long, Some(&fib)));
        assert!(!long.fib_targets);

        let against = accepted(size(
            Trend::Bearish,
            4600.0,
            10.0,
            &london,
            StrategyMode::Scalping,
            Some(&fib),
        ));
        assert!(!against.fib_targets);
    }

    #[test]
    fn test_fib_extension_beyond_sanity_bound_is_skipped() {
        let london = classify(9, SessionPolicy::Auto);
        // range 400: first extension at 4708.8, more than 2 × 23 away
        let fib = fibonacci(&[4200.0, 4600.0], 2).unwrap();
        let levels = accepted(size(
            Trend::Bullish,
            4600.0,
            10.0,
            &london,
            StrategyMode::Scalping,
            Some(&fib),
        ));
        assert!(!levels.fib_targets);
        assert_close(levels.take_profits[0], 4623.0);
    }

    #[test]
    fn test_low_risk_reward_is_rejected() {
        let london = classify(9, SessionPolicy::Auto);
        // narrow swing pulls TP1 to 4607.72 against a 17.25 stop
        let fib = fibonacci(&[4595.0, 4605.0], 2).unwrap();
        match size(Trend::Bullish, 4600.0, 10.0, &london, StrategyMode::Scalping, Some(&fib)) {
            RiskOutcome::Rejected { risk_reward, reason } => {
                assert!(risk_reward < MIN_RISK_REWARD);
                assert!(reason.contains("below minimum 1:1.30"), "{reason}");
            }
            RiskOutcome::Accepted(levels) => panic!("accepted with R:R {}", levels.risk_reward),
        }
    }
}
