//! Signal assembly and notification de-duplication
//!
//! [`SignalEngine::evaluate`] is a pure function of the price series, the
//! clock and the configuration. The only state carried between ticks is the
//! action of the last emitted record, used to notify once per edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::confirmation::{score, Scorecard};
use crate::indicators::IndicatorSnapshot;
use crate::risk::{size, RiskOutcome};
use crate::series::PriceSeries;
use crate::session::{current_session, Session};
use crate::types::{Action, SignalRecord, Trend};

/// Outcome of one tick: the record and whether it should be delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub record: SignalRecord,
    pub emit: bool,
}

pub struct SignalEngine {
    config: EngineConfig,
    last_emitted: Option<Action>,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            last_emitted: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Action of the most recently emitted record
    pub fn last_emitted(&self) -> Option<Action> {
        self.last_emitted
    }

    /// Evaluate the series at `now` without touching the dedup marker
    pub fn evaluate(&self, series: &PriceSeries, now: DateTime<Utc>) -> SignalRecord {
        let session = current_session(now, self.config.session_policy);
        let Some(price) = series.last() else {
            return SignalRecord::wait(0.0, session.name(), vec!["No price data".to_string()], now);
        };

        if !session.is_trading_session() {
            return SignalRecord::wait(
                price,
                session.name(),
                vec![format!("Outside trading hours: {}", session.description)],
                now,
            );
        }

        let params = self.config.indicator_params();
        if series.len() < params.min_history {
            return SignalRecord::wait(
                price,
                session.name(),
                vec![format!(
                    "Collecting price history ({}/{})",
                    series.len(),
                    params.min_history
                )],
                now,
            );
        }

        match IndicatorSnapshot::compute(series.as_slice(), &params) {
            Some(snapshot) => self.decide(&snapshot, &session, now),
            None => SignalRecord::wait(price, session.name(), vec!["No price data".to_string()], now),
        }
    }

    /// Turn a snapshot into a record: score, pick a direction, size, gate
    pub fn decide(
        &self,
        snapshot: &IndicatorSnapshot,
        session: &Session,
        now: DateTime<Utc>,
    ) -> SignalRecord {
        let mode = self.config.mode;
        let card = score(snapshot, session, mode);

        debug!(
            session = session.name(),
            price = snapshot.price,
            bullish = card.bullish.count,
            bearish = card.bearish.count,
            threshold = card.threshold,
            "Scored snapshot"
        );

        let Some((trend, conflict)) = pick_direction(&card) else {
            return SignalRecord::wait(
                snapshot.price,
                session.name(),
                vec![format!(
                    "Insufficient confirmations: bullish {}/{}, bearish {}/{}",
                    card.bullish.count, card.threshold, card.bearish.count, card.threshold
                )],
                now,
            );
        };

        if conflict {
            warn!(
                bullish = card.bullish.count,
                bearish = card.bearish.count,
                "Both directions confirmed, keeping SELL"
            );
        }

        let levels = match size(
            trend,
            snapshot.price,
            snapshot.atr,
            session,
            mode,
            snapshot.fibonacci.as_ref(),
        ) {
            RiskOutcome::Accepted(levels) => levels,
            RiskOutcome::Rejected {
                risk_reward,
                reason,
            } => {
                debug!(action = %trend.action(), risk_reward, "Candidate rejected");
                let mut record =
                    SignalRecord::wait(snapshot.price, session.name(), vec![reason], now);
                record.risk_reward = risk_reward;
                return record;
            }
        };

        let votes = match trend {
            Trend::Bullish => &card.bullish,
            Trend::Bearish => &card.bearish,
        };
        let mut reasons = votes.reasons.clone();
        if conflict {
            reasons.push(format!(
                "Conflict: bullish {} and bearish {} both confirmed, SELL kept",
                card.bullish.count, card.bearish.count
            ));
        }
        if levels.fib_targets {
            reasons.push("Targets adjusted to Fibonacci extensions".to_string());
        }

        SignalRecord {
            action: trend.action(),
            entry: snapshot.price,
            stop_loss: levels.stop_loss,
            take_profit_1: levels.take_profits[0],
            take_profit_2: levels.take_profits[1],
            take_profit_3: levels.take_profits[2],
            risk_reward: levels.risk_reward,
            confidence: card.confidence(trend),
            reasons,
            session: session.name().to_string(),
            generated_at: now,
        }
    }

    /// A record is emitted when it is actionable and differs from the last
    /// emitted action. WAIT never re-arms.
    pub fn should_emit(&self, record: &SignalRecord) -> bool {
        record.action.is_actionable() && self.last_emitted != Some(record.action)
    }

    /// Update the dedup marker if `record` is to be emitted.
    ///
    /// Records with non-finite numbers are refused and leave the marker as is.
    pub fn commit(&mut self, record: &SignalRecord) -> bool {
        if !record.is_finite() {
            error!(action = %record.action, "Discarding record with non-finite values");
            return false;
        }
        if !self.should_emit(record) {
            return false;
        }
        self.last_emitted = Some(record.action);
        true
    }

    /// Evaluate and commit in one step
    pub fn on_tick(&mut self, series: &PriceSeries, now: DateTime<Utc>) -> Tick {
        let record = self.evaluate(series, now);
        let emit = self.commit(&record);
        Tick { record, emit }
    }
}

/// Bullish is checked first and a confirmed bearish side overwrites it.
/// The flag reports that both sides cleared the threshold.
fn pick_direction(card: &Scorecard) -> Option<(Trend, bool)> {
    let mut picked = None;
    if card.bullish_confirmed() {
        picked = Some(Trend::Bullish);
    }
    if card.bearish_confirmed() {
        let conflict = picked.is_some();
        return Some((Trend::Bearish, conflict));
    }
    picked.map(|trend| (trend, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SessionPolicy, StrategyMode};
    use crate::indicators::{Bollinger, MacdResult, PivotPoints, Stochastic, SupportResistance};
    use crate::session::classify;
    use chrono::TimeZone;
    use std::time::Duration;

    fn engine(mode: StrategyMode) -> SignalEngine {
        SignalEngine::new(EngineConfig::new(mode, SessionPolicy::Auto, Duration::from_secs(15)).unwrap())
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap()
    }

    fn series(prices: Vec<f64>) -> PriceSeries {
        PriceSeries::from_prices(&prices, 300)
    }

    fn rising(n: usize) -> PriceSeries {
        series((0..n).map(|i| 4500.0 + i as f64).collect())
    }

    fn falling(n: usize) -> PriceSeries {
        series((0..n).map(|i| 4800.0 - i as f64).collect())
    }

    #[test]
    fn test_wait_outside_trading_hours() {
        let record = engine(StrategyMode::Long).evaluate(&rising(150), at_hour(22));
        assert_eq!(record.action, Action::Wait);
        assert_eq!(record.session, "OFF_HOURS");
        assert!(record.reasons[0].starts_with("Outside trading hours"));
    }

    #[test]
    fn test_wait_while_collecting_history() {
        let record = engine(StrategyMode::Long).evaluate(&rising(30), at_hour(9));
        assert_eq!(record.action, Action::Wait);
        assert_eq!(record.reasons, vec!["Collecting price history (30/110)".to_string()]);
        assert_eq!(record.entry, 4529.0);
    }

    #[test]
    fn test_wait_on_empty_series() {
        let record = engine(StrategyMode::Scalping).evaluate(&series(vec![]), at_hour(9));
        assert_eq!(record.action, Action::Wait);
        assert_eq!(record.entry, 0.0);
    }

    #[test]
    fn test_steady_uptrend_is_a_buy() {
        let record = engine(StrategyMode::Long).evaluate(&rising(150), at_hour(9));
        assert_eq!(record.action, Action::Buy, "{:?}", record.reasons);
        assert!(record.stop_loss < record.entry);
        assert!(record.take_profit_1 > record.entry);
        assert!(record.take_profit_3 > record.take_profit_2);
        assert!(record.risk_reward >= 1.3);
        assert!(record.confidence > 50);
        assert_eq!(record.session, "LONDON");
    }

    #[test]
    fn test_steady_downtrend_is_a_sell() {
        let record = engine(StrategyMode::Long).evaluate(&falling(150), at_hour(18));
        assert_eq!(record.action, Action::Sell, "{:?}", record.reasons);
        assert!(record.stop_loss > record.entry);
        assert!(record.take_profit_1 < record.entry);
    }

    #[test]
    fn test_poor_risk_reward_downgrades_to_wait() {
        // scalping pulls TP1 to the 127.2% extension of a tight swing
        let record = engine(StrategyMode::Scalping).evaluate(&rising(120), at_hour(9));
        assert_eq!(record.action, Action::Wait);
        assert!(record.reasons[0].contains("below minimum 1:1.30"), "{:?}", record.reasons);
        assert!(record.risk_reward < 1.3);
    }

    fn conflicting_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            price: 4600.0,
            ema_fast: 4598.0,
            ema_mid: 4595.0,
            ema_slow: 4590.0,
            rsi: 45.0,
            macd: MacdResult {
                line: 1.0,
                signal: 0.5,
                histogram: 0.5,
            },
            bollinger: Bollinger::default(),
            stochastic: Stochastic { k: 40.0, d: 40.0 },
            adx: 35.0,
            atr: 6.9,
            levels: SupportResistance {
                support: 4500.0,
                resistance: 4601.0,
            },
            fibonacci: None,
            pivots: PivotPoints::default(),
        }
    }

    #[test]
    fn test_conflict_keeps_sell_and_says_so() {
        let engine = engine(StrategyMode::Scalping);
        let london = classify(9, SessionPolicy::Auto);
        let record = engine.decide(&conflicting_snapshot(), &london, at_hour(9));
        assert_eq!(record.action, Action::Sell);
        assert!(record.reasons.iter().any(|r| r.starts_with("Conflict")));
    }

    #[test]
    fn test_dedup_emits_once_for_repeated_buy() {
        let mut engine = engine(StrategyMode::Long);
        let prices = rising(150);
        let emitted = (0..5)
            .map(|_| engine.on_tick(&prices, at_hour(9)))
            .filter(|t| t.emit)
            .count();
        assert_eq!(emitted, 1);
        assert_eq!(engine.last_emitted(), Some(Action::Buy));
    }

    #[test]
    fn test_wait_does_not_rearm() {
        let mut engine = engine(StrategyMode::Long);
        let prices = rising(150);
        assert!(engine.on_tick(&prices, at_hour(9)).emit);

        let off = engine.on_tick(&prices, at_hour(22));
        assert_eq!(off.record.action, Action::Wait);
        assert!(!off.emit);

        assert!(!engine.on_tick(&prices, at_hour(9)).emit);
    }

    #[test]
    fn test_opposite_action_rearms() {
        let mut engine = engine(StrategyMode::Long);
        assert!(engine.on_tick(&rising(150), at_hour(9)).emit);
        assert!(engine.on_tick(&falling(150), at_hour(9)).emit);
        assert!(engine.on_tick(&rising(150), at_hour(9)).emit);
        assert_eq!(engine.last_emitted(), Some(Action::Buy));
    }

    #[test]
    fn test_non_finite_record_is_not_committed() {
        let mut engine = engine(StrategyMode::Long);
        let mut record = engine.evaluate(&rising(150), at_hour(9));
        record.stop_loss = f64::NAN;
        assert!(!engine.commit(&record));
        assert_eq!(engine.last_emitted(), None);
    }
}
