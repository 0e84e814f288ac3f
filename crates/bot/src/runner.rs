//! Polling loop: fetch, append, evaluate, notify
//!
//! Ticks are serialized. Notifications run on a `JoinSet` and may overlap the
//! next tick; they never touch the price buffer or the dedup marker. A tick
//! whose evaluation panics or yields non-finite levels leaves both as they
//! were. On shutdown the loop stops ticking and waits for pending deliveries.

use chrono::{DateTime, Utc};
use engine::{current_session, EngineConfig, PriceSeries, SignalEngine, SignalRecord};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::feed::PriceFeed;
use crate::message::{format_signal, format_startup};
use crate::notify::Notifier;

type Evaluator = fn(&SignalEngine, &PriceSeries, DateTime<Utc>) -> SignalRecord;

pub struct Runner {
    engine: SignalEngine,
    evaluate: Evaluator,
    series: PriceSeries,
    feed: Box<dyn PriceFeed>,
    notifier: Arc<dyn Notifier>,
    symbol: String,
    in_flight: JoinSet<()>,
}

impl Runner {
    pub fn new(
        config: EngineConfig,
        feed: Box<dyn PriceFeed>,
        notifier: Arc<dyn Notifier>,
        symbol: impl Into<String>,
    ) -> Self {
        let series = PriceSeries::new(config.buffer_capacity());
        Self {
            engine: SignalEngine::new(config),
            evaluate: SignalEngine::evaluate,
            series,
            feed,
            notifier,
            symbol: symbol.into(),
            in_flight: JoinSet::new(),
        }
    }

    #[cfg(test)]
    fn series(&self) -> &PriceSeries {
        &self.series
    }

    /// Queue the startup message
    pub fn announce(&mut self, now: DateTime<Utc>) {
        let text = format_startup(self.engine.config(), &self.symbol, now);
        self.dispatch(text);
    }

    /// One polling step. Returns the record when it was emitted.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Option<SignalRecord> {
        let config = self.engine.config();
        let session = current_session(now, config.session_policy);
        if !session.is_trading_session() {
            info!(session = session.name(), "Outside trading session, waiting");
            return None;
        }

        let price = match self.feed.latest_price().await {
            Ok(price) => price,
            Err(e) => {
                error!(feed = self.feed.name(), error = %e, "Price fetch failed");
                return None;
            }
        };
        let mut candidate = self.series.clone();
        if !candidate.push(price) {
            warn!(price, "Price rejected");
            return None;
        }
        info!(price = %format!("{:.2}", price), buffered = candidate.len(), "Price fetched");

        let evaluate = self.evaluate;
        let engine = &self.engine;
        let record = match catch_unwind(AssertUnwindSafe(|| evaluate(engine, &candidate, now))) {
            Ok(record) => record,
            Err(_) => {
                error!("Evaluation panicked, skipping tick");
                return None;
            }
        };
        if !record.is_finite() {
            error!(action = %record.action, "Evaluation produced non-finite levels, skipping tick");
            return None;
        }
        self.series = candidate;

        if !self.engine.commit(&record) {
            debug!(action = %record.action, reasons = ?record.reasons, "No new signal");
            return None;
        }

        info!(
            action = %record.action,
            entry = record.entry,
            stop_loss = record.stop_loss,
            risk_reward = record.risk_reward,
            confidence = record.confidence,
            "Signal emitted"
        );
        let text = format_signal(&record, self.engine.config(), &self.symbol);
        self.dispatch(text);
        Some(record)
    }

    fn dispatch(&mut self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        self.in_flight.spawn(async move {
            if let Err(e) = notifier.send(&text).await {
                error!(error = %e, "Notification failed");
            }
        });
    }

    /// Wait for every queued notification
    pub async fn drain(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Notification task failed");
            }
        }
    }

    /// Tick on the polling interval until `shutdown` resolves
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.engine.config().polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(result) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "Notification task failed");
                    }
                }
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
            }
        }

        info!(pending = self.in_flight.len(), "Waiting for pending notifications");
        self.drain().await;
        info!("Stopped");
    }
}
