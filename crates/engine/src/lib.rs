//! XAU Signal Engine: indicator-driven BUY/SELL/WAIT decisions for gold
//!
//! Pure and synchronous. Provides:
//! - Indicator library (EMA, RSI, MACD, ATR, Bollinger, Stochastic, ADX, levels)
//! - Session classifier over the UTC hour
//! - Session-aware confirmation scoring for both directions
//! - ATR sizing with percentage floors and a risk/reward gate
//! - Signal assembly with edge-triggered de-duplication

pub mod config;
pub mod confirmation;
pub mod indicators;
pub mod risk;
pub mod series;
pub mod session;
pub mod signal;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, EngineConfig, IndicatorParams, SessionPolicy, StrategyMode};
pub use confirmation::{Confirmation, Scorecard};
pub use indicators::IndicatorSnapshot;
pub use risk::{RiskLevels, RiskOutcome, MIN_RISK_REWARD};
pub use series::PriceSeries;
pub use session::{current_session, Session, SessionKind};
pub use signal::{SignalEngine, Tick};
pub use types::{Action, SignalRecord, Trend, Volatility};
