//! Types shared across the signal engine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally visible decision of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Wait,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Wait => "WAIT",
        }
    }

    /// BUY and SELL are actionable, WAIT never is
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Wait)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a price swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    /// The action that trades with this trend
    pub fn action(&self) -> Action {
        match self {
            Self::Bullish => Action::Buy,
            Self::Bearish => Action::Sell,
        }
    }
}

/// Volatility tier of a trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Volatility {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory signal produced on every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub action: Action,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub take_profit_3: f64,
    /// Distance to TP1 divided by distance to the stop
    pub risk_reward: f64,
    /// 0–100
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub session: String,
    pub generated_at: DateTime<Utc>,
}

impl SignalRecord {
    /// A WAIT record with no levels set
    pub fn wait(
        entry: f64,
        session: impl Into<String>,
        reasons: Vec<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: Action::Wait,
            entry,
            stop_loss: 0.0,
            take_profit_1: 0.0,
            take_profit_2: 0.0,
            take_profit_3: 0.0,
            risk_reward: 0.0,
            confidence: 0,
            reasons,
            session: session.into(),
            generated_at,
        }
    }

    /// True when every price level is a finite number
    pub fn is_finite(&self) -> bool {
        [
            self.entry,
            self.stop_loss,
            self.take_profit_1,
            self.take_profit_2,
            self.take_profit_3,
            self.risk_reward,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
