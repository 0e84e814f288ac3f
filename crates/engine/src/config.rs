//! Engine configuration
//!
//! Strategy mode and session policy are parsed once at startup and passed
//! explicitly into every component. Unknown values are rejected here so the
//! engine never sees an invalid configuration mid-computation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown strategy mode: {0} (expected SCALPING or LONG)")]
    UnknownStrategyMode(String),

    #[error("Unknown session policy: {0} (expected AUTO, LONDON_NY, ASIA or ALL)")]
    UnknownSessionPolicy(String),

    #[error("Polling interval must be at least 1 second")]
    InvalidPollingInterval,
}

/// Trading style. Scalping is the aggressive mode, Long the conservative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyMode {
    Scalping,
    Long,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalping => "SCALPING",
            Self::Long => "LONG",
        }
    }

    pub fn is_aggressive(&self) -> bool {
        matches!(self, Self::Scalping)
    }

    /// Maximum number of prices kept in the rolling buffer
    pub fn buffer_capacity(&self) -> usize {
        match self {
            Self::Scalping => 120,
            Self::Long => 300,
        }
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        match self {
            Self::Scalping => IndicatorParams {
                ema_fast: 9,
                ema_mid: 21,
                ema_slow: 50,
                sr_lookback: 30,
                fib_lookback: 50,
                min_history: 60,
                ..IndicatorParams::default()
            },
            Self::Long => IndicatorParams {
                ema_fast: 20,
                ema_mid: 50,
                ema_slow: 100,
                sr_lookback: 60,
                fib_lookback: 100,
                min_history: 110,
                ..IndicatorParams::default()
            },
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCALPING" | "AGGRESSIVE" => Ok(Self::Scalping),
            "LONG" | "CONSERVATIVE" => Ok(Self::Long),
            _ => Err(ConfigError::UnknownStrategyMode(s.to_string())),
        }
    }
}

/// Which trading windows the engine is allowed to act in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPolicy {
    /// Follow the clock
    Auto,
    /// London, the London–New York overlap and New York only
    #[serde(rename = "LONDON_NY")]
    LondonNewYork,
    /// Asia only
    Asia,
    /// Every session, including off-hours (dead hours still excluded)
    #[serde(rename = "ALL")]
    AlwaysOn,
}

impl SessionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::LondonNewYork => "LONDON_NY",
            Self::Asia => "ASIA",
            Self::AlwaysOn => "ALL",
        }
    }
}

impl fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "AUTO" => Ok(Self::Auto),
            "LONDON_NY" | "LONDON_NEW_YORK" | "FORCE_PRIMARY" => Ok(Self::LondonNewYork),
            "ASIA" | "FORCE_SECONDARY" => Ok(Self::Asia),
            "ALL" | "ALWAYS_ON" => Ok(Self::AlwaysOn),
            _ => Err(ConfigError::UnknownSessionPolicy(s.to_string())),
        }
    }
}

/// Periods and lookbacks used to build an indicator snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub bb_period: usize,
    pub bb_multiplier: f64,
    pub stoch_period: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    /// Support/resistance window
    pub sr_lookback: usize,
    /// Swing window for Fibonacci levels
    pub fib_lookback: usize,
    /// Prices required before any signal is considered
    pub min_history: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_fast: 9,
            ema_mid: 21,
            ema_slow: 50,
            rsi_period: 14,
            bb_period: 20,
            bb_multiplier: 2.0,
            stoch_period: 14,
            adx_period: 14,
            atr_period: 14,
            sr_lookback: 30,
            fib_lookback: 50,
            min_history: 60,
        }
    }
}

/// Configuration threaded through every engine call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: StrategyMode,
    pub session_policy: SessionPolicy,
    /// Only used by the polling loop; engine logic ignores it
    pub polling_interval: Duration,
}

impl EngineConfig {
    pub fn new(
        mode: StrategyMode,
        session_policy: SessionPolicy,
        polling_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if polling_interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidPollingInterval);
        }
        Ok(Self {
            mode,
            session_policy,
            polling_interval,
        })
    }

    /// Parse mode and policy from their textual names
    pub fn parse(mode: &str, session_policy: &str, polling_secs: u64) -> Result<Self, ConfigError> {
        Self::new(
            mode.parse()?,
            session_policy.parse()?,
            Duration::from_secs(polling_secs),
        )
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        self.mode.indicator_params()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.mode.buffer_capacity()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Scalping,
            session_policy: SessionPolicy::Auto,
            polling_interval: Duration::from_secs(15),
        }
    }
}
