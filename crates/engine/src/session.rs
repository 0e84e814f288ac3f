//! Trading session classification
//!
//! Sessions are derived from the UTC hour alone and recomputed on every call.
//!
//! | UTC hours   | Session            | Active | Volatility |
//! |-------------|--------------------|--------|------------|
//! | 02:00–03:59 | ASIA_DEAD_HOURS    | no     | VERY_LOW   |
//! | 23:00–06:59 | ASIA               | yes    | MODERATE   |
//! | 07:00–11:59 | LONDON             | yes    | HIGH       |
//! | 12:00–15:59 | LONDON_NY_OVERLAP  | yes    | VERY_HIGH  |
//! | 16:00–20:59 | NEW_YORK           | yes    | HIGH       |
//! | 21:00–22:59 | OFF_HOURS          | no     | LOW        |

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::config::SessionPolicy;
use crate::types::Volatility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    AsiaDeadHours,
    Asia,
    London,
    LondonNyOverlap,
    NewYork,
    OffHours,
    /// Policy restricts trading to London/New York and neither is open
    WaitingLondonNy,
    /// Policy restricts trading to Asia and it is not open
    WaitingAsia,
}

impl SessionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AsiaDeadHours => "ASIA_DEAD_HOURS",
            Self::Asia => "ASIA",
            Self::London => "LONDON",
            Self::LondonNyOverlap => "LONDON_NY_OVERLAP",
            Self::NewYork => "NEW_YORK",
            Self::OffHours => "OFF_HOURS",
            Self::WaitingLondonNy => "WAITING_LONDON_NY",
            Self::WaitingAsia => "WAITING_ASIA",
        }
    }

    pub fn is_london_ny(&self) -> bool {
        matches!(self, Self::London | Self::LondonNyOverlap | Self::NewYork)
    }

    pub fn is_asia(&self) -> bool {
        matches!(self, Self::Asia | Self::AsiaDeadHours)
    }
}

/// Session descriptor for a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub kind: SessionKind,
    pub active: bool,
    pub volatility: Volatility,
    pub description: &'static str,
}

impl Session {
    fn new(
        kind: SessionKind,
        active: bool,
        volatility: Volatility,
        description: &'static str,
    ) -> Self {
        Self {
            kind,
            active,
            volatility,
            description,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_trading_session(&self) -> bool {
        self.active
    }

    pub fn is_high_volatility_period(&self) -> bool {
        self.volatility.is_high()
    }

    /// Asia is the secondary, low-liquidity session
    pub fn is_asia_session(&self) -> bool {
        self.kind == SessionKind::Asia
    }
}

/// Session purely from the clock, before any policy is applied
pub fn base_session(hour: u32) -> Session {
    match hour % 24 {
        2..=3 => Session::new(
            SessionKind::AsiaDeadHours,
            false,
            Volatility::VeryLow,
            "Asia dead hours, thin liquidity",
        ),
        23 | 0..=6 => Session::new(
            SessionKind::Asia,
            true,
            Volatility::Moderate,
            "Tokyo/Sydney active, ranging market",
        ),
        7..=11 => Session::new(
            SessionKind::London,
            true,
            Volatility::High,
            "London open, trending market",
        ),
        12..=15 => Session::new(
            SessionKind::LondonNyOverlap,
            true,
            Volatility::VeryHigh,
            "London and New York overlap, peak liquidity",
        ),
        16..=20 => Session::new(
            SessionKind::NewYork,
            true,
            Volatility::High,
            "New York session",
        ),
        _ => Session::new(
            SessionKind::OffHours,
            false,
            Volatility::Low,
            "Between New York close and Asia open",
        ),
    }
}

/// Apply the configured policy to the clock-derived session
pub fn classify(hour: u32, policy: SessionPolicy) -> Session {
    let base = base_session(hour);
    match policy {
        SessionPolicy::Auto => base,
        SessionPolicy::AlwaysOn => match base.kind {
            SessionKind::AsiaDeadHours => base,
            _ => Session {
                active: true,
                ..base
            },
        },
        SessionPolicy::LondonNewYork => {
            if base.kind.is_london_ny() {
                base
            } else {
                Session::new(
                    SessionKind::WaitingLondonNy,
                    false,
                    Volatility::Low,
                    "Waiting for London/New York session",
                )
            }
        }
        SessionPolicy::Asia => {
            if base.kind.is_asia() {
                base
            } else {
                Session::new(
                    SessionKind::WaitingAsia,
                    false,
                    Volatility::Low,
                    "Waiting for Asia session",
                )
            }
        }
    }
}

/// Session at `now` under `policy`
pub fn current_session(now: DateTime<Utc>, policy: SessionPolicy) -> Session {
    classify(now.hour(), policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_base_session_table() {
        let expected = [
            (0, SessionKind::Asia),
            (1, SessionKind::Asia),
            (2, SessionKind::AsiaDeadHours),
            (3, SessionKind::AsiaDeadHours),
            (4, SessionKind::Asia),
            (6, SessionKind::Asia),
            (7, SessionKind::London),
            (11, SessionKind::London),
            (12, SessionKind::LondonNyOverlap),
            (15, SessionKind::LondonNyOverlap),
            (16, SessionKind::NewYork),
            (20, SessionKind::NewYork),
            (21, SessionKind::OffHours),
            (22, SessionKind::OffHours),
            (23, SessionKind::Asia),
        ];
        for (hour, kind) in expected {
            assert_eq!(base_session(hour).kind, kind, "hour {hour}");
        }
    }

    #[test]
    fn test_volatility_tiers() {
        assert_eq!(base_session(3).volatility, Volatility::VeryLow);
        assert_eq!(base_session(5).volatility, Volatility::Moderate);
        assert_eq!(base_session(9).volatility, Volatility::High);
        assert_eq!(base_session(13).volatility, Volatility::VeryHigh);
        assert_eq!(base_session(18).volatility, Volatility::High);
        assert_eq!(base_session(22).volatility, Volatility::Low);

        assert!(base_session(13).is_high_volatility_period());
        assert!(!base_session(5).is_high_volatility_period());
    }

    #[test]
    fn test_auto_policy_passes_through() {
        for hour in 0..24 {
            assert_eq!(classify(hour, SessionPolicy::Auto), base_session(hour));
        }
        assert!(!classify(2, SessionPolicy::Auto).is_trading_session());
        assert!(!classify(21, SessionPolicy::Auto).is_trading_session());
        assert!(classify(8, SessionPolicy::Auto).is_trading_session());
    }

    #[test]
    fn test_always_on_keeps_dead_hours_inactive() {
        assert!(!classify(2, SessionPolicy::AlwaysOn).is_trading_session());
        let off = classify(22, SessionPolicy::AlwaysOn);
        assert!(off.is_trading_session());
        assert_eq!(off.kind, SessionKind::OffHours);
        assert!(classify(13, SessionPolicy::AlwaysOn).is_trading_session());
    }

    #[test]
    fn test_force_london_ny() {
        let s = classify(13, SessionPolicy::LondonNewYork);
        assert_eq!(s.kind, SessionKind::LondonNyOverlap);
        assert!(s.is_trading_session());

        let waiting = classify(5, SessionPolicy::LondonNewYork);
        assert_eq!(waiting.kind, SessionKind::WaitingLondonNy);
        assert!(!waiting.is_trading_session());
    }

    #[test]
    fn test_force_asia() {
        let s = classify(5, SessionPolicy::Asia);
        assert!(s.is_asia_session());
        assert!(s.is_trading_session());

        let dead = classify(3, SessionPolicy::Asia);
        assert_eq!(dead.kind, SessionKind::AsiaDeadHours);
        assert!(!dead.is_trading_session());

        let waiting = classify(10, SessionPolicy::Asia);
        assert_eq!(waiting.kind, SessionKind::WaitingAsia);
        assert_eq!(waiting.name(), "WAITING_ASIA");
        assert!(!waiting.is_trading_session());
    }

    #[test]
    fn test_current_session_uses_utc_hour() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let s = current_session(now, SessionPolicy::Auto);
        assert_eq!(s.name(), "LONDON_NY_OVERLAP");
    }
}
