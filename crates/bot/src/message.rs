//! Human-readable chat messages

use chrono::{DateTime, Utc};
use engine::{Action, EngineConfig, SignalRecord};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";

/// Display form of the symbol, e.g. `XAU/USD` -> `XAUUSD`
fn ticker(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

pub fn format_signal(record: &SignalRecord, config: &EngineConfig, symbol: &str) -> String {
    let icon = match record.action {
        Action::Buy => "🟢📈",
        Action::Sell => "🔴📉",
        Action::Wait => "⏸",
    };

    let mut lines = vec![
        format!("{} {} {} SIGNAL", icon, ticker(symbol), record.action),
        RULE.to_string(),
        format!("💰 Entry Price : {:.2}", record.entry),
        format!("🛑 Stop Loss   : {:.2}", record.stop_loss),
        format!("🎯 TP1         : {:.2}", record.take_profit_1),
        format!("🎯 TP2         : {:.2}", record.take_profit_2),
        format!("🎯 TP3         : {:.2}", record.take_profit_3),
        RULE.to_string(),
        format!("📊 Risk/Reward : 1:{:.2}", record.risk_reward),
        format!("💪 Confidence  : {}%", record.confidence),
        format!("⚙️ Mode        : {}", config.mode),
        format!("🌍 Session     : {}", record.session),
        RULE.to_string(),
        "📌 CONFIRMATIONS:".to_string(),
    ];
    lines.extend(record.reasons.iter().map(|r| format!("• {}", r)));
    lines.push(RULE.to_string());
    lines.push(format!("⏰ {} UTC", record.generated_at.format("%H:%M:%S")));

    lines.join("\n")
}

pub fn format_startup(config: &EngineConfig, symbol: &str, now: DateTime<Utc>) -> String {
    [
        format!("🟢 {} SIGNAL BOT ONLINE", ticker(symbol)),
        RULE.to_string(),
        format!("📊 Mode    : {}", config.mode),
        format!("⏱ Polling : {}s", config.polling_interval.as_secs()),
        format!("🌍 Session : {}", config.session_policy),
        format!("🕐 Time    : {} UTC", now.format("%Y-%m-%d %H:%M:%S")),
        RULE.to_string(),
        "📈 EMA • RSI • MACD • BB • ADX • Fibonacci".to_string(),
        "🎯 ATR-based SL/TP with session floors".to_string(),
    ]
    .join("\n")
}
