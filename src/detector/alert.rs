use chrono::DateTime;

use crate::types::Exchange;

/// A threshold crossing for one exchange in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAlert {
    pub exchange: Exchange,
    pub change_pct: f64,
    pub window_minutes: u32,
    pub quote_volume: f64,
    pub last_price: f64,
    /// Cycle timestamp, Unix seconds.
    pub timestamp: i64,
}

impl VolumeAlert {
    /// Message body sent to the notifier and mirrored to the log.
    pub fn message(&self) -> String {
        let direction = if self.change_pct > 0.0 { "↑" } else { "↓" };
        let utc = DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());

        format!(
            "BTC futures volume {direction} {:.1}% over last {}m on {}.\n\
             Current 24h: {} | Price ≈ ${:.0}\n\
             UTC: {utc}",
            self.change_pct,
            self.window_minutes,
            self.exchange.as_str().to_uppercase(),
            format_usd(self.quote_volume),
            self.last_price,
        )
    }
}

/// Compact dollar amount: `$1.23B`, `$45.60M`, `$7.00K`, `$12.34`.
pub fn format_usd(x: f64) -> String {
    if x >= 1e12 {
        format!("${:.2}T", x / 1e12)
    } else if x >= 1e9 {
        format!("${:.2}B", x / 1e9)
    } else if x >= 1e6 {
        format!("${:.2}M", x / 1e6)
    } else if x >= 1e3 {
        format!("${:.2}K", x / 1e3)
    } else {
        format!("${x:.2}")
    }
}
