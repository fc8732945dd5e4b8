use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const BINANCE_USDM_API_URL: &str = "https://fapi.binance.com";
pub const BINANCE_COINM_API_URL: &str = "https://dapi.binance.com";
pub const BYBIT_API_URL: &str = "https://api.bybit.com";
pub const OKX_API_URL: &str = "https://www.okx.com";
pub const DERIBIT_API_URL: &str = "https://www.deribit.com";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub const USER_AGENT: &str = "btc-futures-volume-monitor/1.0";

/// Poll interval floor (seconds). Lower configured values are clamped up.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// Default bound on a single source adapter call (seconds).
pub const SOURCE_TIMEOUT_SECS: u64 = 10;

/// Default bound on a single notifier delivery (seconds).
pub const NOTIFY_TIMEOUT_SECS: u64 = 12;

pub const DEFAULT_EXCHANGES: &str = "binance,bybit,okx,deribit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    /// Raw configured cadence (POLL_INTERVAL_SEC). Use `poll_interval()` for the clamped value.
    pub poll_interval_secs: u64,
    /// Minimum absolute change in percent that triggers an alert (ALERT_CHANGE_PCT)
    pub alert_change_pct: f64,
    /// Trailing window for the baseline average (WINDOW_MINUTES)
    pub window_minutes: u32,
    /// Per-cycle summary and alert lines (LOG_TO_STDOUT)
    pub log_to_stdout: bool,
    /// Exchange names in log order (EXCHANGES, comma-separated). Unknown names are skipped later.
    pub exchanges: Vec<String>,
    pub source_timeout: Duration,
    /// Upper bound on one alert delivery (NOTIFY_TIMEOUT_SECS)
    pub notify_timeout: Duration,
    /// Present only when both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID are set.
    pub telegram: Option<TelegramCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default().trim().to_string();
        let chat_id = lookup("TELEGRAM_CHAT_ID").unwrap_or_default().trim().to_string();
        let telegram = if bot_token.is_empty() || chat_id.is_empty() {
            None
        } else {
            Some(TelegramCredentials { bot_token, chat_id })
        };

        let source_timeout = parse_timeout(&lookup, "SOURCE_TIMEOUT_SECS", SOURCE_TIMEOUT_SECS)?;
        let notify_timeout = parse_timeout(&lookup, "NOTIFY_TIMEOUT_SECS", NOTIFY_TIMEOUT_SECS)?;

        let alert_change_pct: f64 = parse_var(&lookup, "ALERT_CHANGE_PCT", 20.0)?;
        if !alert_change_pct.is_finite() || alert_change_pct < 0.0 {
            return Err(AppError::Config(format!(
                "ALERT_CHANGE_PCT must be a finite, non-negative percent, got {alert_change_pct}"
            )));
        }

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: lookup("DB_PATH").unwrap_or_else(|| "btc_futures_volumes.sqlite".to_string()),
            poll_interval_secs: parse_var(&lookup, "POLL_INTERVAL_SEC", 60)?,
            alert_change_pct,
            window_minutes: parse_var(&lookup, "WINDOW_MINUTES", 15)?,
            log_to_stdout: lookup("LOG_TO_STDOUT")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            exchanges: lookup("EXCHANGES")
                .unwrap_or_else(|| DEFAULT_EXCHANGES.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            source_timeout,
            notify_timeout,
            telegram,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

/// Missing variables fall back to `default`; present but unparsable ones are fatal.
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be a valid number, got {raw:?}"))),
    }
}

/// Whole seconds, at least one. A zero timeout would fail every call.
fn parse_timeout<F>(lookup: &F, key: &str, default_secs: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var(lookup, key, default_secs)? {
        0 => Err(AppError::Config(format!("{key} must be at least 1 second"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}
