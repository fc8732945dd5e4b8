//! Row types for the `volumes` table. Column names match the on-disk layout
//! written by earlier deployments so existing database files stay readable.

/// Full row view. Only read back when inspecting stored history in tests.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Sample {
    #[sqlx(rename = "ts")]
    pub timestamp: i64,
    pub exchange: String,
    #[sqlx(rename = "base_volume_btc")]
    pub base_volume: f64,
    #[sqlx(rename = "quote_volume_usd")]
    pub quote_volume: f64,
}

/// Most recent sample for one exchange, as used by the change detector.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct LatestQuote {
    #[sqlx(rename = "ts")]
    pub timestamp: i64,
    #[sqlx(rename = "quote_volume_usd")]
    pub quote_volume: f64,
}
