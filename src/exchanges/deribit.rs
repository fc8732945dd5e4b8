use async_trait::async_trait;
use serde_json::Value;

use crate::config::DERIBIT_API_URL;
use crate::error::{AppError, Result};
use crate::exchanges::normalize::{field, first_positive, ratio};
use crate::exchanges::{either_feed, get_json, VolumeSource};
use crate::types::{Exchange, Reading};

const LINEAR_INSTRUMENT: &str = "BTC_USDC-PERPETUAL";
const INVERSE_INSTRUMENT: &str = "BTC-PERPETUAL";

/// Deribit USDC-margined `BTC_USDC-PERPETUAL` plus inverse `BTC-PERPETUAL`.
pub struct DeribitSource {
    client: reqwest::Client,
    base_url: String,
}

impl DeribitSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DERIBIT_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn ticker(&self, instrument: &str) -> Result<Value> {
        let url = format!("{}/api/v2/public/ticker", self.base_url);
        let resp = get_json(&self.client, &url, &[("instrument_name", instrument)]).await?;

        if let Some(err) = resp.get("error") {
            return Err(AppError::Exchange(format!("deribit {instrument}: {err}")));
        }
        Ok(resp)
    }
}

#[async_trait]
impl VolumeSource for DeribitSource {
    fn exchange(&self) -> Exchange {
        Exchange::Deribit
    }

    async fn fetch(&self) -> Result<Option<Reading>> {
        let (linear, inverse) =
            tokio::join!(self.ticker(LINEAR_INSTRUMENT), self.ticker(INVERSE_INSTRUMENT));
        let (linear, inverse) = either_feed(Exchange::Deribit, linear, inverse)?;

        Ok(normalize(linear.as_ref(), inverse.as_ref()))
    }
}

/// On both perpetuals `stats.volume` is BTC and `stats.volume_usd` USD.
///
/// Price: inverse `last_price` → linear `last_price` → inverse `index_price`
/// → linear `index_price` → `stats.volume_usd / stats.volume` (inverse, then linear) → 0.
/// Quote volume per feed prefers `stats.volume_usd`, else `volume × price`.
pub fn normalize(linear: Option<&Value>, inverse: Option<&Value>) -> Option<Reading> {
    let l = linear.and_then(ticker_result);
    let i = inverse.and_then(ticker_result);
    if l.is_none() && i.is_none() {
        return None;
    }
    let (l_stats, i_stats) = (l.and_then(stats), i.and_then(stats));

    let last_price = first_positive([
        field(i, "last_price"),
        field(l, "last_price"),
        field(i, "index_price"),
        field(l, "index_price"),
        ratio(field(i_stats, "volume_usd"), field(i_stats, "volume")),
        ratio(field(l_stats, "volume_usd"), field(l_stats, "volume")),
    ])
    .unwrap_or(0.0);

    let feed_quote = |s: Option<&Value>| {
        field(s, "volume_usd").unwrap_or_else(|| field(s, "volume").unwrap_or(0.0) * last_price)
    };

    let base_volume =
        field(l_stats, "volume").unwrap_or(0.0) + field(i_stats, "volume").unwrap_or(0.0);

    Some(Reading {
        exchange: Exchange::Deribit,
        base_volume,
        quote_volume: feed_quote(l_stats) + feed_quote(i_stats),
        last_price,
    })
}

fn ticker_result(resp: &Value) -> Option<&Value> {
    resp.get("result").filter(|r| r.is_object())
}

fn stats(result: &Value) -> Option<&Value> {
    result.get("stats").filter(|s| s.is_object())
}
