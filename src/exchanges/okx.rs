use async_trait::async_trait;
use serde_json::Value;

use crate::config::OKX_API_URL;
use crate::error::Result;
use crate::exchanges::normalize::{field, first_in, first_positive};
use crate::exchanges::{either_feed, get_json, VolumeSource};
use crate::types::{Exchange, Reading};

/// OKX `BTC-USDT-SWAP` plus `BTC-USD-SWAP`.
pub struct OkxSource {
    client: reqwest::Client,
    base_url: String,
}

impl OkxSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OKX_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VolumeSource for OkxSource {
    fn exchange(&self) -> Exchange {
        Exchange::Okx
    }

    async fn fetch(&self) -> Result<Option<Reading>> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);

        let (usdt, usd) = tokio::join!(
            get_json(&self.client, &url, &[("instId", "BTC-USDT-SWAP")]),
            get_json(&self.client, &url, &[("instId", "BTC-USD-SWAP")]),
        );
        let (usdt, usd) = either_feed(Exchange::Okx, usdt, usd)?;

        Ok(normalize(usdt.as_ref(), usd.as_ref()))
    }
}

/// For swaps `volCcy24h` is denominated in the base currency (BTC) on both
/// the USDT- and USD-margined contracts; `vol24h` counts contracts and is unused.
///
/// Price: USDT swap `last` → USD swap `last` → 0. Quote volume is `base × price`.
pub fn normalize(usdt_swap: Option<&Value>, usd_swap: Option<&Value>) -> Option<Reading> {
    let u = usdt_swap.and_then(ticker_row);
    let c = usd_swap.and_then(ticker_row);
    if u.is_none() && c.is_none() {
        return None;
    }
    let (u, c) = (u.as_ref(), c.as_ref());

    let base_volume = field(u, "volCcy24h").unwrap_or(0.0) + field(c, "volCcy24h").unwrap_or(0.0);
    let last_price = first_positive([field(u, "last"), field(c, "last")]).unwrap_or(0.0);

    Some(Reading {
        exchange: Exchange::Okx,
        base_volume,
        quote_volume: base_volume * last_price,
        last_price,
    })
}

/// `data[0]` of a successful (`code == "0"`) response.
fn ticker_row(v: &Value) -> Option<Value> {
    let code = v.get("code").and_then(Value::as_str).unwrap_or("0");
    if code != "0" {
        return None;
    }
    first_in(v, &["data"])
}
