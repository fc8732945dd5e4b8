use async_trait::async_trait;
use serde_json::Value;

use crate::config::{BINANCE_COINM_API_URL, BINANCE_USDM_API_URL};
use crate::error::Result;
use crate::exchanges::normalize::{field, first_positive, ratio, single_row};
use crate::exchanges::{either_feed, get_json, VolumeSource};
use crate::types::{Exchange, Reading};

/// Binance USDT-margined `BTCUSDT` plus coin-margined `BTCUSD_PERP`.
pub struct BinanceSource {
    client: reqwest::Client,
    usdm_url: String,
    coinm_url: String,
}

impl BinanceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            usdm_url: BINANCE_USDM_API_URL.to_string(),
            coinm_url: BINANCE_COINM_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_urls(mut self, usdm_url: impl Into<String>, coinm_url: impl Into<String>) -> Self {
        self.usdm_url = usdm_url.into();
        self.coinm_url = coinm_url.into();
        self
    }
}

#[async_trait]
impl VolumeSource for BinanceSource {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    async fn fetch(&self) -> Result<Option<Reading>> {
        let usdm_url = format!("{}/fapi/v1/ticker/24hr", self.usdm_url);
        let coinm_url = format!("{}/dapi/v1/ticker/24hr", self.coinm_url);

        let (usdm, coinm) = tokio::join!(
            get_json(&self.client, &usdm_url, &[("symbol", "BTCUSDT")]),
            get_json(&self.client, &coinm_url, &[("symbol", "BTCUSD_PERP")]),
        );
        let (usdm, coinm) = either_feed(Exchange::Binance, usdm, coinm)?;

        Ok(normalize(usdm.as_ref(), coinm.as_ref()))
    }
}

/// USDT-M `volume` is BTC and `quoteVolume` USDT; COIN-M `baseVolume` is BTC.
///
/// Price: USDT-M `lastPrice` → USDT-M `prevClosePrice` → COIN-M `lastPrice`
/// → USDT-M `quoteVolume / volume` → 0.
pub fn normalize(usdm: Option<&Value>, coinm: Option<&Value>) -> Option<Reading> {
    let u = usdm.and_then(single_row);
    let c = coinm.and_then(single_row);
    if u.is_none() && c.is_none() {
        return None;
    }

    let usdm_quote = field(u, "quoteVolume").unwrap_or(0.0);
    let usdm_base = field(u, "volume").unwrap_or(0.0);
    let coinm_base = field(c, "baseVolume").unwrap_or(0.0);

    let last_price = first_positive([
        field(u, "lastPrice"),
        field(u, "prevClosePrice"),
        field(c, "lastPrice"),
        ratio(Some(usdm_quote), Some(usdm_base)),
    ])
    .unwrap_or(0.0);

    Some(Reading {
        exchange: Exchange::Binance,
        base_volume: usdm_base + coinm_base,
        quote_volume: usdm_quote + coinm_base * last_price,
        last_price,
    })
}
