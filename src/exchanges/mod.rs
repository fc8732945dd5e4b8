pub mod binance;
pub mod bybit;
pub mod deribit;
pub mod normalize;
pub mod okx;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::USER_AGENT;
use crate::error::Result;
use crate::types::{Exchange, Reading};

pub use binance::BinanceSource;
pub use bybit::BybitSource;
pub use deribit::DeribitSource;
pub use okx::OkxSource;

/// One exchange's BTC perpetual 24h volume feed.
///
/// `Ok(Some)` is a usable reading, `Ok(None)` means the exchange answered but
/// nothing usable came back, `Err` means every underlying request failed.
#[async_trait]
pub trait VolumeSource: Send + Sync {
    fn exchange(&self) -> Exchange;

    async fn fetch(&self) -> Result<Option<Reading>>;
}

/// Shared client for all adapters. `timeout` bounds every individual request.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Builds adapters for the configured names, preserving order.
/// Unknown and repeated names are skipped.
pub fn build_sources(names: &[String], client: &reqwest::Client) -> Vec<Box<dyn VolumeSource>> {
    let mut seen = HashSet::new();
    let mut sources: Vec<Box<dyn VolumeSource>> = Vec::new();

    for name in names {
        let Some(exchange) = Exchange::from_name(name) else {
            warn!("Unknown exchange {name:?} in EXCHANGES, skipping");
            continue;
        };
        if !seen.insert(exchange) {
            warn!("Exchange {exchange} listed more than once, skipping duplicate");
            continue;
        }
        let source: Box<dyn VolumeSource> = match exchange {
            Exchange::Binance => Box::new(BinanceSource::new(client.clone())),
            Exchange::Bybit => Box::new(BybitSource::new(client.clone())),
            Exchange::Okx => Box::new(OkxSource::new(client.clone())),
            Exchange::Deribit => Box::new(DeribitSource::new(client.clone())),
        };
        sources.push(source);
    }

    sources
}

pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Value> {
    let resp = client.get(url).query(query).send().await?.error_for_status()?;
    Ok(resp.json().await?)
}

/// Combines the USD-margined and coin-margined feed results of one exchange.
/// A single failed feed is tolerated; both failing returns the first error.
pub(crate) fn either_feed(
    exchange: Exchange,
    usd_margined: Result<Value>,
    coin_margined: Result<Value>,
) -> Result<(Option<Value>, Option<Value>)> {
    match (usd_margined, coin_margined) {
        (Err(e), Err(_)) => Err(e),
        (u, c) => Ok((
            feed_or_log(exchange, "usd-margined", u),
            feed_or_log(exchange, "coin-margined", c),
        )),
    }
}

fn feed_or_log(exchange: Exchange, feed: &str, result: Result<Value>) -> Option<Value> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("{exchange} {feed} feed unavailable: {e}");
            None
        }
    }
}
