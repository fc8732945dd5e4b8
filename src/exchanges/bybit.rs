use async_trait::async_trait;
use serde_json::Value;

use crate::config::BYBIT_API_URL;
use crate::error::Result;
use crate::exchanges::normalize::{field, first_in, first_positive, ratio};
use crate::exchanges::{either_feed, get_json, VolumeSource};
use crate::types::{Exchange, Reading};

/// Bybit v5 linear `BTCUSDT` plus inverse `BTCUSD`.
pub struct BybitSource {
    client: reqwest::Client,
    base_url: String,
}

impl BybitSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: BYBIT_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VolumeSource for BybitSource {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    async fn fetch(&self) -> Result<Option<Reading>> {
        let url = format!("{}/v5/market/tickers", self.base_url);

        let (linear, inverse) = tokio::join!(
            get_json(&self.client, &url, &[("category", "linear"), ("symbol", "BTCUSDT")]),
            get_json(&self.client, &url, &[("category", "inverse"), ("symbol", "BTCUSD")]),
        );
        let (linear, inverse) = either_feed(Exchange::Bybit, linear, inverse)?;

        Ok(normalize(linear.as_ref(), inverse.as_ref()))
    }
}

/// Linear: `volume24h` is BTC, `turnover24h` USDT.
/// Inverse (1 USD contracts): `volume24h` is USD, `turnover24h` BTC.
///
/// Price: linear `lastPrice` → inverse `lastPrice` → linear `turnover24h / volume24h`
/// → inverse `volume24h / turnover24h` → 0.
pub fn normalize(linear: Option<&Value>, inverse: Option<&Value>) -> Option<Reading> {
    let l = linear.and_then(ticker_row);
    let i = inverse.and_then(ticker_row);
    if l.is_none() && i.is_none() {
        return None;
    }
    let (l, i) = (l.as_ref(), i.as_ref());

    let linear_base = field(l, "volume24h");
    let linear_quote = field(l, "turnover24h");
    let inverse_usd = field(i, "volume24h");
    let inverse_btc = field(i, "turnover24h");

    let last_price = first_positive([
        field(l, "lastPrice"),
        field(i, "lastPrice"),
        ratio(linear_quote, linear_base),
        ratio(inverse_usd, inverse_btc),
    ])
    .unwrap_or(0.0);

    Some(Reading {
        exchange: Exchange::Bybit,
        base_volume: linear_base.unwrap_or(0.0) + inverse_btc.unwrap_or(0.0),
        quote_volume: linear_quote.unwrap_or(0.0) + inverse_usd.unwrap_or(0.0),
        last_price,
    })
}

/// `result.list[0]` of a successful (`retCode == 0`) response.
fn ticker_row(v: &Value) -> Option<Value> {
    let ret_code = v.get("retCode").and_then(Value::as_i64).unwrap_or(0);
    if ret_code != 0 {
        return None;
    }
    first_in(v, &["result", "list"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn linear() -> Value {
        json!({
            "retCode": 0,
            "result": {"category": "linear", "list": [{
                "symbol": "BTCUSDT",
                "lastPrice": "64000.5",
                "volume24h": "50000",
                "turnover24h": "3200000000"
            }]}
        })
    }

    fn inverse() -> Value {
        json!({
            "retCode": 0,
            "result": {"category": "inverse", "list": [{
                "symbol": "BTCUSD",
                "lastPrice": "64010",
                "volume24h": "640000000",
                "turnover24h": "10000"
            }]}
        })
    }

    #[test]
    fn combines_linear_and_inverse() {
        let r = normalize(Some(&linear()), Some(&inverse())).unwrap();
        assert_eq!(r.exchange, Exchange::Bybit);
        assert!((r.base_volume - 60_000.0).abs() < 1e-6);
        assert!((r.quote_volume - 3_840_000_000.0).abs() < 1e-3);
        assert_eq!(r.last_price, 64_000.5);
    }

    #[test]
    fn price_falls_back_to_inverse_then_derived() {
        let mut l = linear();
        l["result"]["list"][0].as_object_mut().unwrap().remove("lastPrice");
        let r = normalize(Some(&l), Some(&inverse())).unwrap();
        assert_eq!(r.last_price, 64_010.0);

        let r = normalize(Some(&l), None).unwrap();
        assert!((r.last_price - 64_000.0).abs() < 1e-9, "derived {}", r.last_price);
    }

    #[test]
    fn error_code_or_empty_list_is_unusable() {
        let failed = json!({"retCode": 10001, "retMsg": "params error", "result": {}});
        let empty = json!({"retCode": 0, "result": {"list": []}});
        assert!(normalize(Some(&failed), Some(&empty)).is_none());
    }

    #[tokio::test]
    async fn fetch_queries_both_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .and(query_param("category", "linear"))
            .respond_with(ResponseTemplate::new(200).set_body_json(linear()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .and(query_param("category", "inverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(inverse()))
            .mount(&server)
            .await;

        let source = BybitSource::new(reqwest::Client::new()).with_base_url(server.uri());
        let reading = source.fetch().await.unwrap().unwrap();
        assert!((reading.quote_volume - 3_840_000_000.0).abs() < 1e-3);
    }
}
