use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{TelegramCredentials, TELEGRAM_API_URL};
use crate::error::Result;
use crate::notifier::{Delivery, Notifier};

/// Sends alerts through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    credentials: TelegramCredentials,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    /// `timeout` bounds the whole request, connect through response body.
    pub fn new(credentials: TelegramCredentials, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: TELEGRAM_API_URL.to_string(),
            credentials,
        })
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.credentials.bot_token);
        let body = SendMessage {
            chat_id: &self.credentials.chat_id,
            text,
            parse_mode: "HTML",
        };
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Delivery {
        match self.send(text).await {
            Ok(()) => Delivery::Sent,
            // reqwest errors embed the request URL, which carries the bot token.
            Err(e) => Delivery::Failed(e.to_string().replace(&self.credentials.bot_token, "***")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> TelegramCredentials {
        TelegramCredentials {
            bot_token: "123:abc".to_string(),
            chat_id: "-1001".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_html_message_to_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(json!({
                "chat_id": "-1001",
                "text": "volume spike",
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(credentials(), Duration::from_secs(5)).unwrap().with_api_url(server.uri());
        assert_eq!(notifier.notify("volume spike").await, Delivery::Sent);
    }

    #[tokio::test]
    async fn rejected_request_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(credentials(), Duration::from_secs(5)).unwrap().with_api_url(server.uri());
        match notifier.notify("hello").await {
            Delivery::Failed(reason) => assert!(!reason.contains("123:abc"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_api_is_reported_not_raised() {
        let notifier = TelegramNotifier::new(credentials(), Duration::from_secs(5))
            .unwrap()
            .with_api_url("http://127.0.0.1:9");
        assert!(matches!(notifier.notify("hello").await, Delivery::Failed(_)));
    }

    #[tokio::test]
    async fn slow_api_is_cut_off_by_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(credentials(), Duration::from_millis(200))
            .unwrap()
            .with_api_url(server.uri());
        let started = std::time::Instant::now();
        assert!(matches!(notifier.notify("hello").await, Delivery::Failed(_)));
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }
}
