pub mod telegram;

use async_trait::async_trait;

pub use telegram::TelegramNotifier;

/// What happened to one alert delivery. Never an error: delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No destination configured.
    Disabled,
    Failed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Delivery;
}

/// Used when no notifier credentials are configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _text: &str) -> Delivery {
        Delivery::Disabled
    }
}
