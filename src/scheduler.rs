use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::SampleStore;
use crate::detector::{exceeds_threshold, format_usd, windowed_change_percent, VolumeAlert};
use crate::exchanges::VolumeSource;
use crate::notifier::{Delivery, Notifier};
use crate::types::{Exchange, Reading};

/// Result of polling one source within a cycle.
#[derive(Debug)]
pub enum SourceOutcome {
    Reading(Reading),
    /// The exchange answered but produced nothing usable.
    Unavailable,
    Failed(String),
    TimedOut,
}

impl std::fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceOutcome::Reading(_) => write!(f, "ok"),
            SourceOutcome::Unavailable => write!(f, "no usable data"),
            SourceOutcome::Failed(reason) => write!(f, "{reason}"),
            SourceOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// What one cycle observed and did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub timestamp: i64,
    /// Successful readings in configured exchange order.
    pub readings: Vec<Reading>,
    /// Exchanges that produced no reading this cycle.
    pub skipped: Vec<Exchange>,
    pub total_quote_volume: f64,
    pub alerts: Vec<VolumeAlert>,
}

/// Drives the fetch → persist → log → detect → alert → sleep loop.
pub struct PollScheduler<'a> {
    cfg: &'a Config,
    store: SampleStore,
    sources: Vec<Box<dyn VolumeSource>>,
    notifier: Box<dyn Notifier>,
}

impl<'a> PollScheduler<'a> {
    pub fn new(
        cfg: &'a Config,
        store: SampleStore,
        sources: Vec<Box<dyn VolumeSource>>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self { cfg, store, sources, notifier }
    }

    /// Runs cycles back to back until the future is dropped. The first cycle starts immediately.
    pub async fn run(&self) {
        loop {
            let timestamp = Utc::now().timestamp();
            let report = self.run_cycle(timestamp).await;
            debug!(
                readings = report.readings.len(),
                skipped = report.skipped.len(),
                alerts = report.alerts.len(),
                "Cycle {} complete",
                report.timestamp,
            );
            tokio::time::sleep(self.cfg.poll_interval()).await;
        }
    }

    /// One full cycle stamped with `timestamp`. Per-exchange failures are logged
    /// and contained; they never abort the cycle for the other exchanges.
    pub async fn run_cycle(&self, timestamp: i64) -> CycleReport {
        let mut report = CycleReport {
            timestamp,
            ..CycleReport::default()
        };
        let mut persisted: Vec<Reading> = Vec::new();

        for (exchange, outcome) in self.poll_sources().await {
            let reading = match outcome {
                SourceOutcome::Reading(r) => r,
                other => {
                    if self.cfg.log_to_stdout {
                        warn!(exchange = %exchange, "{exchange}: failed to fetch ({other})");
                    }
                    report.skipped.push(exchange);
                    continue;
                }
            };

            report.total_quote_volume += reading.quote_volume;
            match self
                .store
                .append(
                    timestamp,
                    reading.exchange.as_str(),
                    reading.base_volume,
                    reading.quote_volume,
                )
                .await
            {
                Ok(()) => persisted.push(reading.clone()),
                Err(e) => error!("Failed to persist {} sample: {e}", reading.exchange),
            }
            report.readings.push(reading);
        }

        if self.cfg.log_to_stdout {
            info!(
                event = "CYCLE",
                total_usd = report.total_quote_volume,
                "{}",
                summary_line(&report.readings, report.total_quote_volume),
            );
        }

        for reading in &persisted {
            if let Some(alert) = self.evaluate(reading, timestamp).await {
                self.deliver(&alert).await;
                report.alerts.push(alert);
            }
        }

        report
    }

    /// Fetches every source concurrently, each bounded by the configured timeout.
    /// Output order matches the configured source order.
    async fn poll_sources(&self) -> Vec<(Exchange, SourceOutcome)> {
        let timeout = self.cfg.source_timeout;
        let calls = self.sources.iter().map(|source| async move {
            let outcome = match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(Ok(Some(reading))) => SourceOutcome::Reading(reading),
                Ok(Ok(None)) => SourceOutcome::Unavailable,
                Ok(Err(e)) => SourceOutcome::Failed(e.to_string()),
                Err(_) => SourceOutcome::TimedOut,
            };
            (source.exchange(), outcome)
        });
        join_all(calls).await
    }

    async fn evaluate(&self, reading: &Reading, timestamp: i64) -> Option<VolumeAlert> {
        let exchange = reading.exchange.as_str();
        let change_pct =
            match windowed_change_percent(&self.store, exchange, self.cfg.window_minutes).await {
                Ok(Some(pct)) => pct,
                Ok(None) => return None,
                Err(e) => {
                    error!("Change detection failed for {exchange}: {e}");
                    return None;
                }
            };

        if !exceeds_threshold(change_pct, self.cfg.alert_change_pct) {
            return None;
        }

        Some(VolumeAlert {
            exchange: reading.exchange,
            change_pct,
            window_minutes: self.cfg.window_minutes,
            quote_volume: reading.quote_volume,
            last_price: reading.last_price,
            timestamp,
        })
    }

    async fn deliver(&self, alert: &VolumeAlert) {
        let message = alert.message();

        let delivery = tokio::time::timeout(self.cfg.notify_timeout, self.notifier.notify(&message))
            .await
            .unwrap_or_else(|_| Delivery::Failed("timed out".to_string()));

        match delivery {
            Delivery::Sent => debug!("Alert delivered for {}", alert.exchange),
            Delivery::Disabled => {}
            Delivery::Failed(reason) => debug!("Alert delivery failed for {}: {reason}", alert.exchange),
        }

        if self.cfg.log_to_stdout {
            info!(
                event = "ALERT",
                exchange = %alert.exchange,
                change_pct = alert.change_pct,
                "[ALERT] {message}",
            );
        }
    }
}

/// `24h futures volume: binance: $1.20B | okx: $800.00M || Total: $2.00B`
pub fn summary_line(readings: &[Reading], total_quote_volume: f64) -> String {
    let parts: Vec<String> = readings
        .iter()
        .map(|r| format!("{}: {}", r.exchange, format_usd(r.quote_volume)))
        .collect();
    format!(
        "24h futures volume: {} || Total: {}",
        parts.join(" | "),
        format_usd(total_quote_volume)
    )
}
