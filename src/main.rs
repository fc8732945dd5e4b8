mod config;
mod db;
mod detector;
mod error;
mod exchanges;
mod notifier;
mod scheduler;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::SampleStore;
use crate::error::Result;
use crate::exchanges::{build_sources, http_client};
use crate::notifier::{DisabledNotifier, Notifier, TelegramNotifier};
use crate::scheduler::PollScheduler;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(&cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: &Config) -> Result<()> {
    // --- Sample store ---
    let store = SampleStore::open(&cfg.db_path).await?;

    // --- Sources, in configured log order ---
    let client = http_client(cfg.source_timeout)?;
    let sources = build_sources(&cfg.exchanges, &client);
    let active: Vec<String> = sources.iter().map(|s| s.exchange().to_string()).collect();

    // --- Notifier ---
    let notifier: Box<dyn Notifier> = match &cfg.telegram {
        Some(credentials) => {
            Box::new(TelegramNotifier::new(credentials.clone(), cfg.notify_timeout)?)
        }
        None => Box::new(DisabledNotifier),
    };

    info!(
        "Starting BTC futures volume monitor. Poll every {}s. Window {}m. Alert if change ≥ {}%.",
        cfg.poll_interval().as_secs(),
        cfg.window_minutes,
        cfg.alert_change_pct,
    );
    info!("Exchanges: {}", active.join(", "));
    if cfg.telegram.is_some() {
        info!("Telegram alerts enabled.");
    } else {
        info!("Telegram alerts disabled (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID to enable).");
    }

    let scheduler = PollScheduler::new(cfg, store, sources, notifier);

    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Stopped.");
        }
    }

    Ok(())
}
