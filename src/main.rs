use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use target_watch::config::{Config, NotifierKind};
use target_watch::notify::{LogNotifier, Notifier, TelegramNotifier};
use target_watch::source::HttpValueSource;
use target_watch::store::JsonFileStore;
use target_watch::Pipeline;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

fn build_notifier(config: &Config, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run || config.notifier.kind == NotifierKind::Log {
        return Ok(Arc::new(LogNotifier));
    }
    let token = Config::telegram_bot_token()?;
    let chat_id = config.telegram_chat_id()?;
    Ok(Arc::new(TelegramNotifier::new(
        &config.notifier.telegram_api_base,
        token,
        chat_id,
        Duration::from_millis(config.notifier.request_timeout_ms),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load saved secrets from .env (real env vars take precedence)
    Config::load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("target_watch=info")),
        )
        .init();

    let dry_run = std::env::args().any(|arg| arg == "--dry-run");

    let config_path = std::env::var("TARGET_WATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::load(&config_path)?;

    let store = Arc::new(JsonFileStore::new(&config.store.path));
    let source = Arc::new(HttpValueSource::new(
        &config.source.base_url,
        &config.source.vs_currency,
        Duration::from_millis(config.source.request_timeout_ms),
    ));
    let notifier = build_notifier(&config, dry_run)?;

    if dry_run {
        tracing::warn!("DRY RUN: alerts are logged, not delivered");
    }

    let pipeline = Pipeline::new(store, source, notifier, config.pipeline_config())?;
    let summary = pipeline
        .run()
        .await
        .with_context(|| format!("pipeline run against {} failed", config.store.path))?;

    println!("{}", summary);
    Ok(())
}
