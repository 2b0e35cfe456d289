use crate::pipeline::PipelineConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSection {
    #[serde(default = "default_workers")]
    pub evaluate_workers: usize,
    #[serde(default = "default_workers")]
    pub persist_workers: usize,
    #[serde(default = "default_workers")]
    pub notify_workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_workers() -> usize { 3 }
fn default_queue_capacity() -> usize { 3 }
fn default_poll_interval_ms() -> u64 { 1000 }

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            evaluate_workers: default_workers(),
            persist_workers: default_workers(),
            notify_workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "targets.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_source_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".to_string()
}
fn default_vs_currency() -> String {
    "usd".to_string()
}
fn default_timeout_ms() -> u64 { 5000 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            vs_currency: default_vs_currency(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Telegram,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    #[serde(default = "default_telegram_api")]
    pub telegram_api_base: String,
    /// Falls back to `TELEGRAM_CHAT_ID` when absent.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            telegram_api_base: default_telegram_api(),
            telegram_chat_id: None,
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        config.pipeline_config().validate()?;
        Ok(config)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            evaluate_workers: self.pipeline.evaluate_workers,
            persist_workers: self.pipeline.persist_workers,
            notify_workers: self.pipeline.notify_workers,
            queue_capacity: self.pipeline.queue_capacity,
            poll_interval: Duration::from_millis(self.pipeline.poll_interval_ms),
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env(&content) {
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    pub fn telegram_bot_token() -> Result<String> {
        match std::env::var("TELEGRAM_BOT_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Ok(sanitize_key(&token)),
            _ => anyhow::bail!("TELEGRAM_BOT_TOKEN is not set"),
        }
    }

    pub fn telegram_chat_id(&self) -> Result<String> {
        if let Some(id) = self.notifier.telegram_chat_id.as_deref() {
            if !id.trim().is_empty() {
                return Ok(id.trim().to_string());
            }
        }
        match std::env::var("TELEGRAM_CHAT_ID") {
            Ok(id) if !id.trim().is_empty() => Ok(sanitize_key(&id)),
            _ => anyhow::bail!("telegram chat id missing: set notifier.telegram_chat_id or TELEGRAM_CHAT_ID"),
        }
    }
}

/// KEY=VALUE pairs from a .env body. Blank lines and `#` comments are
/// skipped, surrounding quotes stripped.
fn parse_env(content: &str) -> Vec<(&str, &str)> {
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim().trim_matches('"').trim_matches('\'')))
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a key/path value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
