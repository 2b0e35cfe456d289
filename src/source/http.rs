use super::ValueSource;
use crate::error::SourceError;
use crate::target::Target;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Simple-price style HTTP API: `GET {base}?ids=<key>&vs_currencies=<cur>`
/// answering `{ "<key>": { "<cur>": <number> } }`.
pub struct HttpValueSource {
    client: Client,
    base_url: String,
    vs_currency: String,
}

type PricesResponse = HashMap<String, HashMap<String, serde_json::Number>>;

impl HttpValueSource {
    pub fn new(base_url: &str, vs_currency: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            vs_currency: vs_currency.to_ascii_lowercase(),
        }
    }
}

/// Pull `key`/`currency` out of a decoded body and turn it into a positive
/// decimal. The number keeps its textual form so no float rounding sneaks in.
fn extract_price(body: &PricesResponse, key: &str, currency: &str) -> Result<Decimal, SourceError> {
    let parse_err = |reason: String| SourceError::Parse {
        key: key.to_string(),
        reason,
    };

    let quotes = body
        .get(key)
        .ok_or_else(|| parse_err("key missing from response".to_string()))?;
    let raw = quotes
        .get(currency)
        .ok_or_else(|| parse_err(format!("no {} quote", currency)))?
        .to_string();

    let value = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| parse_err(format!("{:?} is not a decimal: {}", raw, e)))?;

    if value <= Decimal::ZERO {
        return Err(parse_err(format!("non-positive value {}", value)));
    }
    Ok(value)
}

#[async_trait]
impl ValueSource for HttpValueSource {
    async fn fetch(&self, target: &Target) -> Result<Decimal, SourceError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("ids", target.source_key.as_str()),
                ("vs_currencies", self.vs_currency.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(target.source_key.clone()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Unavailable(format!("{}: {}", status, body)));
        }

        let body: PricesResponse = resp.json().await.map_err(|e| SourceError::Parse {
            key: target.source_key.clone(),
            reason: e.to_string(),
        })?;

        extract_price(&body, &target.source_key, &self.vs_currency)
    }
}
