use crate::error::{Error, ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest provider-supplied retry hint we are willing to honor; anything
/// larger falls back to exponential backoff.
const MAX_HINTED_DELAY: Duration = Duration::from_secs(60);

/// A single text-in/text-out model invocation. The trait seam exists so the
/// generation and insights pipelines can be exercised against scripted models.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", GEMINI_BASE_URL, model);
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.7 }
        });

        let res = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let body: Option<JsonValue> = serde_json::from_str(&text).ok();
            let message = body
                .as_ref()
                .and_then(|b| b["error"]["message"].as_str())
                .unwrap_or(&text)
                .to_string();
            return Err(Error::Provider(ProviderError {
                status: status.as_u16(),
                message,
                retry_delay: body.as_ref().and_then(parse_retry_delay),
            }));
        }

        let body: JsonValue = res.json().await?;
        body.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Parse("Model response carried no candidate text".to_string()))
    }
}

/// Pulls the `RetryInfo` hint out of a Gemini error payload, e.g.
/// `{"error":{"details":[{"@type":".../google.rpc.RetryInfo","retryDelay":"7s"}]}}`.
fn parse_retry_delay(body: &JsonValue) -> Option<Duration> {
    let details = body["error"]["details"].as_array()?;
    let info = details.iter().find(|d| {
        d["@type"]
            .as_str()
            .map(|t| t.ends_with("RetryInfo"))
            .unwrap_or(false)
    })?;
    let raw = info["retryDelay"].as_str()?;
    let secs: f64 = raw.trim_end_matches('s').parse().ok()?;
    (secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

/// Invokes `model` through `client`, retrying only rate-limit-class provider
/// failures. A hinted delay of at most [`MAX_HINTED_DELAY`] is honored
/// verbatim; otherwise backoff doubles from one second per attempt. Any other
/// failure propagates immediately.
pub async fn call_with_retry(
    client: &dyn ModelClient,
    model: &str,
    prompt: &str,
    max_retries: u32,
) -> Result<String> {
    let mut attempt = 0u32;
    loop {
        match client.generate(model, prompt).await {
            Ok(text) => return Ok(text),
            Err(Error::Provider(err)) if err.is_rate_limited() && attempt < max_retries => {
                let delay = err
                    .retry_delay
                    .filter(|d| *d <= MAX_HINTED_DELAY)
                    .unwrap_or_else(|| Duration::from_millis(1000 * (1 << attempt)));
                warn!(
                    model,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited by provider, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}
