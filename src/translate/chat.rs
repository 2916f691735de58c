//! OpenAI-compatible chat/completions provider client.
//! One non-streaming request per batch, hard timeout, no retries.
//! HTTP failures are classified into `ProviderError` from the status code.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::prompt::{build_instruction, build_user_payload};
use super::provider::{parse_reply, ProviderError, TranslationProvider};
use super::Level;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwen-plus";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Chat/completions client for any OpenAI-compatible endpoint.
pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        // Per-call timeouts are applied in `translate_batch`.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, body: &serde_json::Value) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), retry_after_ms, &body_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(format!("invalid completion body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::BadResponse("completion has no message content".into()))
    }
}

#[async_trait]
impl TranslationProvider for ChatCompletionsProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        level: Level,
        timeout: Duration,
    ) -> Result<Vec<String>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": build_instruction(level)},
                {"role": "user", "content": build_user_payload(texts)}
            ],
            "temperature": self.temperature,
            "stream": false
        });

        let start = Instant::now();
        let content = match tokio::time::timeout(timeout, self.send(&body)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "provider call timed out");
                return Err(ProviderError::Timeout(timeout));
            }
        };
        debug!(
            items = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "provider reply received"
        );

        parse_reply(&content, texts.len())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn classify_transport(e: reqwest::Error) -> ProviderError {
    if e.is_connect() {
        ProviderError::Unavailable(format!("connection failed: {e}"))
    } else {
        ProviderError::Unavailable(e.to_string())
    }
}

fn classify_status(status: u16, retry_after_ms: Option<u64>, body: &str) -> ProviderError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        401 | 403 => ProviderError::Auth(format!("status {status}: {snippet}")),
        429 => ProviderError::RateLimited { retry_after_ms },
        _ => ProviderError::Unavailable(format!("unexpected status {status}: {snippet}")),
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
