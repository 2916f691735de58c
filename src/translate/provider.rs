//! Provider abstraction: one batch of unique texts in, same-length batch out.
//! Reply parsing lives here so every adapter applies the same shape checks.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use super::Level;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed provider response: {0}")]
    BadResponse(String),

    #[error("provider returned {actual} items for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("provider rate limited{}", format_retry(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn format_retry(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {ms}ms"),
        None => String::new(),
    }
}

impl ProviderError {
    /// Short machine-readable class, used in logs.
    pub fn class(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "timeout",
            ProviderError::BadResponse(_) => "bad_response",
            ProviderError::LengthMismatch { .. } => "length_mismatch",
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Unavailable(_) => "unavailable",
        }
    }
}

/// External text-transformation service.
///
/// `translate_batch` receives a non-empty list of unique texts and must return
/// exactly one output per input, in the same order, or fail. Implementations
/// enforce `timeout` themselves and do not retry.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate_batch(
        &self,
        texts: &[String],
        level: Level,
        timeout: Duration,
    ) -> Result<Vec<String>, ProviderError>;

    fn name(&self) -> &str;
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?\s*```$").expect("valid fence regex")
    })
}

/// Parse the reply content into exactly `expected_len` strings.
///
/// Accepts a bare JSON array of strings, optionally wrapped in one Markdown
/// code fence. Anything else is `BadResponse`; a wrong count is `LengthMismatch`.
pub fn parse_reply(content: &str, expected_len: usize) -> Result<Vec<String>, ProviderError> {
    let trimmed = content.trim();
    let body = match code_fence().captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => trimmed,
    };

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::BadResponse(format!("reply is not JSON: {e}")))?;

    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::BadResponse("reply is not a JSON array".into()))?;

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                return Err(ProviderError::BadResponse(format!(
                    "element {idx} is not a string"
                )))
            }
        }
    }

    if out.len() != expected_len {
        return Err(ProviderError::LengthMismatch {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}
