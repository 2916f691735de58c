//! Caller-facing error taxonomy.
//! Cache failures have no variant here: they are absorbed by `CacheStore`.

use thiserror::Error;

use super::provider::{format_retry, ProviderError};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("rate limited{}", format_retry(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("translation provider failed: {0}")]
    Llm(#[from] ProviderError),
}

/// Machine classification handed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    RateLimited,
    LlmFailure,
}

impl ErrorKind {
    /// HTTP-style status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::RateLimited => 429,
            ErrorKind::LlmFailure => 503,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::LlmFailure => "llm_failure",
        }
    }
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Validation(_) => ErrorKind::Validation,
            TranslateError::RateLimited { .. } => ErrorKind::RateLimited,
            TranslateError::Llm(_) => ErrorKind::LlmFailure,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TranslateError::Llm(ProviderError::Timeout(_)))
    }

    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            TranslateError::Llm(e) => Some(e),
            _ => None,
        }
    }
}
