//! Translation pipeline: level-aware vocabulary mixing over an LLM provider.
//! Request validation, proficiency levels, and re-exports of the pipeline parts.

pub mod cache;
pub mod chat;
pub(crate) mod dedup;
pub mod error;
pub mod key;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod sqlite_cache;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::{ErrorKind, TranslateError};
pub use orchestrator::TranslationOrchestrator;
pub use provider::{ProviderError, TranslationProvider};
pub use store::{CacheBackend, CacheError, CacheStore};

/// Maximum number of texts accepted in one request.
pub const MAX_TEXTS: usize = 50;
/// Maximum length of a single text, in characters, after trimming.
pub const MAX_TEXT_CHARS: usize = 1000;

/// CEFR proficiency level of the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

/// Coarse grouping used by the instruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 6] = [Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
        }
    }

    pub fn band(&self) -> Band {
        match self {
            Level::A1 | Level::A2 => Band::Beginner,
            Level::B1 | Level::B2 => Band::Intermediate,
            Level::C1 | Level::C2 => Band::Advanced,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TranslateError::Validation(format!("unknown level: {s}")))
    }
}

/// A validated batch of texts at one level. Texts are stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    texts: Vec<String>,
    level: Level,
}

impl TranslationRequest {
    /// Validate and build a request. Each text is trimmed before the checks.
    pub fn new(texts: Vec<String>, level: Level) -> Result<Self, TranslateError> {
        check_count(texts.len())?;

        let mut validated = Vec::with_capacity(texts.len());
        for (idx, text) in texts.into_iter().enumerate() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(TranslateError::Validation(format!(
                    "texts[{idx}] must not be empty or whitespace only"
                )));
            }
            let chars = trimmed.chars().count();
            if chars > MAX_TEXT_CHARS {
                return Err(TranslateError::Validation(format!(
                    "texts[{idx}] is too long ({chars} chars, max {MAX_TEXT_CHARS})"
                )));
            }
            validated.push(trimmed.to_string());
        }

        Ok(Self {
            texts: validated,
            level,
        })
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

/// Count rule shared by request construction and the orchestrator.
pub(crate) fn check_count(count: usize) -> Result<(), TranslateError> {
    if count == 0 {
        return Err(TranslateError::Validation("texts must not be empty".into()));
    }
    if count > MAX_TEXTS {
        return Err(TranslateError::Validation(format!(
            "too many texts ({count}, max {MAX_TEXTS})"
        )));
    }
    Ok(())
}

/// Wire shape of an incoming request. `userLevel` and `level` are both accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePayload {
    pub texts: Vec<String>,
    #[serde(alias = "level")]
    pub user_level: Level,
}

impl TryFrom<TranslatePayload> for TranslationRequest {
    type Error = TranslateError;

    fn try_from(payload: TranslatePayload) -> Result<Self, Self::Error> {
        TranslationRequest::new(payload.texts, payload.user_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("b2".parse::<Level>().unwrap(), Level::B2);
        assert_eq!(" C1 ".parse::<Level>().unwrap(), Level::C1);
        assert!("D1".parse::<Level>().is_err());
    }

    #[test]
    fn level_bands() {
        assert_eq!(Level::A2.band(), Band::Beginner);
        assert_eq!(Level::B1.band(), Band::Intermediate);
        assert_eq!(Level::C2.band(), Band::Advanced);
    }

    #[test]
    fn request_trims_texts() {
        let req =
            TranslationRequest::new(strings(&["  我喜欢读书 ", "今天"]), Level::A1).unwrap();
        assert_eq!(req.texts(), &["我喜欢读书".to_string(), "今天".to_string()]);
    }

    #[test]
    fn fifty_texts_of_max_length_are_accepted() {
        let texts: Vec<String> = (0..MAX_TEXTS)
            .map(|i| {
                let mut s = format!("{i:04}");
                s.push_str(&"字".repeat(MAX_TEXT_CHARS - 4));
                s
            })
            .collect();
        let req = TranslationRequest::new(texts, Level::B1).unwrap();
        assert_eq!(req.texts().len(), MAX_TEXTS);
    }

    #[test]
    fn fifty_one_texts_are_rejected() {
        let texts = vec!["x".to_string(); MAX_TEXTS + 1];
        let err = TranslationRequest::new(texts, Level::B1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = TranslationRequest::new(Vec::new(), Level::B1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let err = TranslationRequest::new(strings(&["ok", "   \t"]), Level::A1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("texts[1]"));
    }

    #[test]
    fn overlong_text_is_rejected_by_char_count() {
        let text = "é".repeat(MAX_TEXT_CHARS + 1);
        let err = TranslationRequest::new(vec![text], Level::A1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // 1000 multi-byte chars are fine even though the byte length is larger.
        let text = "é".repeat(MAX_TEXT_CHARS);
        assert!(TranslationRequest::new(vec![text], Level::A1).is_ok());
    }

    #[test]
    fn payload_accepts_camel_case_and_plain_level() {
        let p: TranslatePayload =
            serde_json::from_str(r#"{"texts":["a"],"userLevel":"B2"}"#).unwrap();
        assert_eq!(p.user_level, Level::B2);
        let p: TranslatePayload = serde_json::from_str(r#"{"texts":["a"],"level":"C1"}"#).unwrap();
        let req = TranslationRequest::try_from(p).unwrap();
        assert_eq!(req.level(), Level::C1);
    }
}
