//! Cache key derivation.
//! Key: `translate:{blake3(text)}:{level}`. Callers pass the already-trimmed text.

use super::Level;

const KEY_PREFIX: &str = "translate";

/// Compute the cache key for a text at a level.
pub fn cache_key(text: &str, level: Level) -> String {
    let digest = blake3::hash(text.as_bytes());
    format!("{KEY_PREFIX}:{}:{}", digest.to_hex(), level.as_str())
}
