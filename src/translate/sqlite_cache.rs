//! L2 persistent translation cache backed by SQLite.
//! Same string keys as L1. Each row carries its own expiry; expired rows are
//! invisible to reads and removed by `cleanup_expired`.
//! Queries run on the blocking pool so the async pipeline is never stalled by disk I/O.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::store::{CacheBackend, CacheError, CacheResult};

/// SQLite-backed translation cache (L2).
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) the SQLite cache database at the given path.
    pub fn open(db_path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| CacheError::Backend(format!("failed to open SQLite cache: {e}")))?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| CacheError::Backend(format!("PRAGMA failed: {e}")))?;

        let cache = Self::from_connection(conn)?;
        info!(path = %db_path.display(), "SQLite L2 cache opened");
        Ok(cache)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CacheError::Backend(format!("failed to open in-memory cache: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS translation_cache (
                cache_key TEXT PRIMARY KEY,
                translated_text TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_expires
                ON translation_cache(expires_at);",
        )
        .map_err(|e| CacheError::Backend(format!("create table failed: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Remove expired entries. Returns the number of rows deleted.
    pub fn cleanup_expired(&self) -> usize {
        let conn = self.conn.lock();
        match conn.execute(
            "DELETE FROM translation_cache WHERE expires_at <= ?1",
            params![now_unix()],
        ) {
            Ok(count) => {
                if count > 0 {
                    info!(removed = count, "L2 cache cleanup");
                }
                count
            }
            Err(e) => {
                warn!(error = %e, "L2 cache cleanup failed");
                0
            }
        }
    }

    /// Start a background cleanup loop on the Tokio runtime.
    pub fn spawn_cleanup(cache: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let cache = Arc::clone(&cache);
                if let Err(e) = tokio::task::spawn_blocking(move || cache.cleanup_expired()).await {
                    warn!(error = %e, "L2 cache cleanup task panicked");
                }
            }
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| CacheError::Backend(format!("blocking task failed: {e}")))?
        .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for SqliteCache {
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        let keys = keys.to_vec();
        let values = self
            .with_conn(move |conn| {
                let now = now_unix();
                let mut stmt = conn.prepare_cached(
                    "SELECT translated_text FROM translation_cache
                     WHERE cache_key = ?1 AND expires_at > ?2",
                )?;
                let mut out = Vec::with_capacity(keys.len());
                for key in &keys {
                    let value: Option<String> = stmt
                        .query_row(params![key, now], |row| row.get(0))
                        .optional()?;
                    out.push(value);
                }
                Ok(out)
            })
            .await?;

        debug!(
            hits = values.iter().filter(|v| v.is_some()).count(),
            total = values.len(),
            "L2 cache lookup"
        );
        Ok(values)
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<usize> {
        let entries = entries.to_vec();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let expires_at = now_unix().saturating_add(ttl_secs);
            let tx = conn.transaction()?;
            let mut written = 0;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO translation_cache
                     (cache_key, translated_text, expires_at)
                     VALUES (?1, ?2, ?3)",
                )?;
                for (key, value) in &entries {
                    written += stmt.execute(params![key, value, expires_at])?;
                }
            }
            tx.commit()?;
            Ok(written)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Current time as Unix timestamp (seconds).
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
