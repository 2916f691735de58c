//! Fail-soft two-tier cache store.
//!
//! Tiers implement [`CacheBackend`] and may fail. [`CacheStore`] is the single
//! place where tier failures are turned into misses: reads degrade to "absent",
//! writes degrade to "not written", and every tier call is bounded by
//! `op_timeout`. Nothing in this module returns an error to the pipeline.
//!
//! Reads walk the tiers in order (L1, then L2). A hit in a lower tier is
//! back-filled into the tiers above it. Writes go to every tier.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::{metric_names, MetricsRegistry};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// One cache tier. Implementations report failures; the store absorbs them.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Values in the same order as `keys`; `None` for absent or expired entries.
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// Write all entries with the given TTL. Returns how many were stored.
    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<usize>;

    fn name(&self) -> &'static str;
}

/// Shared, concurrently usable cache over one or more tiers.
#[derive(Clone)]
pub struct CacheStore {
    tiers: Vec<Arc<dyn CacheBackend>>,
    op_timeout: Duration,
    backfill_ttl: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl CacheStore {
    /// Build a store over `tiers`, fastest first.
    pub fn new(tiers: Vec<Arc<dyn CacheBackend>>, op_timeout: Duration) -> Self {
        Self {
            tiers,
            op_timeout,
            backfill_ttl: DEFAULT_BACKFILL_TTL,
            metrics: None,
        }
    }

    /// Count degraded tier operations in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// TTL used when a lower-tier hit is copied into an upper tier.
    pub fn with_backfill_ttl(mut self, ttl: Duration) -> Self {
        self.backfill_ttl = ttl;
        self
    }

    /// A store with no tiers: every read misses, every write is dropped.
    pub fn disabled() -> Self {
        Self::new(Vec::new(), Duration::from_millis(0))
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Look up every key. Never fails: unavailable tiers count as misses.
    pub async fn get_many(&self, keys: &[String]) -> HashMap<String, Option<String>> {
        let mut found: Vec<Option<String>> = vec![None; keys.len()];

        for (depth, tier) in self.tiers.iter().enumerate() {
            let pending: Vec<usize> = (0..keys.len()).filter(|&i| found[i].is_none()).collect();
            if pending.is_empty() {
                break;
            }
            let pending_keys: Vec<String> = pending.iter().map(|&i| keys[i].clone()).collect();

            let values = match self.bounded(tier.get_many(&pending_keys)).await {
                Ok(values) if values.len() == pending_keys.len() => values,
                Ok(values) => {
                    warn!(
                        tier = tier.name(),
                        expected = pending_keys.len(),
                        actual = values.len(),
                        "cache tier returned wrong number of values, treating as misses"
                    );
                    self.degraded();
                    continue;
                }
                Err(e) => {
                    warn!(tier = tier.name(), error = %e, "cache read failed, treating as misses");
                    self.degraded();
                    continue;
                }
            };

            let mut backfill = Vec::new();
            for (&i, value) in pending.iter().zip(values) {
                if let Some(v) = value {
                    if depth > 0 {
                        backfill.push((keys[i].clone(), v.clone()));
                    }
                    found[i] = Some(v);
                }
            }

            if !backfill.is_empty() {
                debug!(tier = tier.name(), count = backfill.len(), "backfilling upper cache tiers");
                for upper in &self.tiers[..depth] {
                    // Remaining TTL is not tracked across tiers.
                    self.write_tier(upper.as_ref(), &backfill, self.backfill_ttl).await;
                }
            }
        }

        let hits = found.iter().filter(|v| v.is_some()).count();
        debug!(hits, total = keys.len(), "cache batch get");

        keys.iter().cloned().zip(found).collect()
    }

    /// Write all entries to every tier. Returns how many entries at least one
    /// tier accepted. Never fails.
    pub async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let mut written = 0;
        for tier in &self.tiers {
            written = written.max(self.write_tier(tier.as_ref(), entries, ttl).await);
        }
        debug!(written, total = entries.len(), "cache batch set");
        written
    }

    /// Single-key read with the same fail-soft contract as `get_many`.
    pub async fn get(&self, key: &str) -> Option<String> {
        let key = key.to_string();
        self.get_many(std::slice::from_ref(&key))
            .await
            .remove(&key)
            .flatten()
    }

    /// Single-key write. Returns whether any tier stored it.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        self.set_many(&[(key.to_string(), value.to_string())], ttl).await > 0
    }

    async fn write_tier(
        &self,
        tier: &dyn CacheBackend,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> usize {
        match self.bounded(tier.set_many(entries, ttl)).await {
            Ok(count) => {
                if count < entries.len() {
                    warn!(
                        tier = tier.name(),
                        written = count,
                        total = entries.len(),
                        "cache write partially failed"
                    );
                }
                count.min(entries.len())
            }
            Err(e) => {
                warn!(tier = tier.name(), error = %e, "cache write failed");
                self.degraded();
                0
            }
        }
    }

    fn degraded(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.incr(metric_names::CACHE_DEGRADED, 1);
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }
}

const DEFAULT_BACKFILL_TTL: Duration = Duration::from_secs(3600);
