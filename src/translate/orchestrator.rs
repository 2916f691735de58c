//! Batch translation pipeline.
//!
//! validate → dedup → cache batch-read → provider call for misses →
//! cache batch-write → merge → reassemble in input order.
//!
//! Stateless per call; the only shared state is the cache store. A provider
//! failure fails the whole request, cached hits included. Cache trouble never
//! surfaces here: `CacheStore` already degrades it to misses.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use super::dedup::{TranslationMap, UniqueTexts};
use super::key::cache_key;
use super::provider::{ProviderError, TranslationProvider};
use super::store::CacheStore;
use super::{check_count, TranslateError, TranslationRequest};
use crate::metrics::{metric_names, MetricsRegistry, RequestIds};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct TranslationOrchestrator {
    provider: Arc<dyn TranslationProvider>,
    cache: CacheStore,
    metrics: Arc<MetricsRegistry>,
    provider_timeout: Duration,
    cache_ttl: Duration,
}

impl TranslationOrchestrator {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        cache: CacheStore,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            provider,
            cache: cache.with_metrics(Arc::clone(&metrics)),
            metrics,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Translate every text of the request. The output has one entry per
    /// input, in input order, duplicates included.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<Vec<String>, TranslateError> {
        let ids = RequestIds::new();
        let span = info_span!(
            "translate",
            request_id = %ids.request_id,
            trace_id = %ids.trace_id,
            level = %request.level(),
            texts = request.texts().len(),
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &TranslationRequest) -> Result<Vec<String>, TranslateError> {
        let total = self.metrics.span(metric_names::PIPELINE_TOTAL);
        let texts = request.texts();
        let level = request.level();

        // 1. Validate
        check_count(texts.len())?;

        // 2. Deduplicate
        let unique = UniqueTexts::from_texts(texts);
        self.metrics.incr(metric_names::DEDUP_SAVED, unique.saved() as u64);

        // 3. Cache batch-read
        let keys: Vec<String> = unique
            .as_slice()
            .iter()
            .map(|t| cache_key(t, level))
            .collect();
        let read = self.metrics.span(metric_names::CACHE_READ);
        let cached = self.cache.get_many(&keys).await;
        read.finish();

        let mut translations = TranslationMap::new(&unique);
        for (text, key) in unique.as_slice().iter().zip(&keys) {
            if let Some(Some(value)) = cached.get(key) {
                translations.insert(text, value.clone());
            }
        }
        let misses = translations.missing();
        let hits = translations.filled();
        self.metrics.incr(metric_names::CACHE_HITS, hits as u64);
        self.metrics.incr(metric_names::CACHE_MISSES, misses.len() as u64);
        debug!(
            unique = unique.len(),
            dedup_saved = unique.saved(),
            hits,
            misses = misses.len(),
            "cache lookup done"
        );

        if !misses.is_empty() {
            // 4. Provider call
            let fresh = self.call_provider(&misses, request).await?;

            // 5. Cache batch-write
            let entries: Vec<(String, String)> = misses
                .iter()
                .zip(&fresh)
                .map(|(text, value)| (cache_key(text, level), value.clone()))
                .collect();
            let write = self.metrics.span(metric_names::CACHE_WRITE);
            let written = self.cache.set_many(&entries, self.cache_ttl).await;
            write.finish();
            if written < entries.len() {
                self.metrics.incr(
                    metric_names::CACHE_WRITE_SHORTFALL,
                    (entries.len() - written) as u64,
                );
                debug!(written, total = entries.len(), "cache write-back incomplete");
            }

            // 6. Merge
            for (text, value) in misses.iter().zip(fresh) {
                translations.insert(text, value);
            }
        }

        // 7. Reassemble
        let (out, fallbacks) = translations.reassemble(texts);
        if fallbacks > 0 {
            // Unreachable when the provider honours its length contract.
            self.metrics.incr(metric_names::REASSEMBLY_FALLBACKS, fallbacks as u64);
            warn!(fallbacks, "translations missing after merge, returning source text");
        }

        let elapsed_us = total.finish();
        info!(
            hits,
            provided = unique.len() - hits,
            dedup_saved = unique.saved(),
            elapsed_ms = elapsed_us / 1000.0,
            "translation completed"
        );
        Ok(out)
    }

    async fn call_provider(
        &self,
        misses: &[String],
        request: &TranslationRequest,
    ) -> Result<Vec<String>, TranslateError> {
        let timeout = self.provider_timeout;
        self.metrics.incr(metric_names::PROVIDER_CALLS, 1);

        let call = self.metrics.span(metric_names::PROVIDER_CALL);
        // Outer bound in case an adapter ignores its timeout argument.
        let result = match tokio::time::timeout(
            timeout,
            self.provider.translate_batch(misses, request.level(), timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        };
        call.finish();

        let fresh = result.and_then(|fresh| {
            // Re-checked here: a short batch would shift every later translation.
            if fresh.len() == misses.len() {
                Ok(fresh)
            } else {
                Err(ProviderError::LengthMismatch {
                    expected: misses.len(),
                    actual: fresh.len(),
                })
            }
        });

        fresh.map_err(|e| {
            self.metrics.incr(metric_names::PROVIDER_FAILURES, 1);
            error!(
                provider = self.provider.name(),
                class = e.class(),
                error = %e,
                "provider call failed"
            );
            TranslateError::Llm(e)
        })
    }
}
