//! Lingomix: level-aware vocabulary mixing.
//! Main library: tracing setup, component wiring, and the stdin/stdout entry point.

pub mod config;
pub mod metrics;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use config::{Config, ConfigError};
use metrics::MetricsRegistry;
use translate::cache::MemoryCache;
use translate::chat::ChatCompletionsProvider;
use translate::sqlite_cache::SqliteCache;
use translate::{
    CacheBackend, CacheStore, ProviderError, TranslatePayload, TranslateError,
    TranslationOrchestrator, TranslationRequest,
};

/// How often expired L2 rows are swept.
const L2_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("provider client: {0}")]
    Provider(#[from] ProviderError),

    #[error("reading request: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `LINGOMIX_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lingomix=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let json = std::env::var("LINGOMIX_LOG_JSON").is_ok_and(|v| v == "1");
    // A second install (e.g. in tests) is not an error worth failing over.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Build the cache store described by `config`. A broken L2 path degrades to L1 only.
pub fn build_cache(config: &Config) -> (CacheStore, Option<Arc<SqliteCache>>) {
    let mut tiers: Vec<Arc<dyn CacheBackend>> =
        vec![Arc::new(MemoryCache::new(config.l1_capacity))];

    let l2 = config.l2_path.as_ref().and_then(|path| match SqliteCache::open(path) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "L2 cache unavailable, using L1 only");
            None
        }
    });
    if let Some(ref l2) = l2 {
        tiers.push(l2.clone());
    }

    let store = CacheStore::new(tiers, config.cache_op_timeout).with_backfill_ttl(config.cache_ttl);
    (store, l2)
}

/// Wire provider, cache and metrics into an orchestrator.
pub fn build_orchestrator(config: &Config) -> Result<TranslationOrchestrator, StartupError> {
    let provider = ChatCompletionsProvider::new(&config.api_key, &config.base_url, &config.model)?
        .with_temperature(config.temperature);
    let (cache, l2) = build_cache(config);
    if let Some(l2) = l2 {
        SqliteCache::spawn_cleanup(l2, L2_CLEANUP_INTERVAL);
    }

    info!(
        model = %config.model,
        tiers = ?cache.tier_names(),
        timeout_s = config.provider_timeout.as_secs(),
        "translation pipeline ready"
    );

    Ok(
        TranslationOrchestrator::new(Arc::new(provider), cache, Arc::new(MetricsRegistry::new()))
            .with_provider_timeout(config.provider_timeout)
            .with_cache_ttl(config.cache_ttl),
    )
}

/// Response envelope written to stdout.
#[derive(Debug, Serialize)]
pub struct Response {
    pub code: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
}

impl Response {
    pub fn ok(data: Vec<String>) -> Self {
        Self {
            code: 200,
            success: true,
            kind: None,
            msg: None,
            data: Some(data),
        }
    }

    pub fn error(err: &TranslateError) -> Self {
        let kind = err.kind();
        Self {
            code: kind.status_code(),
            success: false,
            kind: Some(kind.as_str()),
            msg: Some(err.to_string()),
            data: None,
        }
    }
}

/// Parse one JSON request body, run it through the pipeline, and build the response.
pub async fn handle(orchestrator: &TranslationOrchestrator, body: &str) -> Response {
    let request = serde_json::from_str::<TranslatePayload>(body)
        .map_err(|e| TranslateError::Validation(format!("malformed request: {e}")))
        .and_then(TranslationRequest::try_from);

    let result = match request {
        Ok(request) => orchestrator.translate(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(data) => Response::ok(data),
        Err(e) => {
            warn!(kind = e.kind().as_str(), error = %e, "translation request failed");
            Response::error(&e)
        }
    }
}

/// Read a request from stdin, write the response to stdout.
pub async fn run() -> Result<Response, StartupError> {
    init_tracing();
    let config = Config::from_env()?;
    let orchestrator = build_orchestrator(&config)?;

    let mut body = String::new();
    tokio::io::stdin().read_to_string(&mut body).await?;

    let response = handle(&orchestrator, &body).await;
    for (name, stats) in orchestrator.metrics().summary() {
        debug!(
            metric = %name,
            p50_us = stats.p50_us,
            p95_us = stats.p95_us,
            p99_us = stats.p99_us,
            count = stats.count,
            "stage timing"
        );
    }
    Ok(response)
}
