//! Request/response handling against a mock chat/completions endpoint.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lingomix::config::Config;
use lingomix::metrics::MetricsRegistry;
use lingomix::translate::chat::ChatCompletionsProvider;
use lingomix::translate::{CacheStore, TranslationOrchestrator};
use lingomix::{build_cache, handle};

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn config(base_url: &str, l2_path: Option<PathBuf>) -> Config {
    Config {
        api_key: "sk-test".into(),
        base_url: base_url.into(),
        model: "qwen-plus".into(),
        temperature: 0.3,
        provider_timeout: Duration::from_secs(5),
        cache_ttl: Duration::from_secs(3600),
        cache_op_timeout: Duration::from_millis(500),
        l1_capacity: 128,
        l2_path,
    }
}

fn orchestrator(cfg: &Config, cache: CacheStore) -> TranslationOrchestrator {
    let provider = ChatCompletionsProvider::new(&cfg.api_key, &cfg.base_url, &cfg.model)
        .unwrap()
        .with_temperature(cfg.temperature);
    TranslationOrchestrator::new(Arc::new(provider), cache, Arc::new(MetricsRegistry::new()))
        .with_provider_timeout(cfg.provider_timeout)
}

#[tokio::test]
async fn successful_request_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion(r#"["我喜欢读books","今天weather真好"]"#))
        .expect(1)
        .create_async()
        .await;

    let cfg = config(&server.url(), None);
    let (cache, _) = build_cache(&cfg);
    let orch = orchestrator(&cfg, cache);

    let body = r#"{"texts": ["我喜欢读书", " 今天天气真好 ", "我喜欢读书"], "userLevel": "A1"}"#;
    let response = handle(&orch, body).await;
    assert!(response.success);
    assert_eq!(response.code, 200);
    assert_eq!(
        response.data.unwrap(),
        vec!["我喜欢读books", "今天weather真好", "我喜欢读books"]
    );

    // Served from cache: the mock expects exactly one call.
    let response = handle(&orch, body).await;
    assert!(response.success);
    mock.assert_async().await;
}

#[tokio::test]
async fn validation_errors_map_to_400() {
    let server = mockito::Server::new_async().await;
    let cfg = config(&server.url(), None);
    let orch = orchestrator(&cfg, CacheStore::disabled());

    let response = handle(&orch, r#"{"texts": [], "userLevel": "B1"}"#).await;
    assert!(!response.success);
    assert_eq!(response.code, 400);
    assert_eq!(response.kind, Some("validation_error"));

    let response = handle(&orch, r#"{"texts": ["a"], "userLevel": "Z9"}"#).await;
    assert_eq!(response.code, 400);

    let response = handle(&orch, "not json").await;
    assert_eq!(response.code, 400);
}

#[tokio::test]
async fn provider_errors_map_to_503() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "invalid api key"}}"#)
        .create_async()
        .await;

    let cfg = config(&server.url(), None);
    let orch = orchestrator(&cfg, CacheStore::disabled());

    let response = handle(&orch, r#"{"texts": ["a"], "level": "C2"}"#).await;
    assert!(!response.success);
    assert_eq!(response.code, 503);
    assert_eq!(response.kind, Some("llm_failure"));
    assert!(response.data.is_none());
}

#[tokio::test]
async fn l2_survives_a_fresh_l1() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("l2.db");

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion(r#"["这个perspective很有insight"]"#))
        .expect(1)
        .create_async()
        .await;

    let cfg = config(&server.url(), Some(db));
    let body = r#"{"texts": ["这个观点很有洞察力"], "userLevel": "C1"}"#;

    let (cache, l2) = build_cache(&cfg);
    assert!(l2.is_some());
    let first = handle(&orchestrator(&cfg, cache), body).await;
    assert!(first.success);

    // New process-equivalent: empty L1, same SQLite file.
    let (cache, _) = build_cache(&cfg);
    let second = handle(&orchestrator(&cfg, cache), body).await;

    assert_eq!(first.data, second.data);
    mock.assert_async().await;
}

#[tokio::test]
async fn unusable_l2_path_falls_back_to_l1() {
    let server = mockito::Server::new_async().await;
    let cfg = config(
        &server.url(),
        Some(PathBuf::from("/nonexistent-dir/definitely/missing/l2.db")),
    );
    let (cache, l2) = build_cache(&cfg);
    assert!(l2.is_none());
    assert_eq!(cache.tier_names(), vec!["memory"]);
}
