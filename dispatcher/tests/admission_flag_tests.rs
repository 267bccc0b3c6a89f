//! HTTP admission flag store tests against a mocked flag service

mod common;

use dispatcher::admission::{AdmissionFlagStore, AdmissionLabelPolicy, HttpAdmissionFlagStore};
use dispatcher::config::{Config, DispatchConfig, EnvironmentConfig};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_with_flag_url(url: &str) -> Config {
    let mut environments = HashMap::new();
    environments.insert(
        "prod-a".to_string(),
        EnvironmentConfig {
            host: "127.0.0.1".to_string(),
            agent_port: 18080,
            api_key: "k".to_string(),
        },
    );

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admission_flag_url: url.to_string(),
        dispatch: DispatchConfig {
            call_timeout_seconds: 2,
            max_concurrent_per_env: 4,
        },
        environments,
    }
}

#[tokio::test]
async fn lookup_reads_both_flags_for_the_namespace() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admission/status"))
        .and(query_param("env", "prod-a"))
        .and(query_param("namespace", "checkout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "admission": true,
            "scheduler": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpAdmissionFlagStore::new(&config_with_flag_url(&server.uri()));
    let flag = store.lookup("prod-a", "checkout").await.unwrap();
    assert!(flag.pinning_enabled());
}

#[tokio::test]
async fn scheduler_inactive_disables_pinning() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admission/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "admission": true,
            "scheduler": false
        })))
        .mount(&server)
        .await;

    let store = Arc::new(HttpAdmissionFlagStore::new(&config_with_flag_url(
        &server.uri(),
    )));
    let policy = AdmissionLabelPolicy::new(store);

    let allowed = policy.authorize("prod-a", "checkout", true).await.unwrap();
    assert!(!allowed, "one inactive flag must deny the label");
}

#[tokio::test]
async fn flag_service_error_fails_the_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admission/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = HttpAdmissionFlagStore::new(&config_with_flag_url(&server.uri()));
    assert!(store.lookup("prod-a", "checkout").await.is_err());
}

#[tokio::test]
async fn unreachable_flag_service_fails_the_lookup() {
    let store = HttpAdmissionFlagStore::new(&config_with_flag_url("http://127.0.0.1:9"));
    assert!(store.lookup("prod-a", "checkout").await.is_err());
}
