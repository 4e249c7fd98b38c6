//! End-to-end client tests against a mock DataForSEO server

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyword_data_gateway::cache::MemoryCacheStore;
use keyword_data_gateway::gateway::http::basic_auth;
use keyword_data_gateway::gateway::{
    create_config, ClientConfig, ConfigInput, DataForSeoClient, ErrorKind, KeywordFilters, RateLimiter,
    RetryPolicy,
};
use keyword_data_gateway::KeywordIntent;

const SUGGESTIONS_PATH: &str = "/dataforseo_labs/google/keyword_suggestions/live";
const OVERVIEW_PATH: &str = "/dataforseo_labs/google/keyword_overview/live";
const DOMAIN_PATH: &str = "/keywords_data/google_ads/keywords_for_site/live";
const USER_DATA_PATH: &str = "/appendix/user_data";

fn config(enable_caching: bool) -> ClientConfig {
    create_config(ConfigInput {
        enable_caching: Some(enable_caching),
        ..ConfigInput::with_credentials("login@example.com", "secret")
    })
    .unwrap()
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_delays(Duration::from_millis(1), Duration::from_millis(5))
}

fn client_for(server: &MockServer, max_retries: u32) -> DataForSeoClient {
    DataForSeoClient::builder(config(false))
        .base_url(server.uri())
        .retry_policy(fast_retries(max_retries))
        .build()
        .unwrap()
}

fn suggestions_body() -> Value {
    json!({
        "version": "0.1.20240801",
        "status_code": 20000,
        "cost": 0.0102,
        "tasks": [{
            "status_code": 20000,
            "status_message": "Ok.",
            "cost": 0.0102,
            "result": [{
                "seed_keyword": "running shoes",
                "total_count": 1240,
                "items": [
                    {
                        "keyword": "running shoes for men",
                        "location_code": 2840,
                        "language_code": "en",
                        "keyword_info": {
                            "search_volume": 33100,
                            "competition": 1.0,
                            "competition_level": "HIGH",
                            "cpc": 0.98,
                            "monthly_searches": [
                                {"year": 2024, "month": 2, "search_volume": 40500},
                                {"year": 2024, "month": 1, "search_volume": 33100}
                            ]
                        },
                        "keyword_properties": {
                            "keyword_difficulty": 64,
                            "search_intent_info": {"main_intent": "commercial"}
                        }
                    },
                    {
                        "keyword": "best running shoes",
                        "location_code": 2840,
                        "language_code": "en",
                        "keyword_info": {"search_volume": 74000, "cpc": null}
                    }
                ]
            }]
        }]
    })
}

#[tokio::test]
async fn test_suggestions_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .and(header("authorization", basic_auth("login@example.com", "secret").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(suggestions_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = client
        .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
        .await
        .unwrap();

    assert_eq!(result.data.len(), 2);
    assert_eq!(result.status_code, 20000);
    assert_eq!(result.total_results, 1240);
    assert!((result.cost - 0.0102).abs() < 1e-12);
    assert_eq!(result.data[0].keyword, "running shoes for men");
    assert_eq!(result.data[0].keyword_difficulty, Some(64));
    assert_eq!(result.data[1].cpc, 0.0);

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_made, 1);
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(metrics.failed_requests, 0);
    assert!((metrics.credits_used - 0.0102).abs() < 1e-12);
}

#[tokio::test]
async fn test_suggestions_request_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(suggestions_body()))
        .mount(&server)
        .await;

    let filters = KeywordFilters::new()
        .search_volume(Some(1000), None)
        .intents([KeywordIntent::Commercial])
        .build()
        .unwrap();

    let client = client_for(&server, 0);
    client
        .get_keyword_suggestions("running shoes", 2826, "any", &filters, 25, 10)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    let task = &body[0];
    assert_eq!(task["keyword"], "running shoes");
    assert_eq!(task["location_code"], 2826);
    assert_eq!(task["limit"], 25);
    assert_eq!(task["offset"], 10);
    assert!(task.get("language_code").is_none());
    assert_eq!(task["filters"], json!(filters));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(suggestions_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = client
        .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
        .await
        .unwrap();
    assert_eq!(result.data.len(), 2);

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_made, 2);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.successful_requests, 1);
}

#[tokio::test]
async fn test_authentication_failure_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OVERVIEW_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"status_code": 40100, "status_message": "Unauthorized"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client
        .get_keywords_overview(&["crm".to_string()], 2840, "en", false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), 401);
    assert!(err.response_body().is_some());
    assert_eq!(client.get_metrics().failed_requests, 1);
}

#[tokio::test]
async fn test_quota_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA_PATH))
        .respond_with(ResponseTemplate::new(402))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client.get_account_balance().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
}

#[tokio::test]
async fn test_upstream_rate_limit_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(suggestions_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    client
        .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
        .await
        .unwrap();

    let metrics = client.get_metrics();
    assert_eq!(metrics.rate_limit_hits, 1);
    assert_eq!(metrics.requests_made, 2);
    // a later success clears the violation streak
    assert_eq!(client.rate_limiter().snapshot().consecutive_violations, 0);
}

#[tokio::test]
async fn test_local_limiter_blocks_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_DATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{"status_code": 20000, "result": [{"money": {"balance": 12.5}}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataForSeoClient::builder(config(false))
        .base_url(server.uri())
        .rate_limiter(Arc::new(RateLimiter::new(1)))
        .build()
        .unwrap();

    assert_eq!(client.get_account_balance().await.unwrap(), Some(12.5));
    let err = client.get_account_balance().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert!(err.retry_after_ms().unwrap() > 0);
    assert_eq!(client.get_metrics().rate_limit_hits, 1);
}

#[tokio::test]
async fn test_cached_response_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUGGESTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(suggestions_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCacheStore::new());
    let client = DataForSeoClient::builder(config(true))
        .base_url(server.uri())
        .cache_store(store.clone())
        .build()
        .unwrap();

    let first = client
        .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
        .await
        .unwrap();
    let second = client
        .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.len().await, 1);
    assert_eq!(client.get_metrics().requests_made, 1);
}

#[tokio::test]
async fn test_domain_keywords_paged_locally() {
    let items: Vec<Value> = (0..6)
        .map(|i| json!({"keyword": format!("trail shoes {i}"), "search_volume": 1000 - i * 100, "competition": 0.5}))
        .collect();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DOMAIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cost": 0.075,
            "tasks": [{"status_code": 20000, "result_count": 6, "result": items}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let result = client
        .get_keywords_for_domain("example.com", 2840, "en", 2, 3)
        .await
        .unwrap();

    assert_eq!(result.total_results, 6);
    let keywords: Vec<&str> = result.data.iter().map(|k| k.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["trail shoes 3", "trail shoes 4"]);

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body[0]["target"], "https://example.com/");
}

#[tokio::test]
async fn test_connection_failure_exhausts_retries() {
    let client = DataForSeoClient::builder(config(false))
        .base_url("http://127.0.0.1:1")
        .retry_policy(fast_retries(1))
        .build()
        .unwrap();

    let err = client.get_account_balance().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.status_code(), 0);

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_made, 2);
    assert_eq!(metrics.failed_requests, 2);
}
