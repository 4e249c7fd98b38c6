//! Upstash REST cache store against a mock endpoint

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyword_data_gateway::cache::{CacheError, CacheKey, CacheStore, UpstashCacheStore};

#[tokio::test]
async fn test_get_hit_and_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get/present"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "{\"a\":1}"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get/absent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
        .mount(&server)
        .await;

    let store = UpstashCacheStore::new(&server.uri(), "token-123").unwrap();
    assert_eq!(store.get_data("present").await.unwrap(), Some("{\"a\":1}".to_string()));
    assert_eq!(store.get_data("absent").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_sends_ttl_and_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set/entry"))
        .and(query_param("EX", "2592000"))
        .and(body_string("{\"balance\":1.5}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = UpstashCacheStore::new(&server.uri(), "token-123").unwrap();
    store.set_data("entry", "{\"balance\":1.5}", 2_592_000).await.unwrap();
}

#[tokio::test]
async fn test_backend_error_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&server)
        .await;

    let store = UpstashCacheStore::new(&server.uri(), "wrong").unwrap();
    let err = store.get_data("anything").await.unwrap_err();
    assert!(matches!(err, CacheError::Backend(ref msg) if msg.contains("Unauthorized")));
}

#[test]
fn test_cache_key_round_trip() {
    let key = CacheKey::new("keyword_suggestions", &json!({"keyword": "crm", "limit": 50})).unwrap();
    let decoded = CacheKey::decode(key.as_str()).unwrap();
    assert_eq!(decoded, "keyword_suggestions-{\"keyword\":\"crm\",\"limit\":50}");
    assert_eq!(key.operation(), "keyword_suggestions");
}
