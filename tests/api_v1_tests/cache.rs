use super::helpers::{create_manager, create_router, post_json, send_json};
use axum::http::StatusCode;
use serde_json::json;
use svclink::cache::CacheKey;
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const INVALIDATE: &str = "/api/v1/cache/invalidate";

// 预先缓存三个响应
async fn warm_cache(server: &MockServer) -> svclink::CommunicationManager {
    Mock::given(method("GET"))
        .and(path_regex("^/users/[0-9]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(server)
        .await;

    let manager = create_manager(server);
    for id in 1..=3 {
        let _: serde_json::Value = manager
            .get("userservice", &format!("/users/{}", id), None)
            .await
            .unwrap();
    }
    manager
}

#[tokio::test]
async fn test_invalidate_by_key() {
    let server = MockServer::start().await;
    let manager = warm_cache(&server).await;
    let router = create_router(manager, None);

    let key = CacheKey::new("userservice", "/users/1");
    let (status, json) = send_json(&router, post_json(INVALIDATE, json!({"key": key.as_str()}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["removed"], 1);

    // 再次删除同一个键
    let (_, json) = send_json(&router, post_json(INVALIDATE, json!({"key": key.as_str()}))).await;
    assert_eq!(json["data"]["removed"], 0);
}

#[tokio::test]
async fn test_invalidate_by_pattern_and_regex() {
    let server = MockServer::start().await;
    let manager = warm_cache(&server).await;
    let router = create_router(manager, None);

    let (status, json) = send_json(
        &router,
        post_json(INVALIDATE, json!({"pattern": "userservice:/users/1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["removed"], 1);

    let (status, json) = send_json(
        &router,
        post_json(INVALIDATE, json!({"regex": "^userservice:/users/[23]$"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["removed"], 2);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let server = MockServer::start().await;
    let router = create_router(create_manager(&server), None);

    // 缺少字段
    let (status, json) = send_json(&router, post_json(INVALIDATE, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "BadRequest");

    // 同时提供多个字段
    let (status, _) = send_json(
        &router,
        post_json(INVALIDATE, json!({"key": "a", "pattern": "b"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 正则无法编译
    let (status, _) = send_json(&router, post_json(INVALIDATE, json!({"regex": "("}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
