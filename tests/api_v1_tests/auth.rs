use super::helpers::{create_manager, create_router, get, send, send_json};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use wiremock::MockServer;

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let server = MockServer::start().await;
    let router = create_router(create_manager(&server), Some("admin-token"));

    let (status, json) = send_json(&router, get("/api/v1/circuits")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["type"], "Unauthorized");

    let (status, _) = send_json(&router, get_with_token("/api/v1/circuits", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) =
        send_json(&router, get_with_token("/api/v1/circuits", "admin-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn test_health_is_not_protected() {
    let server = MockServer::start().await;
    let router = create_router(create_manager(&server), Some("admin-token"));

    let (status, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_no_token_configured_allows_all() {
    let server = MockServer::start().await;
    let router = create_router(create_manager(&server), None);

    let (status, _) = send_json(&router, get("/api/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
}
