use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::time::Duration;
use svclink::{admin::AdminServer, config::Config, CommunicationManager};
use tower::ServiceExt;
use wiremock::MockServer;

// 创建指向模拟服务器的通信管理器
pub fn create_manager(server: &MockServer) -> CommunicationManager {
    let yaml = format!(
        r#"
serviceEndpoints:
  userservice: "{uri}"
  paymentservice: "{uri}"
retryPolicy:
  maxRetries: 0
"#,
        uri = server.uri()
    );
    CommunicationManager::new(Config::from_yaml(&yaml).unwrap()).unwrap()
}

// 创建管理路由
pub fn create_router(manager: CommunicationManager, auth_token: Option<&str>) -> Router {
    AdminServer::new(
        "127.0.0.1:0".parse().unwrap(),
        manager,
        auth_token.map(str::to_string),
        Duration::from_secs(30),
    )
    .router()
}

// 发送请求并解析 JSON 响应
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(router, request).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

// 发送请求并返回原始响应体
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
