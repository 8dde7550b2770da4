use super::helpers::{create_manager, create_router, get, send, send_json};
use axum::http::StatusCode;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_health_and_metrics() {
    let server = MockServer::start().await;
    let router = create_router(create_manager(&server), None);

    let (status, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    // 先产生一次调用，确保指标已注册
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let manager = create_manager(&server);
    manager
        .execute(svclink::CallDescriptor::get("userservice", "/ping"))
        .await
        .unwrap();

    let (status, body) = send(&router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("svclink_calls_total"));
}

#[tokio::test]
async fn test_stats_overview_and_per_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":42}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let manager = create_manager(&server);
    let _: serde_json::Value = manager.get("userservice", "/users/42", None).await.unwrap();
    let _: serde_json::Value = manager.get("userservice", "/users/42", None).await.unwrap();
    assert!(manager
        .get::<serde_json::Value>("paymentservice", "/balance", None)
        .await
        .is_err());

    let router = create_router(manager, None);

    let (status, json) = send_json(&router, get("/api/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["summary"]["services"], 2);
    assert_eq!(json["data"]["summary"]["total_calls"], 3);
    assert_eq!(json["data"]["summary"]["cached_calls"], 1);
    assert_eq!(json["data"]["summary"]["failed_calls"], 1);
    // 按服务名排序
    assert_eq!(json["data"]["services"][0]["service"], "paymentservice");
    assert_eq!(json["data"]["services"][1]["service"], "userservice");

    let (status, json) = send_json(&router, get("/api/v1/stats/userservice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total_calls"], 2);
    assert_eq!(json["data"]["circuit_state"], "closed");

    let (status, json) = send_json(&router, get("/api/v1/stats/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["type"], "NotFound");
}

#[tokio::test]
async fn test_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let manager = create_manager(&server);
    manager
        .execute(svclink::CallDescriptor::get("paymentservice", "/balance"))
        .await
        .unwrap();
    let router = create_router(manager, None);

    let (status, json) = send_json(&router, get("/api/v1/circuits")).await;
    assert_eq!(status, StatusCode::OK);
    let circuits = json["data"].as_array().unwrap();
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0]["service"], "paymentservice");
    assert_eq!(circuits[0]["state"], "closed");
    assert_eq!(circuits[0]["trips"], 0);
}
