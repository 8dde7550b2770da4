use super::common::{write_config, FULL_CONFIG};
use std::time::Duration;
use svclink::{
    config::{AuthType, BackoffStrategy, Config},
    error::{AppError, FailureKind},
};

#[test]
fn test_load_full_config_from_file() {
    let (_dir, path) = write_config(FULL_CONFIG);
    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.default_timeout, 5000);
    assert_eq!(config.retry_policy.max_retries, 2);
    assert_eq!(
        config.retry_policy.backoff_strategy,
        BackoffStrategy::Fibonacci
    );
    assert_eq!(
        config.retry_policy.retryable_failures,
        vec![FailureKind::Timeout, FailureKind::Connect]
    );
    assert_eq!(config.circuit_breaker.consecutive_failures, 4);
    assert_eq!(config.circuit_breaker.open_duration, 15);
    assert_eq!(config.circuit_breaker.call_timeout, 2000);

    assert_eq!(config.caching.default_ttl, 120);
    let policy = &config.caching.per_service_policies["userservice"];
    assert_eq!(policy.ttl, Some(600));
    assert!(!policy.cache_only_success);

    assert_eq!(config.bulkhead.limit_for("paymentservice"), 4);
    assert_eq!(config.bulkhead.limit_for("userservice"), 32);

    assert!(config.m2m.enabled);
    assert_eq!(config.m2m.scopes.len(), 2);
    assert_eq!(config.m2m.fallback_token.as_deref(), Some("static-fallback"));

    assert!(config.telemetry.enable_detailed_metrics);
    assert_eq!(config.admin.port, 9100);
    assert_eq!(config.admin.auth_token.as_deref(), Some("admin-token"));
}

#[test]
fn test_service_overrides() {
    let config = Config::from_yaml(FULL_CONFIG).unwrap();

    // 服务覆盖优先，未覆盖时使用全局配置
    assert_eq!(config.retry_config_for("paymentservice").max_retries, 0);
    assert_eq!(config.retry_config_for("userservice").max_retries, 2);
    assert_eq!(
        config.breaker_config_for("paymentservice").consecutive_failures,
        2
    );
    assert_eq!(config.breaker_config_for("skills").consecutive_failures, 4);
    assert_eq!(
        config.timeout_for("paymentservice"),
        Duration::from_millis(15000)
    );
    assert_eq!(config.timeout_for("skills"), Duration::from_millis(5000));

    let payment = config.service("paymentservice").unwrap();
    assert!(!payment.use_m2m);
    assert_eq!(payment.auth.as_ref().unwrap().r#type, AuthType::Basic);
    // 请求头在加载时预解析
    assert!(payment.headers[0].parsed_name.is_some());
    assert!(payment.headers[0].parsed_value.is_some());
}

#[test]
fn test_base_url_resolution() {
    let mut config = Config::from_yaml(FULL_CONFIG).unwrap();

    assert_eq!(
        config.base_url_for("userservice"),
        "http://users.internal:8080"
    );
    assert_eq!(config.base_url_for("unknown"), "http://unknown");

    // 网关优先于服务地址
    config.use_gateway = true;
    config.gateway_url = Some("https://gateway.internal/".to_string());
    assert_eq!(
        config.base_url_for("userservice"),
        "https://gateway.internal/userservice"
    );
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();

    assert!(!config.use_gateway);
    assert_eq!(config.default_timeout, 30_000);
    assert_eq!(config.retry_policy.max_retries, 3);
    assert_eq!(
        config.retry_policy.retryable_status_codes,
        vec![408, 429, 500, 502, 503, 504]
    );
    assert_eq!(config.circuit_breaker.consecutive_failures, 5);
    assert!(config.caching.enabled);
    assert_eq!(config.caching.default_ttl, 300);
    assert!(!config.m2m.enabled);
    assert!(config.telemetry.enabled);
    assert!(config.admin.enabled);
}

#[test]
fn test_missing_file() {
    let result = Config::from_file("/nonexistent/svclink.yaml");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn test_malformed_yaml() {
    let (_dir, path) = write_config("retryPolicy: [not, a, map");
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(AppError::Config(_))));
}
