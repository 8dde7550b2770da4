use svclink::{config::Config, error::AppError};

// 辅助函数：断言配置加载失败
fn assert_invalid(yaml: &str) -> AppError {
    match Config::from_yaml(yaml) {
        Ok(_) => panic!("configuration should be rejected:\n{}", yaml),
        Err(e) => e,
    }
}

#[test]
fn test_jitter_factor_out_of_range() {
    let err = assert_invalid(
        r#"
retryPolicy:
  jitterFactor: 1.5
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[test]
fn test_failure_threshold_out_of_range() {
    let err = assert_invalid(
        r#"
circuitBreaker:
  failureThreshold: 0.0
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[test]
fn test_retry_delay_bounds() {
    let err = assert_invalid(
        r#"
services:
  userservice:
    retryPolicy:
      initialDelay: 5000
      maxDelay: 100
"#,
    );
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_invalid_cache_pattern() {
    let err = assert_invalid(
        r#"
caching:
  perServicePolicies:
    userservice:
      includePatterns: ["/users/(unclosed"]
"#,
    );
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_m2m_requires_credentials() {
    let err = assert_invalid(
        r#"
m2m:
  enabled: true
  tokenEndpoint: "https://auth.internal/oauth/token"
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = assert_invalid(
        r#"
m2m:
  enabled: true
  tokenEndpoint: "not a url"
  clientId: svclink
  clientSecret: secret
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));

    // 关闭时不检查
    assert!(Config::from_yaml("m2m:\n  enabled: false\n").is_ok());
}

#[test]
fn test_gateway_requires_url() {
    let err = assert_invalid("useGateway: true\n");
    assert!(matches!(err, AppError::Config(_)));

    let err = assert_invalid("useGateway: true\ngatewayUrl: \"::bad\"\n");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_invalid_service_endpoint() {
    let err = assert_invalid(
        r#"
serviceEndpoints:
  userservice: "users without scheme"
"#,
    );
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_invalid_header_name() {
    let err = assert_invalid(
        r#"
services:
  userservice:
    headers:
      - op: insert
        key: "bad header"
        value: x
"#,
    );
    assert!(matches!(err, AppError::InvalidHeader(_)));
}

#[test]
fn test_header_insert_requires_value() {
    let err = assert_invalid(
        r#"
services:
  userservice:
    headers:
      - op: replace
        key: x-source
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[test]
fn test_bearer_auth_requires_token() {
    let err = assert_invalid(
        r#"
services:
  userservice:
    auth:
      type: bearer
"#,
    );
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[test]
fn test_bulkhead_limit_must_be_positive() {
    let err = assert_invalid(
        r#"
bulkhead:
  perServiceLimits:
    paymentservice: 0
"#,
    );
    assert!(matches!(err, AppError::Config(_)));
}
