use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

// 将配置写入临时目录，返回目录句柄（需保持存活）和文件路径
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}

// 完整的示例配置
pub const FULL_CONFIG: &str = r#"
useGateway: false
defaultTimeout: 5000
serviceEndpoints:
  userservice: "http://users.internal:8080/"
  skills: "http://skills.internal"
retryPolicy:
  maxRetries: 2
  backoffStrategy: fibonacci
  initialDelay: 100
  maxDelay: 2000
  retryableStatusCodes: [502, 503]
  retryableExceptions: [timeout, connect]
  useJitter: true
  jitterFactor: 0.2
circuitBreaker:
  exceptionsAllowedBeforeBreaking: 4
  durationOfBreak: 15
  timeout: 2000
  failureThreshold: 0.6
  minimumThroughput: 20
  samplingDuration: 60
caching:
  enabled: true
  defaultTTL: 120
  maxEntries: 500
  perServicePolicies:
    userservice:
      TTL: 600
      includePatterns: ["/users/"]
      excludePatterns: ["/users/me"]
      cacheOnlySuccess: false
bulkhead:
  maxParallelRequests: 32
  maxQueuedRequests: 16
  perServiceLimits:
    paymentservice: 4
m2m:
  enabled: true
  tokenEndpoint: "https://auth.internal/oauth/token"
  clientId: svclink
  clientSecret: s3cret
  scopes: ["users.read", "payments.write"]
  refreshBeforeExpiry: 120
  fallbackToken: static-fallback
telemetry:
  enabled: true
  enableDetailedMetrics: true
  sampleRate: 0.5
services:
  paymentservice:
    timeout: 15000
    useM2m: false
    auth:
      type: basic
      username: svc
      password: pass
    retryPolicy:
      maxRetries: 0
    circuitBreaker:
      exceptionsAllowedBeforeBreaking: 2
    headers:
      - op: insert
        key: x-source
        value: svclink
admin:
  port: 9100
  address: "127.0.0.1"
  authToken: admin-token
"#;
