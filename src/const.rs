// 应用常量定义

//
// 配置参数限制常量
//

// 应用关闭等待时间限制
pub mod shutdown_timeout {
    // 默认值
    pub const DEFAULT: u64 = 30;
    // 最小值
    pub const MIN: u64 = 1;
    // 最大值
    pub const MAX: u64 = 120;
}

// 调用超时限制
pub mod call_timeout_limits {
    // 默认单次调用截止时间（毫秒）
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
    // 最小调用截止时间（毫秒）
    pub const MIN_TIMEOUT_MS: u64 = 10;
    // 最大调用截止时间（毫秒）
    pub const MAX_TIMEOUT_MS: u64 = 600_000;
}

// HTTP客户端配置限制
pub mod http_client_limits {
    // 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
    // 最小连接超时（秒）
    pub const MIN_CONNECT_TIMEOUT: u64 = 1;
    // 最大连接超时（秒）
    pub const MAX_CONNECT_TIMEOUT: u64 = 120;
    // 默认空闲超时（秒）
    pub const DEFAULT_IDLE_TIMEOUT: u64 = 60;
    // 最大空闲超时（秒）
    pub const MAX_IDLE_TIMEOUT: u64 = 1800;
    // 默认keepalive时间（秒）
    pub const DEFAULT_KEEPALIVE: u32 = 30;
    // 最小keepalive时间（秒）
    pub const MIN_KEEPALIVE: u32 = 5;
    // 最大keepalive时间（秒）
    pub const MAX_KEEPALIVE: u32 = 600;
}

// 重试配置限制
pub mod retry_limits {
    // 默认重试次数（不含首次调用）
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    // 最大重试次数
    pub const MAX_RETRIES: u32 = 100;
    // 默认初始重试延迟（毫秒）
    pub const DEFAULT_INITIAL_MS: u64 = 200;
    // 最小初始重试延迟（毫秒）
    pub const MIN_INITIAL_MS: u64 = 1;
    // 最大初始重试延迟（毫秒）
    pub const MAX_INITIAL_MS: u64 = 10_000;
    // 默认最大重试延迟（毫秒）
    pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
    // 最大重试延迟上限（毫秒）
    pub const MAX_DELAY_MS: u64 = 120_000;
    // 默认抖动系数
    pub const DEFAULT_JITTER_FACTOR: f64 = 0.1;
    // 默认可重试的状态码
    pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];
}

// 熔断器配置限制
pub mod breaker_limits {
    // 默认失败率阈值
    pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.5;
    // 最小失败率阈值
    pub const MIN_FAILURE_THRESHOLD: f64 = 0.01;
    // 最大失败率阈值
    pub const MAX_FAILURE_THRESHOLD: f64 = 1.0;
    // 默认最小吞吐量
    pub const DEFAULT_MINIMUM_THROUGHPUT: u32 = 10;
    // 默认连续失败熔断次数
    pub const DEFAULT_CONSECUTIVE_FAILURES: u32 = 5;
    // 最大连续失败熔断次数
    pub const MAX_CONSECUTIVE_FAILURES: u32 = 1000;
    // 默认熔断时长（秒）
    pub const DEFAULT_OPEN_DURATION: u64 = 30;
    // 最小熔断时长（秒）
    pub const MIN_OPEN_DURATION: u64 = 1;
    // 最大熔断时长（秒）
    pub const MAX_OPEN_DURATION: u64 = 3600;
    // 默认单次调用超时（毫秒）
    pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
    // 默认统计窗口（秒）
    pub const DEFAULT_SAMPLING_DURATION: u64 = 30;
    // 最大统计窗口（秒）
    pub const MAX_SAMPLING_DURATION: u64 = 3600;
}

// 隔板配置限制
pub mod bulkhead_limits {
    // 默认最大并行请求数
    pub const DEFAULT_MAX_PARALLEL: usize = 64;
    // 最大并行请求数上限
    pub const MAX_PARALLEL: usize = 10_000;
    // 默认最大排队请求数
    pub const DEFAULT_MAX_QUEUED: usize = 128;
    // 最大排队请求数上限
    pub const MAX_QUEUED: usize = 100_000;
}

// 缓存配置限制
pub mod cache_limits {
    // 默认缓存有效期（秒）
    pub const DEFAULT_TTL: u64 = 300;
    // 最大缓存有效期（秒）
    pub const MAX_TTL: u64 = 86_400;
    // 默认最大缓存条目数
    pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;
    // 缓存键前缀
    pub const KEY_PREFIX: &str = "svclink";
}

// M2M 令牌配置限制
pub mod m2m_limits {
    // 默认令牌有效期（秒）
    pub const DEFAULT_TOKEN_LIFETIME: u64 = 3600;
    // 默认提前刷新时间（秒）
    pub const DEFAULT_REFRESH_BEFORE_EXPIRY: u64 = 300;
    // 默认后台刷新检查间隔（秒）
    pub const DEFAULT_REFRESH_INTERVAL: u64 = 60;
    // 最小后台刷新检查间隔（秒）
    pub const MIN_REFRESH_INTERVAL: u64 = 1;
    // 令牌交换超时（秒）
    pub const TOKEN_REQUEST_TIMEOUT: u64 = 10;
}

// 遥测配置限制
pub mod telemetry_limits {
    // 默认采样率
    pub const DEFAULT_SAMPLE_RATE: f64 = 1.0;
    // 每个端点保留的延迟样本数
    pub const LATENCY_WINDOW: usize = 1024;
}

// HTTP 头部常量
pub mod http_headers {
    // 关联ID头部
    pub const CORRELATION_ID: &str = "x-correlation-id";
    // 缓存标签头部
    pub const ETAG: &str = "etag";
    // 内容类型头部
    pub const CONTENT_TYPE: &str = "content-type";

    // 内容类型值
    pub mod content_types {
        // JSON 内容类型
        pub const JSON: &str = "application/json";
    }
}

//
// 指标标签常量
//

// 调用结果标签
pub mod outcome_labels {
    // 成功
    pub const SUCCESS: &str = "success";
    // 失败
    pub const FAILURE: &str = "failure";
    // 缓存命中
    pub const CACHED: &str = "cached";
    // 合并请求
    pub const DEDUPLICATED: &str = "deduplicated";
}

// 错误类型标签
pub mod error_labels {
    // 传输错误
    pub const TRANSPORT: &str = "transport";
    // 上游状态错误
    pub const UPSTREAM_STATUS: &str = "upstream_status";
    // 熔断
    pub const CIRCUIT_OPEN: &str = "circuit_open";
    // 隔板拒绝
    pub const BULKHEAD_REJECTED: &str = "bulkhead_rejected";
    // 重试耗尽
    pub const RETRY_EXHAUSTED: &str = "retry_exhausted";
    // 认证失败
    pub const AUTHENTICATION: &str = "authentication";
    // 合并请求失败
    pub const DEDUPLICATION: &str = "deduplication";
    // 截止时间
    pub const DEADLINE: &str = "deadline";
    // 序列化错误
    pub const SERIALIZATION: &str = "serialization";
}

// 熔断器状态标签
pub mod breaker_state_labels {
    pub const CLOSED: &str = "closed";
    pub const OPEN: &str = "open";
    pub const HALF_OPEN: &str = "half_open";
}

// 缓存查询结果标签
pub mod cache_labels {
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
    pub const EXPIRED: &str = "expired";
}

// 令牌刷新结果标签
pub mod token_labels {
    pub const REFRESHED: &str = "refreshed";
    pub const FAILED: &str = "failed";
    pub const FALLBACK: &str = "fallback";
}

// 管理 API 常量
pub mod api {
    // 响应状态
    pub mod response_status {
        pub const SUCCESS: &str = "success";
        pub const ERROR: &str = "error";
    }

    // 错误类型
    pub mod error_types {
        pub const NOT_FOUND: &str = "NotFound";
        pub const BAD_REQUEST: &str = "BadRequest";
        pub const UNAUTHORIZED: &str = "Unauthorized";
    }
}
