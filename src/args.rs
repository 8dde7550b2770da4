use crate::r#const::shutdown_timeout;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

// svclinkd - 服务间通信层
#[derive(Parser, Debug, Clone)]
#[command(
    name = "svclinkd",
    author,
    version,
    about = "A resilient service-to-service communication layer that puts retries, circuit breaking, bulkheads, \nresponse caching, request deduplication and M2M tokens behind a single call path.\n\n\
             Key Features:\n\
             - Retry Policies: Linear, exponential and Fibonacci backoff with optional jitter, per service overrides.\n\
             - Circuit Breaking: Consecutive failure and failure rate thresholds with a single half-open probe.\n\
             - Bulkheads: Per-service concurrency limits with bounded queueing.\n\
             - Response Caching: TTL cache with include/exclude rules and pattern invalidation.\n\
             - Request Deduplication: Identical in-flight reads share one downstream call.\n\
             - M2M Tokens: Client-credentials tokens refreshed ahead of expiry with static fallback.\n\
             - Admin API: Health, Prometheus metrics, call statistics and cache management."
)]
pub struct Args {
    // 配置文件路径
    #[clap(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        help = "Path to the configuration file"
    )]
    pub config: PathBuf,

    // 是否开启调试模式
    #[clap(
        short, 
        long, 
        action = ArgAction::SetTrue, 
        help = "Enable debug mode"
    )]
    pub debug: bool,

    // 是否仅测试配置文件
    #[clap(
        short = 't', 
        long = "test", 
        action = ArgAction::SetTrue, 
        help = "Test configuration file for validity and exit"
    )]
    pub test_config: bool,

    // 优雅关闭超时时间（秒）
    #[clap(
        long = "shutdown-timeout", 
        value_name = "SECONDS", 
        default_value_t = shutdown_timeout::DEFAULT, 
        help = "Maximum time in seconds to wait for complete shutdown"
    )]
    pub shutdown_timeout: u64,
}

impl Args {
    // 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    // 验证参数
    pub fn validation(&self) -> Result<(), String> {
        // 验证关闭超时时间
        if self.shutdown_timeout < shutdown_timeout::MIN
            || self.shutdown_timeout > shutdown_timeout::MAX
        {
            return Err(format!(
                "Shutdown timeout must be between {} and {} seconds",
                shutdown_timeout::MIN,
                shutdown_timeout::MAX
            ));
        }

        Ok(())
    }
}
