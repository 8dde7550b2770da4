use mimalloc::MiMalloc;
use std::{process, time::Duration};
use svclink::{
    admin::AdminServer, args::Args, client::CommunicationManager, config::Config,
    error::AppError, m2m::TokenRefresher,
};
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemBuilder, Toplevel};
use tracing::{error, info};

// 使用 mimalloc 分配器提高内存效率
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_logging(args: &Args) {
    let builder = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_line_number(false);

    // 如果启用调试模式，输出调试信息，否则只输出 info 及以上级别
    if args.debug {
        builder.with_max_level(tracing::Level::DEBUG)
    } else {
        builder.with_max_level(tracing::Level::INFO)
    }
    .init();
}

// 程序入口
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志
    init_logging(&args);

    // 验证参数
    if let Err(e) = args.validation() {
        error!("Invalid command line arguments: {}", e);
        process::exit(1);
    }

    info!("Starting svclinkd - service communication layer");

    // 加载配置
    let config = match Config::from_file(&args.config) {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration file: {}", e);
            process::exit(1);
        }
    };

    // 如果是测试模式，成功验证配置后退出
    if args.test_config {
        info!("Configuration file validated successfully");
        return Ok(());
    }

    // 创建应用组件
    let components = match create_components(config) {
        Ok(components) => components,
        Err(e) => {
            error!("Failed to create application components: {}", e);
            process::exit(1);
        }
    };

    // 创建优雅关闭顶层管理器
    let toplevel = Toplevel::new(|s| async move {
        // 启动管理服务子系统
        if let Some(admin_server) = components.admin_server {
            s.start(SubsystemBuilder::new("admin_server", move |s| async move {
                admin_server.run(s).await
            }));
        }

        // 启动令牌刷新子系统
        if let Some(refresher) = components.token_refresher {
            s.start(SubsystemBuilder::new("token_refresher", move |s| async move {
                refresher.run(s).await
            }));
        }
    });

    // 等待关闭
    info!("All services started, waiting for shutdown signal...");
    match toplevel
        .catch_signals()
        .handle_shutdown_requests(Duration::from_secs(args.shutdown_timeout))
        .await
    {
        Ok(_) => {
            info!("Application gracefully shutdown");
            Ok(())
        }
        Err(e) => {
            error!("Application shutdown error: {}", e);
            process::exit(1);
        }
    }
}

// 应用组件
struct AppComponents {
    // 管理服务
    admin_server: Option<AdminServer>,
    // M2M 令牌刷新
    token_refresher: Option<TokenRefresher>,
}

// 创建应用组件
fn create_components(config: Config) -> Result<AppComponents, AppError> {
    let admin = config.admin.clone();
    let refresh_interval = Duration::from_secs(config.m2m.refresh_interval);

    // 创建通信管理器
    let manager = CommunicationManager::new(config)?;

    let token_refresher = manager
        .token_manager()
        .map(|tokens| TokenRefresher::new(tokens, refresh_interval));

    // 创建管理服务
    let admin_server = if admin.enabled {
        let addr = format!("{}:{}", admin.address, admin.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid admin server address: {}", e)))?;
        info!("Admin server initialized successfully: {:?}", addr);
        Some(AdminServer::new(
            addr,
            manager,
            admin.auth_token,
            Duration::from_secs(admin.timeout),
        ))
    } else {
        info!("Admin server disabled");
        None
    };

    Ok(AppComponents {
        admin_server,
        token_refresher,
    })
}
