//! 认证服务主入口

use auth_system::{
    config::AppConfig,
    handlers::health,
    middleware::AppState,
    repository::{InMemoryUserStore, PgUserStore, UserStore},
    routes, telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("auth-system {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("AUTH_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Auth system starting...");

    // 3. 用户存储：配置了数据库则使用 PostgreSQL，否则使用内存存储
    let user_store: Arc<dyn UserStore> = match &config.database.url {
        Some(url) => Arc::new(PgUserStore::connect(url, &config.database).await?),
        None => {
            tracing::warn!("No database configured, using in-memory user store");
            Arc::new(InMemoryUserStore::new())
        }
    };

    // 4. 构建应用状态
    let addr = config.server.addr.clone();
    let app_state = Arc::new(AppState::new(config, user_store)?);

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}

/// 打印帮助信息
fn print_help() {
    println!("auth-system {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: auth-system [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量（前缀 AUTH_，层级分隔符 __）:");
    println!("  AUTH_SERVER__ADDR                监听地址，默认 0.0.0.0:3000");
    println!("  AUTH_DATABASE__URL               PostgreSQL 连接串，未设置时使用内存存储");
    println!("  AUTH_SECURITY__JWT_SECRET        令牌签名密钥（必填，至少 32 字符）");
    println!("  AUTH_SECURITY__TOKEN_TTL_SECS    令牌有效期（秒），默认 86400");
    println!("  AUTH_LOGGING__LEVEL / FORMAT     日志级别 / 格式（json|pretty）");
}
