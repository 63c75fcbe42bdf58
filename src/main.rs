use std::sync::Arc;
use szark_social::{
    build_router,
    config::{Config, StoreBackend},
    services::{Database, MemoryStore},
    state::AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::new(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting Szark Social service ({})", config.environment);

    // 初始化存储
    let app_state = match config.store_backend {
        StoreBackend::Surreal => {
            let db = match Database::new(&config).await {
                Ok(db) => db,
                Err(e) => {
                    error!("Failed to create database connection: {}", e);
                    return Err(anyhow::anyhow!("Database initialization failed"));
                }
            };
            db.verify_connection().await?;
            db.define_schema().await?;
            info!("Database connection established successfully");
            AppState::build(config.clone(), Arc::new(db)).await?
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, data will not survive a restart");
            AppState::build(config.clone(), Arc::new(MemoryStore::new())).await?
        }
    };
    if !config.is_development() && config.store_backend == StoreBackend::Memory {
        warn!("In-memory store selected outside development");
    }

    let app = build_router(Arc::new(app_state));

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
