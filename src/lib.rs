//! szark-social 后端：用户资料、关注关系、通知与图片上传。

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use crate::{
    state::AppState,
    utils::middleware::{auth_middleware, rate_limit_middleware, request_logging_middleware},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// multipart 表单最多包含两张图片和少量文本字段
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 构建完整的应用路由
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let origins = &app_state.config.cors_allowed_origins;
    let allow_origin = if origins.trim() == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(allow_origin);

    let body_limit = app_state.config.max_upload_size * 2 + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/users", routes::users::router())
        .nest("/api/notifications", routes::notifications::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> &'static str {
    "Szark Social API is running!"
}
