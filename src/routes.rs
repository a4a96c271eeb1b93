//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    auth::{access::AccessPolicy, authentication_gate, require_authentication},
    config::ServerConfig,
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 认证接口请求体上限
const AUTH_BODY_LIMIT_BYTES: usize = 16 * 1024;

/// 公开路由白名单（按顺序匹配，未命中的路径需要认证）
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new()
        .permit("/auth")
        .permit("/health")
        .permit("/ready")
}

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let policy = Arc::new(access_policy());
    let cors = cors_layer(&state.config.server);

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT_BYTES));

    // 需要认证的路由
    let api_routes = Router::new().route("/api/me", get(handlers::auth::get_current_user));

    // 执行顺序：追踪 -> 认证闸门 -> 访问控制 -> handler
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(api_routes)
        .layer(axum::middleware::from_fn_with_state(policy, require_authentication))
        .layer(axum::middleware::from_fn_with_state(state.clone(), authentication_gate))
        .layer(axum::middleware::from_fn(request_tracking_middleware))
        .layer(cors)
        .with_state(state)
}

/// 根据配置构建 CORS 层
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        tracing::warn!("CORS allowed origins not set, allowing all origins");
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
