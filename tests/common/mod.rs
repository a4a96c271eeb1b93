//! 测试公共模块
//! 提供测试配置、内存存储的应用状态和请求辅助函数

#![allow(dead_code)]

use auth_system::{
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
    middleware::AppState,
    repository::InMemoryUserStore,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";

/// 创建测试配置（低开销 Argon2 参数，无数据库）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            cors_allowed_origins: None,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            token_ttl_secs: 300,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        },
    }
}

/// 创建测试应用状态，返回状态和底层内存存储
pub fn create_test_app_state() -> (Arc<AppState>, Arc<InMemoryUserStore>) {
    let store = Arc::new(InMemoryUserStore::new());
    let state = AppState::new(create_test_config(), store.clone())
        .expect("Failed to create app state");
    (Arc::new(state), store)
}

/// 创建测试路由
pub fn create_test_app() -> (Router, Arc<AppState>, Arc<InMemoryUserStore>) {
    let (state, store) = create_test_app_state();
    let app = auth_system::routes::create_router(state.clone());
    (app, state, store)
}

/// 发送 JSON POST 请求
pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response.into_body()).await)
}

/// 发送原始请求体的 POST 请求（用于非法 JSON）
pub async fn post_raw(
    app: &Router,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response.into_body()).await)
}

/// 发送 GET 请求，可选 Authorization 头
pub async fn get(app: &Router, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    (status, read_json(response.into_body()).await)
}

async fn read_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// 注册并登录，返回令牌
pub async fn signup_and_login(app: &Router, email: &str, password: &str) -> String {
    let (status, _) = post_json(
        app,
        "/auth/signup",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(
        app,
        "/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_string()
}
