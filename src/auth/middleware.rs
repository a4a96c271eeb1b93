//! 认证闸门中间件
//!
//! 每个请求都会经过该中间件：解析 Bearer 令牌、回查用户、校验主体，
//! 成功后把 `AuthContext` 挂到请求扩展上。闸门本身从不拒绝请求，
//! 是否必须登录由 `auth::access` 决定。

use crate::{
    auth::jwt::JwtService, error::AppError, middleware::AppState, models::user::User,
    repository::UserStore,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// 认证上下文（附加到请求扩展，仅在单个请求内有效）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub email: String,
    pub authorities: Vec<String>,
}

impl AuthContext {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            email: user.username().to_string(),
            authorities: vec![user.role.clone()],
        }
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 闸门对单个请求的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// 没有 Authorization 头或不是 Bearer 方案
    NoToken,
    /// 令牌无效、过期、用户不存在或主体不匹配
    InvalidToken,
    /// 请求已带有认证上下文，未重复认证
    AlreadyAuthenticated,
    /// 已挂载认证上下文
    Authenticated,
}

impl GateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateOutcome::NoToken => "no_token",
            GateOutcome::InvalidToken => "invalid_token",
            GateOutcome::AlreadyAuthenticated => "already_authenticated",
            GateOutcome::Authenticated => "authenticated",
        }
    }
}

/// 从 Authorization 头提取 Bearer 令牌
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .map(|token| token.to_string())
}

/// 对请求执行认证，成功时把 `AuthContext` 写入请求扩展
pub async fn authenticate(
    jwt_service: &JwtService,
    user_store: &dyn UserStore,
    req: &mut Request,
) -> GateOutcome {
    let Some(token) = extract_token(req.headers()) else {
        return GateOutcome::NoToken;
    };

    let subject = match jwt_service.parse_subject(&token) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return GateOutcome::InvalidToken;
        }
    };

    // 嵌套调用时不重复认证
    if req.extensions().get::<AuthContext>().is_some() {
        return GateOutcome::AlreadyAuthenticated;
    }

    let user = match user_store.find_by_email(&subject).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!("Token subject does not resolve to an account");
            return GateOutcome::InvalidToken;
        }
        Err(e) => {
            tracing::warn!(error = %e, "User lookup failed during authentication");
            return GateOutcome::InvalidToken;
        }
    };

    if !jwt_service.validate(&token, user.username()) {
        return GateOutcome::InvalidToken;
    }

    req.extensions_mut().insert(AuthContext::from(&user));
    GateOutcome::Authenticated
}

/// 认证闸门中间件 - 只负责挂载身份，不拒绝请求
pub async fn authentication_gate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let outcome = authenticate(&state.jwt_service, state.user_store.as_ref(), &mut req).await;

    tracing::debug!(
        outcome = outcome.as_str(),
        path = %req.uri().path(),
        "Authentication gate"
    );

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserStore;
    use axum::body::Body;
    use chrono::{Duration, Utc};

    fn jwt() -> JwtService {
        JwtService::new(b"test_secret_key_32_characters_long!", Duration::hours(1)).unwrap()
    }

    async fn store_with(email: &str, role: &str) -> InMemoryUserStore {
        let store = InMemoryUserStore::new();
        let mut user = User::new_local(email.to_string(), "hash".to_string(), None);
        user.role = role.to_string();
        store.save(&user).await.unwrap();
        store
    }

    fn request(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/me");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer test_token_123".parse().unwrap());

        assert_eq!(extract_token(&headers).as_deref(), Some("test_token_123"));
    }

    #[test]
    fn test_extract_token_missing() {
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert!(extract_token(&headers).is_none());

        headers.insert(AUTHORIZATION, "bearer lowercase".parse().unwrap());
        assert!(extract_token(&headers).is_none());
    }

    #[tokio::test]
    async fn test_valid_token_attaches_principal() {
        let jwt = jwt();
        let store = store_with("a@x.com", "ADMIN").await;
        let token = jwt.issue("a@x.com", Utc::now()).unwrap();
        let mut req = request(Some(&format!("Bearer {}", token)));

        let outcome = authenticate(&jwt, &store, &mut req).await;

        assert_eq!(outcome, GateOutcome::Authenticated);
        let ctx = req.extensions().get::<AuthContext>().unwrap();
        assert_eq!(ctx.email, "a@x.com");
        assert_eq!(ctx.authorities, vec!["ADMIN".to_string()]);
        assert!(ctx.has_authority("ADMIN"));
    }

    #[tokio::test]
    async fn test_missing_header_is_no_token() {
        let jwt = jwt();
        let store = InMemoryUserStore::new();
        let mut req = request(None);

        assert_eq!(authenticate(&jwt, &store, &mut req).await, GateOutcome::NoToken);
        assert!(req.extensions().get::<AuthContext>().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let jwt = jwt();
        let store = store_with("a@x.com", "USER").await;
        let token = jwt.issue("a@x.com", Utc::now() - Duration::hours(2)).unwrap();
        let mut req = request(Some(&format!("Bearer {}", token)));

        assert_eq!(authenticate(&jwt, &store, &mut req).await, GateOutcome::InvalidToken);
        assert!(req.extensions().get::<AuthContext>().is_none());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_invalid() {
        let jwt = jwt();
        let store = InMemoryUserStore::new();
        let token = jwt.issue("ghost@x.com", Utc::now()).unwrap();
        let mut req = request(Some(&format!("Bearer {}", token)));

        assert_eq!(authenticate(&jwt, &store, &mut req).await, GateOutcome::InvalidToken);
        assert!(req.extensions().get::<AuthContext>().is_none());
    }

    #[tokio::test]
    async fn test_existing_principal_is_kept() {
        let jwt = jwt();
        let store = store_with("a@x.com", "USER").await;
        let token = jwt.issue("a@x.com", Utc::now()).unwrap();
        let mut req = request(Some(&format!("Bearer {}", token)));
        let existing = AuthContext {
            email: "first@x.com".to_string(),
            authorities: vec!["USER".to_string()],
        };
        req.extensions_mut().insert(existing.clone());

        assert_eq!(
            authenticate(&jwt, &store, &mut req).await,
            GateOutcome::AlreadyAuthenticated
        );
        assert_eq!(req.extensions().get::<AuthContext>(), Some(&existing));
    }
}
