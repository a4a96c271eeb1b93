//! 认证服务：注册、登录

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    error::AppError,
    models::{auth::*, user::User},
    repository::UserStore,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

pub struct AuthService {
    user_store: Arc<dyn UserStore>,
    jwt_service: Arc<JwtService>,
    password_hasher: Arc<PasswordHasher>,
}

impl AuthService {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        jwt_service: Arc<JwtService>,
        password_hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            user_store,
            jwt_service,
            password_hasher,
        }
    }

    /// 用户注册
    ///
    /// 新用户固定为 USER 角色、LOCAL 登录类型；邮箱已存在时不做任何修改。
    pub async fn signup(&self, req: SignupRequest) -> Result<(), AppError> {
        req.validate()?;

        if self.user_store.find_by_email(&req.email).await?.is_some() {
            metrics::counter!("auth_signup_total", "outcome" => "conflict").increment(1);
            tracing::info!("Signup rejected: email already registered");
            return Err(AppError::AlreadyExists);
        }

        let password_hash = self.hash_password(req.password).await?;
        let user = User::new_local(req.email, password_hash, req.full_name);

        // 唯一约束兜底并发注册
        if let Err(e) = self.user_store.save(&user).await {
            if matches!(e, AppError::AlreadyExists) {
                metrics::counter!("auth_signup_total", "outcome" => "conflict").increment(1);
            }
            return Err(e);
        }

        metrics::counter!("auth_signup_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, "User registered");

        Ok(())
    }

    /// 用户登录
    ///
    /// 未知用户与密码错误返回同一个错误，并且都会完整执行一次密码校验。
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user = match self.user_store.find_by_email(&req.email).await? {
            Some(user) => user,
            None => {
                self.verify_dummy(req.password).await?;
                Self::record_login_failure("unknown_user");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self
            .verify_password(req.password, user.password_hash.clone())
            .await?
        {
            Self::record_login_failure("wrong_password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.jwt_service.issue(&user.email, Utc::now())?;

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        tracing::info!(
            user_id = %user.id,
            expires_in_secs = self.jwt_service.ttl().num_seconds(),
            "Login succeeded"
        );

        Ok(LoginResponse { token })
    }

    /// 记录登录失败（日志区分原因，响应不区分）
    fn record_login_failure(reason: &'static str) {
        metrics::counter!("auth_login_total", "outcome" => reason).increment(1);
        tracing::info!(reason, "Login failed");
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.password_hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.password_hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }

    async fn verify_dummy(&self, password: String) -> Result<bool, AppError> {
        let hasher = self.password_hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}
