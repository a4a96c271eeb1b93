//! User repository (用户存储访问层)
//! 提供 PostgreSQL 实现与内存实现

use crate::{config::DatabaseConfig, error::AppError, models::user::User};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// 用户存储契约
///
/// 邮箱唯一性由存储自身保证：`save` 遇到已存在的邮箱时返回
/// `AppError::AlreadyExists`。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// 持久化新用户
    async fn save(&self, user: &User) -> Result<(), AppError>;

    /// 存储是否可用（就绪探针）
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// PostgreSQL 用户存储
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 建立连接池并执行 users 表迁移
    pub async fn connect(url: &Secret<String>, config: &DatabaseConfig) -> Result<Self, AppError> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to user database");
                AppError::Database(e)
            })?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User table migration failed");
                AppError::Database(e.into())
            })?;

        tracing::info!(
            max_connections = config.max_connections,
            "User store connected"
        );

        Ok(Self::new(db))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, login_type, full_name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, login_type, full_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(&user.login_type)
        .bind(&user.full_name)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            // 并发注册同一邮箱时由唯一约束兜底
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::AlreadyExists
            }
            other => AppError::Database(other),
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "User store health check failed");
                AppError::Database(e)
            })?;

        Ok(())
    }
}

/// 内存用户存储（开发与测试用）
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前用户数
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}
