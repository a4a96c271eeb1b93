//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account, keyed by email
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,       // USER, ADMIN
    pub login_type: String, // LOCAL
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a freshly signed-up local account with the default role
    pub fn new_local(email: String, password_hash: String, full_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role: Role::User.into(),
            login_type: LoginType::Local.into(),
            full_name,
            created_at: Utc::now(),
        }
    }

    /// The identity a token subject must match
    pub fn username(&self) -> &str {
        &self.email
    }
}

/// Account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// How the account was created
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoginType {
    Local,
}

impl LoginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Local => "LOCAL",
        }
    }
}

impl From<LoginType> for String {
    fn from(login_type: LoginType) -> Self {
        login_type.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_local_user_defaults() {
        let user = User::new_local("a@x.com".to_string(), "$argon2id$...".to_string(), None);
        assert_eq!(user.role, "USER");
        assert_eq!(user.login_type, "LOCAL");
        assert_eq!(user.username(), "a@x.com");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new_local("a@x.com".to_string(), "secret-hash".to_string(), None);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
