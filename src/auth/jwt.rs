//! JWT token issuance and validation
//! Stateless HS256 tokens carrying the account email as subject

use crate::{config::SecurityConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum HS256 secret length in bytes
const MIN_SECRET_LEN: usize = 32;

/// Token verification errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature does not verify")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token subject does not match the account")]
    SubjectMismatch,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account email)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    /// Create JWT service from a raw secret and token lifetime
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, AppError> {
        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Config(format!(
                "JWT secret too short (min {} chars)",
                MIN_SECRET_LEN
            )));
        }

        // Expiry is checked against an explicit instant in parse_subject_at
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Create JWT service from config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::new(
            config.jwt_secret.expose_secret().as_bytes(),
            Duration::seconds(config.token_ttl_secs as i64),
        )
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`, valid from `now` until `now + ttl`
    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let expiration = now + self.ttl;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Verify signature and expiry against the current time and return the subject
    pub fn parse_subject(&self, token: &str) -> Result<String, TokenError> {
        self.parse_subject_at(token, Utc::now())
    }

    /// Verify signature and expiry against `now` and return the subject
    pub fn parse_subject_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims.sub)
    }

    /// True iff the token verifies and its subject equals `expected_username` exactly
    pub fn validate(&self, token: &str, expected_username: &str) -> bool {
        match self.check_subject(token, expected_username) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Token validation failed");
                false
            }
        }
    }

    fn check_subject(&self, token: &str, expected_username: &str) -> Result<(), TokenError> {
        let subject = self.parse_subject(token)?;
        if subject != expected_username {
            return Err(TokenError::SubjectMismatch);
        }
        Ok(())
    }
}
