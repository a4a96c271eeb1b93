//! Route-based access control
//!
//! An ordered list of path-prefix rules decides whether a route needs an
//! authenticated principal. First matching rule wins; unmatched paths
//! require authentication.

use crate::{auth::middleware::AuthContext, error::AppError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Access requirement for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

#[derive(Debug, Clone)]
struct AccessRule {
    prefix: String,
    access: Access,
}

/// Ordered path-prefix access rules
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
    fallback: Access,
}

impl AccessPolicy {
    /// Empty policy: every path requires authentication
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Access::Authenticated,
        }
    }

    /// Allow unauthenticated access under `prefix`
    pub fn permit(self, prefix: &str) -> Self {
        self.rule(prefix, Access::Public)
    }

    /// Require authentication under `prefix`
    pub fn authenticated(self, prefix: &str) -> Self {
        self.rule(prefix, Access::Authenticated)
    }

    fn rule(mut self, prefix: &str, access: Access) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        self.rules.push(AccessRule {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
            access,
        });
        self
    }

    /// Resolve the access requirement for `path`
    pub fn access_for(&self, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| prefix_matches(&rule.prefix, path))
            .map(|rule| rule.access)
            .unwrap_or(self.fallback)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Segment-aware prefix match: `/auth` covers `/auth` and `/auth/login`, not `/authz`
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Reject requests to protected routes that carry no principal
pub async fn require_authentication(
    State(policy): State<Arc<AccessPolicy>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if policy.access_for(path) == Access::Authenticated
        && req.extensions().get::<AuthContext>().is_none()
    {
        tracing::debug!(path = %path, "Unauthenticated request to protected route");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}
