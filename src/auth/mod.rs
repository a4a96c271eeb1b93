//! Authentication and access control module

pub mod access;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use access::{require_authentication, Access, AccessPolicy};
pub use jwt::{Claims, JwtService, TokenError};
pub use middleware::{authenticate, authentication_gate, extract_token, AuthContext, GateOutcome};
pub use password::PasswordHasher;
