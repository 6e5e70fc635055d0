//! Caller identity resolution.
//!
//! Sessions are issued by an external identity provider; this service only
//! verifies them. Resolution works on the explicit request headers handed
//! to each handler.

pub mod jwt;

pub use jwt::{JwtIdentityResolver, SessionClaims, SESSION_COOKIE};

use axum::http::HeaderMap;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Resolves the caller of a request, or nothing when the request carries no
/// valid session.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Identity>;
}
