//! Per-session CSRF token issuance and validation.

pub mod guard;
pub mod token;

pub use guard::TokenGuard;
pub use token::{CsrfToken, OsRngTokenGenerator, TokenGenerator};

/// Name of the query parameter and form field carrying the token.
pub const CSRF_PARAM: &str = "csrf_token";

/// Header alternative to [`CSRF_PARAM`] for script-driven requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("no CSRF token was submitted")]
    MissingToken,
    #[error("submitted CSRF token does not match the session token")]
    InvalidToken,
    #[error("secure random source unavailable: {0}")]
    CryptoUnavailable(String),
}
