//! Plain-text error responses for the CSRF-protected routes.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::config::CryptoFailurePolicy;
use crate::csrf::CsrfError;
use crate::session::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WebError {
    #[error("CSRF token is invalid")]
    InvalidCsrfToken,
    #[error("CSRF token could not be verified")]
    CsrfUnavailable,
    #[error("CSRF token could not be issued")]
    TokenIssueFailed,
    #[error("Too many active sessions")]
    TooManySessions,
}

impl WebError {
    /// Map a guard failure to a response, honoring the crypto failure policy.
    pub fn from_csrf(error: &CsrfError, policy: CryptoFailurePolicy) -> Self {
        match (error, policy) {
            (CsrfError::CryptoUnavailable(_), CryptoFailurePolicy::InternalError) => {
                WebError::CsrfUnavailable
            }
            _ => WebError::InvalidCsrfToken,
        }
    }

    /// Map a failed session start. A random source outage is treated like
    /// any other token failure.
    pub fn from_session(error: &SessionError, policy: CryptoFailurePolicy) -> Self {
        match error {
            SessionError::RandomUnavailable(e) => Self::from_csrf(e, policy),
            SessionError::Full(_) => WebError::TooManySessions,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::InvalidCsrfToken => StatusCode::UNAUTHORIZED,
            WebError::CsrfUnavailable | WebError::TokenIssueFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebError::TooManySessions => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
