//! Resolves the session cookie before protected handlers run.
//!
//! Known session ids are refreshed; missing or unknown ones get a brand new
//! session (never the id the client offered) and a `Set-Cookie` on the
//! response. The resolved [`SessionId`] is inserted into request extensions.
//!
//! If no session can be started (random source down, store full) the request
//! is answered here and never reaches the handler.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use cookie::{Cookie, SameSite};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::CryptoFailurePolicy;
use crate::session::{SessionId, SessionStore};
use crate::state::SessionCookie;
use crate::web::error::WebError;

#[derive(Clone)]
pub struct SessionLayer {
    store: SessionStore,
    cookie: Arc<SessionCookie>,
    crypto_failure: CryptoFailurePolicy,
}

impl SessionLayer {
    pub fn new(
        store: SessionStore,
        cookie: SessionCookie,
        crypto_failure: CryptoFailurePolicy,
    ) -> Self {
        Self {
            store,
            cookie: Arc::new(cookie),
            crypto_failure,
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            store: self.store.clone(),
            cookie: self.cookie.clone(),
            crypto_failure: self.crypto_failure,
        }
    }
}

#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    store: SessionStore,
    cookie: Arc<SessionCookie>,
    crypto_failure: CryptoFailurePolicy,
}

impl<S> Service<Request> for SessionService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let existing = session_cookie(req.headers(), &self.cookie.name)
            .map(|value| SessionId::from(value.as_str()))
            .filter(|id| self.store.touch(id));

        let (session, set_cookie) = match existing {
            Some(id) => (id, None),
            None => match self.store.create() {
                Ok(id) => {
                    tracing::debug!(session = ?id, "Started new session");
                    let header = set_cookie_header(&self.cookie, &id);
                    (id, header)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Could not start session");
                    let response =
                        WebError::from_session(&e, self.crypto_failure).into_response();
                    return Box::pin(async move { Ok(response) });
                }
            },
        };

        req.extensions_mut().insert(session);
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            if let Some(value) = set_cookie {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Ok(response)
        })
    }
}

/// Value of the named cookie across all `Cookie` headers, if present.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
}

fn set_cookie_header(config: &SessionCookie, id: &SessionId) -> Option<HeaderValue> {
    let cookie = Cookie::build((config.name.as_str(), id.as_str()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure)
        .build();

    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "Session cookie is not a valid header value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; session=abc123"),
        );
        assert_eq!(session_cookie(&headers, "session").as_deref(), Some("abc123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn set_cookie_attributes() {
        let config = SessionCookie {
            name: "session".into(),
            secure: false,
        };
        let value = set_cookie_header(&config, &SessionId::from("abc123")).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("session=abc123"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_configurable() {
        let config = SessionCookie {
            name: "sid".into(),
            secure: true,
        };
        let value = set_cookie_header(&config, &SessionId::from("x")).unwrap();
        assert!(value.to_str().unwrap().contains("Secure"));
    }
}
