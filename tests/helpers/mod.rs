//! Shared fixtures for router-level tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use tower::ServiceExt;
use websec::config::Config;
use websec::csp::{ReportError, ReportLogger};
use websec::csrf::{CsrfError, CsrfToken, TokenGenerator, TokenGuard};
use websec::session::{SessionContext, SessionId};
use websec::state::AppState;
use websec::web::create_router;

// The library's own capturing logger is `#[cfg(test)]` and therefore not
// visible to integration tests.

/// Report log line as seen by [`CapturingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logged {
    Received(String),
    Field(&'static str, String),
    Rejected(String),
}

#[derive(Default)]
pub struct CapturingLogger {
    entries: Mutex<Vec<Logged>>,
}

impl CapturingLogger {
    pub fn entries(&self) -> Vec<Logged> {
        self.entries.lock().unwrap().clone()
    }
}

impl ReportLogger for CapturingLogger {
    fn received(&self, raw: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(Logged::Received(raw.to_owned()));
    }

    fn field(&self, name: &'static str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(Logged::Field(name, value.to_owned()));
    }

    fn rejected(&self, error: &ReportError) {
        self.entries
            .lock()
            .unwrap()
            .push(Logged::Rejected(error.to_string()));
    }
}

/// A random source that is never available.
pub struct BrokenGenerator;

impl TokenGenerator for BrokenGenerator {
    fn generate(&self) -> Result<CsrfToken, CsrfError> {
        Err(CsrfError::CryptoUnavailable("provider missing".into()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub logger: Arc<CapturingLogger>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(Config::default(), TokenGuard::default())
    }

    pub fn with(config: Config, guard: TokenGuard) -> Self {
        let logger = Arc::new(CapturingLogger::default());
        let state = AppState::new(&config, guard, logger.clone());
        let router = create_router(state.clone());
        Self {
            router,
            state,
            logger,
        }
    }

    /// Register a session that already holds `token`.
    pub fn seed_session(&self, id: &str, token: &str) {
        self.state.sessions.insert(
            SessionId::from(id),
            SessionContext::with_token(CsrfToken::new(token)),
        );
    }

    /// Register a session that has not been issued a token yet.
    pub fn seed_empty_session(&self, id: &str) {
        self.state
            .sessions
            .insert(SessionId::from(id), SessionContext::new());
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_owned())).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn content_type(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the response's `Set-Cookie`, without attributes.
pub fn set_cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// Value of the first hidden `csrf_token` field in a rendered page.
pub fn embedded_token(html: &str) -> Option<String> {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker)? + marker.len();
    let len = html[start..].find('"')?;
    Some(html[start..start + len].to_owned())
}
