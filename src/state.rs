//! Application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, CryptoFailurePolicy};
use crate::csp::{ReportLogger, TracingReportLogger};
use crate::csrf::TokenGuard;
use crate::session::SessionStore;

/// Session cookie attributes.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub guard: TokenGuard,
    pub report_logger: Arc<dyn ReportLogger>,
    pub crypto_failure: CryptoFailurePolicy,
    pub session_cookie: SessionCookie,
    pub csp_policy: String,
    pub csp_report_only: bool,
    pub request_timeout: Duration,
}

impl AppState {
    /// Production wiring: OS-backed tokens and `tracing` report logging.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            TokenGuard::default(),
            Arc::new(TracingReportLogger),
        )
    }

    pub fn new(config: &Config, guard: TokenGuard, report_logger: Arc<dyn ReportLogger>) -> Self {
        Self {
            sessions: SessionStore::new(guard.generator(), config.max_sessions),
            guard,
            report_logger,
            crypto_failure: config.crypto_failure,
            session_cookie: SessionCookie {
                name: config.session_cookie_name.clone(),
                secure: config.session_cookie_secure,
            },
            csp_policy: config.csp_policy.clone(),
            csp_report_only: config.csp_report_only,
            request_timeout: config.request_timeout,
        }
    }
}
