//! Global security headers applied to every response.
//!
//! Injects standard security headers (XFO, XCTO, Referrer-Policy, etc.) and
//! the configured Content-Security-Policy, whose `report-uri` points at the
//! CSP report sink. In report-only mode the policy is sent as
//! `Content-Security-Policy-Report-Only` so violations are reported but not
//! enforced.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::{
    CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY, HeaderName,
};
use axum::response::Response;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::DEFAULT_CSP_POLICY;

static XFO: HeaderValue = HeaderValue::from_static("DENY");
static XCTO: HeaderValue = HeaderValue::from_static("nosniff");
static REFERRER: HeaderValue = HeaderValue::from_static("strict-origin-when-cross-origin");
static PERMISSIONS: HeaderValue =
    HeaderValue::from_static("camera=(), microphone=(), geolocation=()");
static COOP: HeaderValue = HeaderValue::from_static("same-origin");

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    csp_header: HeaderName,
    csp_value: HeaderValue,
}

impl SecurityHeadersLayer {
    /// An unusable `policy` falls back to [`DEFAULT_CSP_POLICY`]; config
    /// loading rejects such policies up front.
    pub fn new(policy: &str, report_only: bool) -> Self {
        let csp_value = HeaderValue::from_str(policy).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Invalid CSP policy, using default");
            HeaderValue::from_static(DEFAULT_CSP_POLICY)
        });
        let csp_header = if report_only {
            CONTENT_SECURITY_POLICY_REPORT_ONLY
        } else {
            CONTENT_SECURITY_POLICY
        };
        Self {
            csp_header,
            csp_value,
        }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            csp_header: self.csp_header.clone(),
            csp_value: self.csp_value.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    csp_header: HeaderName,
    csp_value: HeaderValue,
}

impl<S, B> Service<Request> for SecurityHeadersService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let csp_header = self.csp_header.clone();
        let csp_value = self.csp_value.clone();
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            headers.insert("x-frame-options", XFO.clone());
            headers.insert("x-content-type-options", XCTO.clone());
            headers.insert("referrer-policy", REFERRER.clone());
            headers.insert("permissions-policy", PERMISSIONS.clone());
            headers.insert("cross-origin-opener-policy", COOP.clone());

            // Handlers may set their own policy; don't override it.
            if !headers.contains_key(CONTENT_SECURITY_POLICY)
                && !headers.contains_key(CONTENT_SECURITY_POLICY_REPORT_ONLY)
            {
                headers.insert(csp_header, csp_value);
            }

            Ok(response)
        })
    }
}
