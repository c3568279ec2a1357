//! Request IDs and one log line per response.
//!
//! An inbound `X-Request-Id` from a proxy is kept when it is short and
//! printable; otherwise a ULID is minted. The ID names the request span and
//! is echoed in the response.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};
use tracing::Instrument;

pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INBOUND_ID_LEN: usize = 128;

/// The caller's ID if usable, a fresh ULID otherwise.
fn resolve_request_id(headers: &HeaderMap) -> HeaderValue {
    headers
        .get(&REQUEST_ID)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INBOUND_ID_LEN && v.to_str().is_ok())
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&ulid::Ulid::new().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

/// Quiet for successes, louder as the status gets worse.
fn log_response(method: &Method, path: &str, status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        ..400 => tracing::debug!(%method, path, status, duration_ms, "Response"),
        400..500 => tracing::info!(%method, path, status, duration_ms, "Response"),
        _ => tracing::warn!(%method, path, status, duration_ms, "Response"),
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let id = resolve_request_id(req.headers());
        let span = tracing::info_span!(
            "request",
            req_id = id.to_str().unwrap_or_default()
        );
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let start = Instant::now();

        let future = self.inner.call(req);

        Box::pin(
            async move {
                let result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                result
                    .map(|mut response| {
                        log_response(&method, &path, response.status(), duration_ms);
                        response.headers_mut().insert(REQUEST_ID.clone(), id);
                        response
                    })
                    .inspect_err(|e| {
                        tracing::error!(
                            %method,
                            path = %path,
                            error = ?e,
                            duration_ms,
                            "Request failed"
                        );
                    })
            }
            .instrument(span),
        )
    }
}
