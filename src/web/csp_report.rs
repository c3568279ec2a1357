//! CSP violation reporting endpoint.
//!
//! Browsers send CSP reports with `Content-Type: application/csp-report`,
//! not `application/json`, so we accept raw bytes and deserialize manually.
//! The endpoint is fire-and-forget: the response is always an empty 200,
//! whether or not the report could be parsed.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;

use crate::csp::{ReportError, record_report};
use crate::state::AppState;

/// `POST /CSPReporting`: logs the report through the injected logger.
pub(crate) async fn csp_report(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let logger = state.report_logger.as_ref();
    match body {
        // Outcome already logged by `record_report`.
        Ok(bytes) => {
            let _ = record_report(logger, &bytes);
        }
        Err(e) => logger.rejected(&ReportError::Read(e.body_text())),
    }

    StatusCode::OK
}
