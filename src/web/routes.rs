//! Web router construction.

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;
use crate::web::middleware::session::SessionLayer;
use crate::web::{csp_report, pages, protected};
use tower_http::timeout::TimeoutLayer;

/// Creates the web server router
#[allow(deprecated)]
pub fn create_router(app_state: AppState) -> Router {
    // Routes that need a session: the token guard and the page that issues tokens.
    let session_router = Router::new()
        .route("/requests-protected", get(pages::requests_protected))
        .route(
            "/ProtectedServlet",
            get(protected::protected_get).post(protected::protected_post),
        )
        .layer(SessionLayer::new(
            app_state.sessions.clone(),
            app_state.session_cookie.clone(),
            app_state.crypto_failure,
        ))
        .with_state(app_state.clone());

    // Session-less routes; browsers post CSP reports without cookies.
    let public_router = Router::new()
        .route("/", get(pages::index))
        .route("/CSPReporting", post(csp_report::csp_report))
        .with_state(app_state.clone());

    let router = Router::new()
        .merge(session_router)
        .merge(public_router)
        .fallback(not_found);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer::new(&app_state.csp_policy, app_state.csp_report_only),
        TimeoutLayer::new(app_state.request_timeout),
    ))
}

async fn not_found() -> Response {
    let mut resp = (StatusCode::NOT_FOUND, "Not found").into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}
