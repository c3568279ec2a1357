//! `GET|POST /ProtectedServlet`: echoes `name` once the CSRF token checks out.
//!
//! GET is validated as strictly as POST even though GET is normally exempt
//! from CSRF checks.

use std::borrow::Cow;
use std::fmt;

use axum::Extension;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, info, warn};

use crate::csrf::{CSRF_HEADER, CSRF_PARAM, CsrfError};
use crate::session::SessionId;
use crate::state::AppState;
use crate::web::error::WebError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Post,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        })
    }
}

/// Parameters of a protected request. The first occurrence of a key wins.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProtectedParams {
    pub name: Option<String>,
    pub csrf_token: Option<String>,
}

impl ProtectedParams {
    /// Parse `application/x-www-form-urlencoded` pairs (query string or body).
    pub fn parse(input: &[u8]) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(input) {
            let slot = match key.as_ref() {
                "name" => &mut params.name,
                CSRF_PARAM => &mut params.csrf_token,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Fill missing values from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            name: self.name.or(fallback.name),
            csrf_token: self.csrf_token.or(fallback.csrf_token),
        }
    }
}

pub(super) async fn protected_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    info!("Processing protected GET request");
    let params = ProtectedParams::parse(query.unwrap_or_default().as_bytes());
    respond(&state, &session, &headers, params, Verb::Get)
}

pub(super) async fn protected_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!("Processing protected POST request");
    let from_query = ProtectedParams::parse(query.unwrap_or_default().as_bytes());
    let from_form = if is_form(&headers) {
        ProtectedParams::parse(&body)
    } else {
        ProtectedParams::default()
    };
    respond(&state, &session, &headers, from_query.or(from_form), Verb::Post)
}

fn respond(
    state: &AppState,
    session: &SessionId,
    headers: &HeaderMap,
    params: ProtectedParams,
    verb: Verb,
) -> Response {
    let submitted = params
        .csrf_token
        .as_deref()
        .or_else(|| headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()));

    let verdict = state
        .sessions
        .with_context(session, |ctx| state.guard.validate(ctx, submitted))
        .unwrap_or_else(|| {
            warn!(session = ?session, "Session disappeared before validation");
            Err(CsrfError::InvalidToken)
        });

    if let Err(e) = verdict {
        match e {
            CsrfError::CryptoUnavailable(_) => error!(error = %e, "CSRF token is invalid"),
            _ => warn!(error = %e, "CSRF token is invalid"),
        }
        return WebError::from_csrf(&e, state.crypto_failure).into_response();
    }

    info!("CSRF token is valid");
    info!(name = ?params.name, method = %verb, "Received parameter");

    Html(render_echo(params.name.as_deref(), verb)).into_response()
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn render_echo(name: Option<&str>, verb: Verb) -> String {
    let name: Cow<'_, str> = html_escape::encode_text(name.unwrap_or_default());
    format!(
        "<html>\n\
         <head>\n\
         <title>CSRF Protection</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"styles.css\" />\n\
         </head>\n\
         <body>\n\
         <h1>CSRF Protection</h1>\n\
         <p>Received <b>{name}</b> as {verb} parameter.</p>\n\
         <p><a href=\"/requests-protected\">Back</a></p>\n\
         </body>\n\
         </html>\n"
    )
}
