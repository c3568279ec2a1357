//! Server-rendered form page that issues the session's CSRF token.

use axum::Extension;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::error;

use crate::csrf::{CSRF_PARAM, CsrfToken};
use crate::session::SessionId;
use crate::state::AppState;
use crate::web::error::WebError;

/// `GET /`
pub(super) async fn index() -> Redirect {
    Redirect::to("/requests-protected")
}

/// `GET /requests-protected`: forms that post back to the protected endpoint
/// with the session token embedded.
pub(super) async fn requests_protected(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    match state
        .sessions
        .with_context(&session, |ctx| state.guard.issue(ctx))
    {
        Some(Ok(token)) => Html(render_forms(&token)).into_response(),
        Some(Err(e)) => {
            error!(error = %e, "Cannot render protected forms");
            WebError::TokenIssueFailed.into_response()
        }
        None => {
            error!(session = ?session, "Session disappeared before token issuance");
            WebError::TokenIssueFailed.into_response()
        }
    }
}

fn render_forms(token: &CsrfToken) -> String {
    let token = html_escape::encode_double_quoted_attribute(token.as_str());
    format!(
        r#"<html>
<head>
<title>CSRF Protection</title>
<link rel="stylesheet" type="text/css" href="styles.css" />
</head>
<body>
<h1>CSRF Protection</h1>
<h2>Protected GET request</h2>
<form action="/ProtectedServlet" method="get">
<input type="hidden" name="{CSRF_PARAM}" value="{token}" />
<label for="get-name">Name</label> <input type="text" id="get-name" name="name" />
<input type="submit" value="Send" />
</form>
<h2>Protected POST request</h2>
<form action="/ProtectedServlet" method="post">
<input type="hidden" name="{CSRF_PARAM}" value="{token}" />
<label for="post-name">Name</label> <input type="text" id="post-name" name="name" />
<input type="submit" value="Send" />
</form>
<h2>Forged request</h2>
<p><a href="/ProtectedServlet?name=Mallory">GET without a token</a> is rejected.</p>
</body>
</html>
"#
    )
}
