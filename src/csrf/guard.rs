//! Binds tokens to sessions and checks submitted values against them.
//!
//! A session moves from "no token" to "token issued" the first time it is
//! asked for a token, either explicitly through [`TokenGuard::issue`] or
//! implicitly on its first [`TokenGuard::validate`]. Tokens are never
//! rotated. Any failure, including an unavailable random source, rejects.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CsrfError, CsrfToken, OsRngTokenGenerator, TokenGenerator};
use crate::session::SessionContext;

#[derive(Clone)]
pub struct TokenGuard {
    generator: Arc<dyn TokenGenerator>,
}

impl Default for TokenGuard {
    fn default() -> Self {
        Self::new(Arc::new(OsRngTokenGenerator))
    }
}

impl TokenGuard {
    pub fn new(generator: Arc<dyn TokenGenerator>) -> Self {
        Self { generator }
    }

    /// The random source behind this guard's tokens.
    pub fn generator(&self) -> Arc<dyn TokenGenerator> {
        self.generator.clone()
    }

    /// Returns the session's token, generating and binding one if it has none.
    pub fn issue(&self, ctx: &mut SessionContext) -> Result<CsrfToken, CsrfError> {
        if let Some(token) = &ctx.csrf_token {
            return Ok(token.clone());
        }

        let token = self.generator.generate().inspect_err(|e| {
            warn!(error = %e, "Could not generate CSRF token");
        })?;
        debug!("Issued CSRF token for session");
        ctx.csrf_token = Some(token.clone());
        Ok(token)
    }

    /// Accepts the request only if `submitted` equals the session's token.
    pub fn validate(
        &self,
        ctx: &mut SessionContext,
        submitted: Option<&str>,
    ) -> Result<(), CsrfError> {
        let expected = self.issue(ctx)?;
        match submitted {
            None => Err(CsrfError::MissingToken),
            Some(candidate) if expected.matches(candidate) => Ok(()),
            Some(_) => Err(CsrfError::InvalidToken),
        }
    }
}
