//! In-memory session store owned by the dispatch layer.
//!
//! Sessions only exist to carry a CSRF token between requests. Nothing is
//! persisted; a restart forgets every session.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::DEFAULT_MAX_SESSIONS;
use crate::csrf::{CsrfError, CsrfToken, OsRngTokenGenerator, TokenGenerator};

/// Opaque session identifier carried in the session cookie.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix: the full id is a bearer credential.
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}..)")
    }
}

/// Per-session state lent to handlers by mutable reference.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub csrf_token: Option<CsrfToken>,
    last_seen: Instant,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            csrf_token: None,
            last_seen: Instant::now(),
        }
    }

    /// A session that already holds `token`.
    pub fn with_token(token: CsrfToken) -> Self {
        Self {
            csrf_token: Some(token),
            last_seen: Instant::now(),
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    RandomUnavailable(#[from] CsrfError),
    #[error("session limit of {0} reached")]
    Full(usize),
}

/// Thread-safe session registry. Cloning shares the underlying map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<SessionId, SessionContext>>,
    ids: Arc<dyn TokenGenerator>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Arc::new(OsRngTokenGenerator), DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    /// `ids` supplies new session ids; at most `max_sessions` are held at once.
    pub fn new(ids: Arc<dyn TokenGenerator>, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ids,
            max_sessions,
        }
    }

    /// Starts an empty session and returns its id.
    ///
    /// The limit is checked before inserting, so concurrent creates can
    /// overshoot it by a few entries.
    pub fn create(&self) -> Result<SessionId, SessionError> {
        if self.inner.len() >= self.max_sessions {
            return Err(SessionError::Full(self.max_sessions));
        }
        let id = SessionId(self.ids.generate()?.as_str().to_owned());
        self.inner.insert(id.clone(), SessionContext::new());
        Ok(id)
    }

    /// Registers a session under a known id, replacing any existing entry.
    pub fn insert(&self, id: SessionId, context: SessionContext) {
        self.inner.insert(id, context);
    }

    /// Marks the session as active. Returns `false` for unknown ids.
    pub fn touch(&self, id: &SessionId) -> bool {
        match self.inner.get_mut(id) {
            Some(mut entry) => {
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Runs `f` with exclusive access to the session context.
    ///
    /// The entry's shard lock is held for the duration of `f`, so keep it short
    /// and never call back into the store from inside it.
    pub fn with_context<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut SessionContext) -> R,
    ) -> Option<R> {
        self.inner.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Drops sessions idle for `idle` or longer. Returns how many were removed.
    pub fn sweep(&self, idle: Duration) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, ctx| ctx.idle_for() < idle);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Spawn a background task that sweeps idle sessions every `interval`.
    /// The task runs until the process exits.
    pub fn spawn_sweeper(&self, interval: Duration, idle: Duration) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip the immediate first tick
            loop {
                ticker.tick().await;
                let removed = store.sweep(idle);
                if removed > 0 {
                    tracing::debug!(removed, remaining = store.len(), "Swept idle sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoEntropy;

    impl TokenGenerator for NoEntropy {
        fn generate(&self) -> Result<CsrfToken, CsrfError> {
            Err(CsrfError::CryptoUnavailable("getrandom failed".into()))
        }
    }

    #[test]
    fn created_ids_are_hex_and_distinct() {
        let store = SessionStore::default();
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn create_without_entropy_fails_and_stores_nothing() {
        let store = SessionStore::new(Arc::new(NoEntropy), 10);
        assert!(matches!(
            store.create(),
            Err(SessionError::RandomUnavailable(CsrfError::CryptoUnavailable(_)))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn create_stops_at_the_session_limit() {
        let store = SessionStore::new(Arc::new(OsRngTokenGenerator), 2);
        store.create().unwrap();
        store.create().unwrap();
        assert!(matches!(store.create(), Err(SessionError::Full(2))));
        assert_eq!(store.len(), 2);

        assert_eq!(store.sweep(Duration::ZERO), 2);
        assert!(store.create().is_ok());
    }

    #[test]
    fn create_registers_an_empty_session() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        assert!(store.touch(&id));
        let token = store.with_context(&id, |ctx| ctx.csrf_token.clone());
        assert_eq!(token, Some(None));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = SessionStore::default();
        let id = SessionId::from("nope");
        assert!(!store.touch(&id));
        assert!(store.with_context(&id, |_| ()).is_none());
    }

    #[test]
    fn with_context_mutations_persist() {
        let store = SessionStore::default();
        let id = store.create().unwrap();
        store.with_context(&id, |ctx| ctx.csrf_token = Some(CsrfToken::new("t")));
        let token = store.with_context(&id, |ctx| ctx.csrf_token.clone()).flatten();
        assert_eq!(token, Some(CsrfToken::new("t")));
    }

    #[test]
    fn sweep_keeps_recent_sessions() {
        let store = SessionStore::default();
        store.create().unwrap();
        store.create().unwrap();
        assert_eq!(store.sweep(Duration::from_secs(60)), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.sweep(Duration::ZERO), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn debug_does_not_print_full_id() {
        let id = SessionId::from("abcdefghijklmnop");
        let printed = format!("{id:?}");
        assert!(printed.contains("abcdef"));
        assert!(!printed.contains("ghijkl"));
    }
}
