//! Runtime configuration.
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! environment variables (`PORT`, `LOG_LEVEL`, `CRYPTO_FAILURE`, ...).

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer, Serialize};

/// Default policy sent with every response. Violations are posted to the
/// report sink.
pub const DEFAULT_CSP_POLICY: &str =
    "default-src 'self'; script-src 'self'; style-src 'self'; report-uri /CSPReporting";

/// Sessions held at once before new ones are refused.
pub const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Status returned when the random source needed for a token is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CryptoFailurePolicy {
    /// Treat it like any other invalid token (401).
    #[default]
    Unauthorized,
    /// Surface it as a server fault (500).
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub max_sessions: usize,
    #[serde(deserialize_with = "duration", serialize_with = "duration_secs")]
    pub session_idle_timeout: Duration,
    #[serde(deserialize_with = "duration", serialize_with = "duration_secs")]
    pub request_timeout: Duration,
    #[serde(deserialize_with = "duration", serialize_with = "duration_secs")]
    pub shutdown_timeout: Duration,
    pub crypto_failure: CryptoFailurePolicy,
    pub csp_policy: String,
    pub csp_report_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_owned(),
            session_cookie_name: "session".to_owned(),
            session_cookie_secure: false,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_idle_timeout: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
            crypto_failure: CryptoFailurePolicy::default(),
            csp_policy: DEFAULT_CSP_POLICY.to_owned(),
            csp_report_only: false,
        }
    }
}

impl Config {
    /// Build the figment for `file` without extracting it.
    pub fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::raw().only(&[
                "port",
                "log_level",
                "session_cookie_name",
                "session_cookie_secure",
                "max_sessions",
                "session_idle_timeout",
                "request_timeout",
                "shutdown_timeout",
                "crypto_failure",
                "csp_policy",
                "csp_report_only",
            ]))
    }

    /// Load configuration; a missing TOML file is not an error.
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let config: Config = Self::figment(file)
            .extract()
            .with_context(|| format!("Failed to load config (file: {})", file.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        http::HeaderValue::from_str(&self.csp_policy)
            .context("csp_policy is not a valid header value")?;

        let name = &self.session_cookie_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            anyhow::bail!("session_cookie_name {name:?} must be a non-empty token");
        }
        if self.max_sessions == 0 {
            anyhow::bail!("max_sessions must be at least 1");
        }
        Ok(())
    }
}

/// Accepts `"30s"`, `"5m"`, `"1h"`, or a bare number of seconds.
fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn duration_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(text.trim())
        .map_err(|e| format!("invalid duration {text:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {text:?}: {e}"))
}
