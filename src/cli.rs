use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CSP report sink and CSRF-protected demo endpoints.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// TOML configuration file; ignored if it does not exist.
    #[arg(long, short, default_value = "websec.toml")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Pretty while developing, JSON for release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
