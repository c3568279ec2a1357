//! Content-Security-Policy violation reports: parsing and logging.

pub mod json;
pub mod report;
pub mod sink;

pub use report::CspReport;
pub use sink::{ReportLogger, TracingReportLogger, record_report};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to read report body: {0}")]
    Read(String),
    #[error("report body is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed CSP report {0}")]
    Malformed(String),
}
