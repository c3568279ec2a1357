//! Fire-and-forget logging of CSP reports through an injected logger.

use tracing::{error, info};

use super::{CspReport, ReportError};

/// Destination for report log lines.
///
/// Handlers receive one of these at construction time instead of reaching for
/// a global, so tests can observe exactly what was recorded.
pub trait ReportLogger: Send + Sync {
    /// The raw body as received, lines joined.
    fn received(&self, raw: &str);
    /// One extracted report field.
    fn field(&self, name: &'static str, value: &str);
    /// The report could not be read or parsed and was discarded.
    fn rejected(&self, error: &ReportError);
}

/// Writes report lines as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportLogger;

impl ReportLogger for TracingReportLogger {
    fn received(&self, raw: &str) {
        info!(report = raw, "CSP report received");
    }

    fn field(&self, name: &'static str, value: &str) {
        info!(field = name, value, "CSP report field");
    }

    fn rejected(&self, error: &ReportError) {
        error!(error = %error, "Discarding CSP report");
    }
}

/// Logs the raw body, then either each report field or the reason it was dropped.
pub fn record_report(logger: &dyn ReportLogger, body: &[u8]) -> Result<CspReport, ReportError> {
    let raw: String = String::from_utf8_lossy(body).lines().collect();
    logger.received(&raw);

    let parsed = std::str::from_utf8(body)
        .map_err(ReportError::from)
        .and_then(CspReport::parse);

    match parsed {
        Ok(report) => {
            for (name, value) in report.fields() {
                logger.field(name, value);
            }
            Ok(report)
        }
        Err(e) => {
            logger.rejected(&e);
            Err(e)
        }
    }
}
