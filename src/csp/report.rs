//! The CSP violation report envelope browsers post to `report-uri`.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use super::ReportError;
use super::json::parse_json_with_context;

/// Browser CSP violation report. All seven fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CspReport {
    #[serde(deserialize_with = "string_like")]
    pub document_uri: String,
    #[serde(deserialize_with = "string_like")]
    pub referrer: String,
    #[serde(deserialize_with = "string_like")]
    pub blocked_uri: String,
    #[serde(deserialize_with = "string_like")]
    pub violated_directive: String,
    #[serde(deserialize_with = "string_like")]
    pub source_file: String,
    #[serde(deserialize_with = "string_like")]
    pub script_sample: String,
    #[serde(deserialize_with = "string_like")]
    pub line_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CspReportEnvelope {
    csp_report: CspReport,
}

impl CspReport {
    /// Parses a `{"csp-report": {...}}` document.
    pub fn parse(body: &str) -> Result<Self, ReportError> {
        parse_json_with_context::<CspReportEnvelope>(body)
            .map(|envelope| envelope.csp_report)
            .map_err(ReportError::Malformed)
    }

    /// `(wire name, value)` pairs in report order.
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("document-uri", self.document_uri.as_str()),
            ("referrer", self.referrer.as_str()),
            ("blocked-uri", self.blocked_uri.as_str()),
            ("violated-directive", self.violated_directive.as_str()),
            ("source-file", self.source_file.as_str()),
            ("script-sample", self.script_sample.as_str()),
            ("line-number", self.line_number.as_str()),
        ]
    }
}

/// Accepts a JSON string, or a number/bool rendered as text.
///
/// Browsers send `line-number` as a number even though every field is
/// logged as a string.
/// `null`, arrays and objects are not coerced; they reject the report.
fn string_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct StringLike;

    impl Visitor<'_> for StringLike {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringLike)
}
