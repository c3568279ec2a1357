//! JSON parsing with located, human-readable errors.

use serde::de::DeserializeOwned;

/// Attempt to parse JSON and, on failure, describe where it went wrong: the
/// serde path, the type mismatch, and a snippet of the offending line.
pub fn parse_json_with_context<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize(jd) {
        Ok(value) => Ok(value),
        Err(err) => {
            let inner_err = err.inner();
            let (line, column) = (inner_err.line(), inner_err.column());
            let path = err.path().to_string();

            let msg = inner_err.to_string();
            let loc = format!(" at line {line} column {column}");
            let msg_without_loc = msg.strip_suffix(&loc).unwrap_or(&msg);

            let mut final_err = String::new();
            if !path.is_empty() && path != "." {
                final_err.push_str(&format!("at path '{path}': "));
            }
            final_err.push_str(&format!(
                "{} (line {line} col {column})",
                parse_type_mismatch(msg_without_loc)
            ));
            if let Some(snippet) = build_error_snippet(body, line, column, 20) {
                final_err.push('\n');
                final_err.push_str(&snippet);
            }

            Err(final_err)
        }
    }
}

/// Rewrites "invalid type: X, expected Y" as "expected Y, got X".
fn parse_type_mismatch(error_msg: &str) -> String {
    if let Some(invalid_start) = error_msg.find("invalid type: ") {
        let after_prefix = &error_msg[invalid_start + "invalid type: ".len()..];

        if let Some(comma_pos) = after_prefix.find(", expected ") {
            let actual_type = &after_prefix[..comma_pos];
            let expected_type = after_prefix[comma_pos + ", expected ".len()..]
                .split(" at line ")
                .next()
                .unwrap_or_default()
                .trim();

            return format!("expected {expected_type}, got {actual_type}");
        }
    }

    error_msg.to_string()
}

/// A window of `context_len` characters around the error column with a caret
/// under it. `None` when the line is empty or out of range.
fn build_error_snippet(
    body: &str,
    line: usize,
    column: usize,
    context_len: usize,
) -> Option<String> {
    let target_line: Vec<char> = body.lines().nth(line.checked_sub(1)?)?.chars().collect();
    if target_line.is_empty() {
        return None;
    }

    // column is 1-based
    let error_idx = column.saturating_sub(1).min(target_line.len());
    let half_len = context_len / 2;
    let start = error_idx.saturating_sub(half_len);
    let end = (error_idx + half_len).min(target_line.len());

    let slice: String = target_line[start..end].iter().collect();
    let indicator = " ".repeat(error_idx - start) + "^";

    Some(format!("...{slice}...\n   {indicator}"))
}
