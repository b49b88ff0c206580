//! Status code to severity classification

use crate::notifications::types::Severity;

/// Classify a status code into a severity.
///
/// An explicit severity always wins. Codes outside the 2xx-5xx ranges
/// (including 0 for a missing status) classify as errors.
pub fn classify(status: i32, explicit: Option<Severity>) -> Severity {
    if let Some(severity) = explicit {
        return severity;
    }

    match status {
        500.. => Severity::Error,
        400..=499 => Severity::Warning,
        300..=399 => Severity::Info,
        200..=299 => Severity::Success,
        _ => Severity::Error,
    }
}
