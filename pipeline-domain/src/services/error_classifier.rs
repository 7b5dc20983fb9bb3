// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Classifier
//!
//! Pure function mapping a raised error to an [`ErrorClassification`]
//! (`spec.md` §4.1). `PipelineError::classify` already covers the common
//! case where the failure is already typed; this module additionally
//! covers the case where a stage processor surfaces a failure only as a
//! free-form message (e.g. a `ProcessingResult { success: false, .. }`),
//! by pattern-matching the authoritative mapping directly against text.

use crate::value_objects::{ErrorCategory, ErrorClassification};

/// Classifies an error given only its message and an optional HTTP-style
/// status code, following the authoritative mapping in §4.1. Never panics
/// — unrecognized input classifies as `unknown`/transient.
pub fn classify_message(message: &str, status_code: Option<u16>) -> ErrorClassification {
    let lower = message.to_lowercase();

    if let Some(code) = status_code {
        match code {
            401 => return ErrorClassification::new("HttpError", ErrorCategory::Authentication, false),
            403 => return ErrorClassification::new("HttpError", ErrorCategory::Authorization, false),
            404 => return ErrorClassification::new("HttpError", ErrorCategory::NotFound, false),
            429 => return ErrorClassification::new("HttpError", ErrorCategory::RateLimit, true),
            500..=599 if lower.contains("overload") => {
                return ErrorClassification::new("HttpError", ErrorCategory::ResourceExhausted, true);
            }
            _ => {}
        }
    }

    if contains_any(&lower, &["network unreachable", "connection reset", "dns"]) {
        ErrorClassification::new("NetworkError", ErrorCategory::Network, true)
    } else if contains_any(&lower, &["timeout", "deadline exceeded"]) {
        ErrorClassification::new("TimeoutError", ErrorCategory::Timeout, true)
    } else if contains_any(&lower, &["rate limit", "throttle"]) {
        ErrorClassification::new("RateLimitError", ErrorCategory::RateLimit, true)
    } else if contains_any(&lower, &["authentication failed", "unauthorized"]) {
        ErrorClassification::new("AuthenticationError", ErrorCategory::Authentication, false)
    } else if contains_any(&lower, &["permission denied", "forbidden"]) {
        ErrorClassification::new("AuthorizationError", ErrorCategory::Authorization, false)
    } else if contains_any(&lower, &["deadlock", "serialization failure", "lock timeout", "connection pool"]) {
        ErrorClassification::new("DatabaseError", ErrorCategory::Database, true)
    } else if contains_any(&lower, &["validation", "constraint violation", "schema"]) {
        ErrorClassification::new("ValidationError", ErrorCategory::Validation, false)
    } else if contains_any(&lower, &["out of memory", "disk full", "quota exceeded"]) {
        ErrorClassification::new("ResourceExhaustedError", ErrorCategory::ResourceExhausted, true)
    } else if contains_any(&lower, &["not found", "no such", "missing document"]) {
        ErrorClassification::new("NotFoundError", ErrorCategory::NotFound, false)
    } else if contains_any(&lower, &["internal error", "unexpected state"]) {
        ErrorClassification::new("InternalError", ErrorCategory::Internal, false)
    } else {
        ErrorClassification::unknown("UnknownError")
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping_takes_precedence() {
        assert_eq!(classify_message("denied", Some(401)).category, ErrorCategory::Authentication);
        assert_eq!(classify_message("denied", Some(403)).category, ErrorCategory::Authorization);
        assert_eq!(classify_message("missing", Some(404)).category, ErrorCategory::NotFound);
        assert_eq!(classify_message("slow down", Some(429)).category, ErrorCategory::RateLimit);
    }

    #[test]
    fn message_keywords_drive_classification_when_no_status_code() {
        assert_eq!(classify_message("connection reset by peer", None).category, ErrorCategory::Network);
        assert_eq!(classify_message("deadline exceeded", None).category, ErrorCategory::Timeout);
        assert_eq!(classify_message("deadlock detected", None).category, ErrorCategory::Database);
        assert_eq!(classify_message("schema validation failed", None).category, ErrorCategory::Validation);
    }

    #[test]
    fn unrecognized_input_is_unknown_and_transient() {
        let classification = classify_message("something weird happened", None);
        assert_eq!(classification.category, ErrorCategory::Unknown);
        assert!(classification.is_transient);
    }

    #[test]
    fn transient_flags_match_the_authoritative_table() {
        assert!(classify_message("rate limit hit", None).is_transient);
        assert!(!classify_message("permission denied", None).is_transient);
        assert!(!classify_message("not found", None).is_transient);
    }
}
