// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Correlation ID
//!
//! A structured string tying together logs and error records of a single
//! stage attempt (`spec.md` §3). Format: `{request_id}.stage_{stage_name}.retry_{attempt}`,
//! attempts zero-indexed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed, validated correlation ID.
///
/// Constructed exclusively through [`CorrelationId::generate`] so every
/// instance in the system is guaranteed to match the documented format; never
/// constructed by hand-assembling the string elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a correlation ID for one stage attempt.
    ///
    /// `request_id` must not itself contain a `.`; the result is always
    /// exactly three `.`-delimited fields.
    pub fn generate(request_id: &str, stage_name: &str, attempt: u32) -> Self {
        Self(format!("{request_id}.stage_{stage_name}.retry_{attempt}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the ID back into `(request_id, stage_name, attempt)`.
    ///
    /// Returns `None` if the value does not match the expected three-field
    /// shape — this should only happen for correlation IDs that originated
    /// outside this system (e.g. hand-edited database rows).
    pub fn parse(&self) -> Option<(&str, &str, u32)> {
        let mut parts = self.0.splitn(3, '.');
        let request_id = parts.next()?;
        let stage_field = parts.next()?;
        let retry_field = parts.next()?;

        let stage_name = stage_field.strip_prefix("stage_")?;
        let attempt: u32 = retry_field.strip_prefix("retry_")?.parse().ok()?;

        Some((request_id, stage_name, attempt))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_matches_documented_format() {
        let id = CorrelationId::generate("req_abc", "image_processing", 1);
        assert_eq!(id.as_str(), "req_abc.stage_image_processing.retry_1");
    }

    #[test]
    fn parse_round_trips_fields() {
        let id = CorrelationId::generate("req_abc", "image_processing", 3);
        let (request_id, stage_name, attempt) = id.parse().unwrap();
        assert_eq!(request_id, "req_abc");
        assert_eq!(stage_name, "image_processing");
        assert_eq!(attempt, 3);
    }

    #[test]
    fn matches_documented_regex_pattern() {
        let re = regex::Regex::new(r"^[^.]+\.stage_[a-z_]+\.retry_\d+$").unwrap();
        let id = CorrelationId::generate("req_123", "text_extraction", 0);
        assert!(re.is_match(id.as_str()));
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(CorrelationId("not-a-correlation-id".to_string()).parse().is_none());
    }
}
