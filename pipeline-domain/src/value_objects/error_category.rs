// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Category
//!
//! The closed set of error categories the classifier (§4.1) ever produces.
//! Adding a category is a deliberate, reviewed change — code that matches
//! exhaustively on `ErrorCategory` is meant to fail to compile when a new
//! variant is introduced, so every retry-eligibility decision stays explicit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eleven closed error categories used to drive retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    RateLimit,
    Authentication,
    Authorization,
    Database,
    Validation,
    ResourceExhausted,
    NotFound,
    Internal,
    Unknown,
}

impl ErrorCategory {
    /// Returns the wire/string form used in log records and the
    /// `pipeline_errors.error_category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Database => "database",
            ErrorCategory::Validation => "validation",
            ErrorCategory::ResourceExhausted => "resource_exhausted",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// All categories, in the order they're introduced in `spec.md` §4.1.
    pub fn all() -> [ErrorCategory; 11] {
        [
            ErrorCategory::Network,
            ErrorCategory::Timeout,
            ErrorCategory::RateLimit,
            ErrorCategory::Authentication,
            ErrorCategory::Authorization,
            ErrorCategory::Database,
            ErrorCategory::Validation,
            ErrorCategory::ResourceExhausted,
            ErrorCategory::NotFound,
            ErrorCategory::Internal,
            ErrorCategory::Unknown,
        ]
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_round_trips_through_all() {
        for category in ErrorCategory::all() {
            assert!(!category.as_str().is_empty());
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
    }
}
