// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy Entity
//!
//! Configuration per `(component, stage_name)` governing retry eligibility
//! and backoff (`spec.md` §3). Loaded lazily, cached with TTL, falling back
//! to a code default when neither a cached nor a persisted row exists.
//! Never mutated by the core scheduler at runtime.

use crate::value_objects::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub component: String,
    pub stage_name: String,
    pub max_retries: u32,
    pub base_delay_seconds: f64,
    pub max_delay_seconds: f64,
    pub backoff_multiplier: f64,
    pub jitter_fraction: f64,
    pub retry_on: HashSet<ErrorCategory>,
}

impl RetryPolicy {
    /// The conservative, built-in default used when no database row and no
    /// cache entry exist for a `(component, stage_name)` pair.
    pub fn code_default(component: impl Into<String>, stage_name: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            stage_name: stage_name.into(),
            max_retries: 3,
            base_delay_seconds: 2.0,
            max_delay_seconds: 300.0,
            backoff_multiplier: 2.0,
            jitter_fraction: 0.2,
            retry_on: [
                ErrorCategory::Network,
                ErrorCategory::Timeout,
                ErrorCategory::RateLimit,
                ErrorCategory::Database,
                ErrorCategory::ResourceExhausted,
                ErrorCategory::Unknown,
            ]
            .into_iter()
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_default_is_internally_consistent() {
        let policy = RetryPolicy::code_default("scheduler", "upload");
        assert!(policy.max_retries > 0);
        assert!(policy.backoff_multiplier >= 1.0);
        assert!((0.0..=1.0).contains(&policy.jitter_fraction));
        assert!(policy.base_delay_seconds <= policy.max_delay_seconds);
    }

    #[test]
    fn code_default_retries_transient_categories_only() {
        let policy = RetryPolicy::code_default("scheduler", "upload");
        assert!(policy.retry_on.contains(&ErrorCategory::Network));
        assert!(!policy.retry_on.contains(&ErrorCategory::Validation));
        assert!(!policy.retry_on.contains(&ErrorCategory::Authorization));
    }
}
