// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Outcome
//!
//! The result of driving one attempt of one stage, returned by every
//! control-surface operation (`spec.md` §5). Immutable once constructed —
//! a scheduler run always finishes with a well-formed value of this type,
//! never a propagated error.

use crate::value_objects::{CorrelationId, ErrorId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcomeStatus {
    Completed,
    Failed,
    SkippedDueToLock,
    RetryScheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage_name: String,
    pub status: StageOutcomeStatus,
    pub error_id: Option<ErrorId>,
    pub correlation_id: CorrelationId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub outputs: Option<HashMap<String, Value>>,
}

impl StageOutcome {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stage_name: impl Into<String>,
        status: StageOutcomeStatus,
        error_id: Option<ErrorId>,
        correlation_id: CorrelationId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        outputs: Option<HashMap<String, Value>>,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            status,
            error_id,
            correlation_id,
            started_at,
            ended_at,
            outputs,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, StageOutcomeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_counts_as_success() {
        let base = |status| StageOutcome {
            stage_name: "upload".to_string(),
            status,
            error_id: None,
            correlation_id: CorrelationId::generate("req", "upload", 0),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            outputs: None,
        };
        assert!(base(StageOutcomeStatus::Completed).is_success());
        assert!(!base(StageOutcomeStatus::Failed).is_success());
        assert!(!base(StageOutcomeStatus::SkippedDueToLock).is_success());
        assert!(!base(StageOutcomeStatus::RetryScheduled).is_success());
    }
}
