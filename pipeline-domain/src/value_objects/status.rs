// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status enums
//!
//! Closed lifecycle states for stage execution and for logged error records
//! (`spec.md` §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stage's lifecycle state for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatusValue {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StageStatusValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatusValue::Pending => "pending",
            StageStatusValue::Running => "running",
            StageStatusValue::Completed => "completed",
            StageStatusValue::Failed => "failed",
            StageStatusValue::Skipped => "skipped",
        }
    }

    /// Whether this state is terminal for the current attempt — no more
    /// progress updates are expected once a stage reaches one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatusValue::Completed | StageStatusValue::Failed | StageStatusValue::Skipped
        )
    }
}

impl fmt::Display for StageStatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document's overall lifecycle state across the whole stage sequence
/// (`spec.md` §3, distinct from the per-stage [`StageStatusValue`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentProcessingStatus::Pending => "pending",
            DocumentProcessingStatus::Processing => "processing",
            DocumentProcessingStatus::Completed => "completed",
            DocumentProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged error record's resolution state (`spec.md` §3: `status ∈
/// {pending, retrying, resolved, failed}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorStatus {
    Pending,
    Retrying,
    Resolved,
    Failed,
}

impl PipelineErrorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineErrorStatus::Pending => "pending",
            PipelineErrorStatus::Retrying => "retrying",
            PipelineErrorStatus::Resolved => "resolved",
            PipelineErrorStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_failed_skipped_are_terminal() {
        assert!(!StageStatusValue::Pending.is_terminal());
        assert!(!StageStatusValue::Running.is_terminal());
        assert!(StageStatusValue::Completed.is_terminal());
        assert!(StageStatusValue::Failed.is_terminal());
        assert!(StageStatusValue::Skipped.is_terminal());
    }

    #[test]
    fn error_status_display_matches_as_str() {
        assert_eq!(PipelineErrorStatus::Retrying.to_string(), "retrying");
    }

    #[test]
    fn document_processing_status_round_trips_through_as_str() {
        for status in [
            DocumentProcessingStatus::Pending,
            DocumentProcessingStatus::Processing,
            DocumentProcessingStatus::Completed,
            DocumentProcessingStatus::Failed,
        ] {
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
