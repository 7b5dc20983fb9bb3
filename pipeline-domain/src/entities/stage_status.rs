// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Status Entity
//!
//! The persisted state of one `(document, stage)` pair (`spec.md` §3,
//! "StageStatus"). This is what the stage tracker (§4.6) reads and writes
//! and what `smart_resume` (§4.9) inspects to decide what still needs
//! running.

use crate::services::datetime_serde;
use crate::value_objects::{DocumentId, ErrorId, Stage, StageStatusValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracks one document's progress through one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStatus {
    document_id: DocumentId,
    stage: Stage,
    status: StageStatusValue,
    progress_percent: u8,
    attempt: u32,
    error_message: Option<String>,
    last_error_id: Option<ErrorId>,
    #[serde(with = "datetime_serde::optional")]
    started_at: Option<DateTime<Utc>>,
    #[serde(with = "datetime_serde::optional")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(with = "datetime_serde")]
    updated_at: DateTime<Utc>,
}

impl StageStatus {
    /// A freshly created, not-yet-started status row for a stage.
    pub fn pending(document_id: DocumentId, stage: Stage) -> Self {
        Self {
            document_id,
            stage,
            status: StageStatusValue::Pending,
            progress_percent: 0,
            attempt: 0,
            error_message: None,
            last_error_id: None,
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        document_id: DocumentId,
        stage: Stage,
        status: StageStatusValue,
        progress_percent: u8,
        attempt: u32,
        error_message: Option<String>,
        last_error_id: Option<ErrorId>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            document_id,
            stage,
            status,
            progress_percent: progress_percent.min(100),
            attempt,
            error_message,
            last_error_id,
            started_at,
            completed_at,
            updated_at,
        }
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> StageStatusValue {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn last_error_id(&self) -> Option<&ErrorId> {
        self.last_error_id.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Marks the start of a new attempt. Clears any previous error message
    /// and completion timestamp, since this is a fresh run.
    ///
    /// `retry_attempt` is the zero-indexed attempt counter carried on
    /// [`crate::entities::ProcessingContext`] (`spec.md` §3: "attempts
    /// zero-indexed"); the persisted `attempt` column is the 1-indexed
    /// count of attempts made so far (`spec.md` §8 scenarios 1–2:
    /// `attempt=1` after one run, `attempt=2` after one retry), so this
    /// stores `retry_attempt + 1`.
    pub fn start(&mut self, retry_attempt: u32) {
        self.status = StageStatusValue::Running;
        self.attempt = retry_attempt + 1;
        self.progress_percent = 0;
        self.error_message = None;
        self.last_error_id = None;
        self.completed_at = None;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Resets a `failed` row back to `pending` ahead of a scheduled
    /// background retry (`spec.md` §4.7 step (b): "update the stage_status
    /// row to `pending`"). Clears the terminal error state so the row
    /// doesn't read as failed while idle during the backoff window — a
    /// worker that crashes mid-wait leaves a `pending` row `smart_resume`
    /// (§4.9) will still pick up, rather than a `running` row it
    /// deliberately skips. `attempt` is left untouched; the next `start`
    /// call bumps it when the retry actually begins.
    pub fn reset_for_retry(&mut self) {
        self.status = StageStatusValue::Pending;
        self.error_message = None;
        self.last_error_id = None;
        self.completed_at = None;
        self.updated_at = Utc::now();
    }

    /// Updates progress for the current attempt. Progress is clamped to
    /// `[0, 100]` — callers may report overshoot without crashing the
    /// tracker.
    pub fn update_progress(&mut self, progress_percent: u8) {
        self.progress_percent = progress_percent.min(100);
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = StageStatusValue::Completed;
        self.progress_percent = 100;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error_message: impl Into<String>, last_error_id: ErrorId) {
        self.status = StageStatusValue::Failed;
        self.error_message = Some(error_message.into());
        self.last_error_id = Some(last_error_id);
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = StageStatusValue::Skipped;
        self.error_message = Some(reason.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_to_one_hundred() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::Upload);
        status.start(0);
        status.update_progress(255);
        assert_eq!(status.progress_percent(), 100);
    }

    #[test]
    fn complete_forces_progress_to_one_hundred() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::Upload);
        status.start(0);
        status.update_progress(40);
        status.complete();
        assert_eq!(status.progress_percent(), 100);
        assert_eq!(status.status(), StageStatusValue::Completed);
        assert!(status.completed_at().is_some());
    }

    #[test]
    fn fail_records_error_message_and_last_error_id() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::TextExtraction);
        status.start(0);
        let error_id = ErrorId::generate();
        status.fail("boom", error_id.clone());
        assert_eq!(status.error_message(), Some("boom"));
        assert_eq!(status.last_error_id(), Some(&error_id));
        assert_eq!(status.status(), StageStatusValue::Failed);
    }

    #[test]
    fn start_clears_previous_attempt_error_state() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::TextExtraction);
        status.start(0);
        status.fail("transient error", ErrorId::generate());
        status.start(1);
        assert_eq!(status.error_message(), None);
        assert_eq!(status.last_error_id(), None);
        assert_eq!(status.completed_at(), None);
        assert_eq!(status.attempt(), 2);
    }

    #[test]
    fn start_persists_a_one_indexed_attempt_count() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::Upload);
        status.start(0);
        assert_eq!(status.attempt(), 1);
        status.fail("timeout", ErrorId::generate());
        status.start(1);
        assert_eq!(status.attempt(), 2);
    }

    #[test]
    fn reset_for_retry_clears_error_state_without_touching_attempt() {
        let mut status = StageStatus::pending(DocumentId::new(), Stage::Upload);
        status.start(0);
        status.fail("timeout", ErrorId::generate());

        status.reset_for_retry();

        assert_eq!(status.status(), StageStatusValue::Pending);
        assert_eq!(status.error_message(), None);
        assert_eq!(status.last_error_id(), None);
        assert_eq!(status.completed_at(), None);
        assert_eq!(status.attempt(), 1);
    }
}
