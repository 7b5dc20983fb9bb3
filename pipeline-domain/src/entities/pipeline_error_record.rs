// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Record Entity
//!
//! The durable record the error logger (§4.4) writes for every classified
//! failure. Named `PipelineErrorRecord` rather than reusing [`crate::error::PipelineError`]
//! (the in-process error type) since this is a distinct, persisted entity
//! with its own identity and lifecycle.

use crate::services::datetime_serde;
use crate::value_objects::{CorrelationId, DocumentId, ErrorCategory, ErrorId, PipelineErrorStatus, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One logged, classified error for a single stage attempt (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineErrorRecord {
    error_id: ErrorId,
    correlation_id: CorrelationId,
    request_id: RequestId,
    document_id: DocumentId,
    stage_name: String,
    error_type: String,
    error_category: ErrorCategory,
    error_message: String,
    stack_trace: String,
    context: HashMap<String, Value>,
    attempt: u32,
    max_attempts: u32,
    is_transient: bool,
    status: PipelineErrorStatus,
    #[serde(with = "datetime_serde::optional")]
    next_retry_at: Option<DateTime<Utc>>,
    #[serde(with = "datetime_serde::optional")]
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    resolution_notes: Option<String>,
    #[serde(with = "datetime_serde")]
    created_at: DateTime<Utc>,
    #[serde(with = "datetime_serde")]
    updated_at: DateTime<Utc>,
}

impl PipelineErrorRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        correlation_id: CorrelationId,
        request_id: RequestId,
        document_id: DocumentId,
        stage_name: impl Into<String>,
        error_type: impl Into<String>,
        error_category: ErrorCategory,
        error_message: impl Into<String>,
        stack_trace: impl Into<String>,
        context: HashMap<String, Value>,
        attempt: u32,
        max_attempts: u32,
        is_transient: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            error_id: ErrorId::generate(),
            correlation_id,
            request_id,
            document_id,
            stage_name: stage_name.into(),
            error_type: error_type.into(),
            error_category,
            error_message: error_message.into(),
            stack_trace: stack_trace.into(),
            context,
            attempt,
            max_attempts,
            is_transient,
            status: PipelineErrorStatus::Pending,
            next_retry_at: None,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn error_id(&self) -> &ErrorId {
        &self.error_id
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    pub fn error_category(&self) -> ErrorCategory {
        self.error_category
    }

    pub fn stack_trace(&self) -> &str {
        &self.stack_trace
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn status(&self) -> PipelineErrorStatus {
        self.status
    }

    pub fn context(&self) -> &HashMap<String, Value> {
        &self.context
    }

    pub fn resolved_by(&self) -> Option<&str> {
        self.resolved_by.as_deref()
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    /// Marks the error as having a background retry scheduled for
    /// `next_retry_at`.
    pub fn schedule_retry(&mut self, next_retry_at: DateTime<Utc>) {
        self.status = PipelineErrorStatus::Retrying;
        self.next_retry_at = Some(next_retry_at);
        self.updated_at = Utc::now();
    }

    /// Resolves the error, optionally recording who resolved it and why
    /// (`spec.md` §4.4's `mark_resolved(error_id, resolved_by?, notes?)`).
    pub fn resolve(&mut self, resolved_by: Option<String>, notes: Option<String>) {
        let now = Utc::now();
        self.status = PipelineErrorStatus::Resolved;
        self.resolved_at = Some(now);
        self.resolved_by = resolved_by;
        self.resolution_notes = notes;
        self.updated_at = now;
    }

    /// Marks the error as permanently failed: retries are exhausted or the
    /// classified error was never eligible (`spec.md` §3, terminal
    /// `failed` status).
    pub fn fail(&mut self) {
        self.status = PipelineErrorStatus::Failed;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineErrorRecord {
        PipelineErrorRecord::new(
            CorrelationId::generate("req_1", "upload", 0),
            RequestId::new(),
            DocumentId::new(),
            "upload",
            "Network",
            ErrorCategory::Network,
            "connection reset",
            "at upload::run (upload.rs:42)",
            HashMap::new(),
            0,
            3,
            true,
        )
    }

    #[test]
    fn new_record_starts_pending_with_generated_error_id() {
        let record = sample();
        assert_eq!(record.status(), PipelineErrorStatus::Pending);
        assert!(record.error_id().as_str().starts_with("err_"));
        assert_eq!(record.attempt(), 0);
        assert_eq!(record.max_attempts(), 3);
        assert!(record.is_transient());
    }

    #[test]
    fn schedule_retry_transitions_status_and_sets_next_retry_at() {
        let mut record = sample();
        let when = Utc::now();
        record.schedule_retry(when);
        assert_eq!(record.status(), PipelineErrorStatus::Retrying);
    }

    #[test]
    fn fail_transitions_status_to_terminal_failed() {
        let mut record = sample();
        record.fail();
        assert_eq!(record.status(), PipelineErrorStatus::Failed);
    }

    #[test]
    fn resolve_records_resolver_and_notes() {
        let mut record = sample();
        record.resolve(Some("operator@example.com".to_string()), Some("retried manually".to_string()));
        assert_eq!(record.status(), PipelineErrorStatus::Resolved);
        assert_eq!(record.resolved_by(), Some("operator@example.com"));
        assert_eq!(record.resolution_notes(), Some("retried manually"));
    }
}
