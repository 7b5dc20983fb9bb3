// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Logger
//!
//! Dual-sink: a best-effort `pipeline_errors` row plus a structured ERROR
//! log line, with recursive key redaction (`spec.md` §4.4). If the
//! database write fails, the structured log still happens — the log is
//! the sink of record when the database itself is unreachable.

use pipeline_domain::entities::PipelineErrorRecord;
use pipeline_domain::repositories::PipelineErrorRepository;
use pipeline_domain::value_objects::{CorrelationId, DocumentId, ErrorCategory, ErrorId, PipelineErrorStatus, RequestId};
use pipeline_domain::PipelineError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

const REDACTED_SENTINEL: &str = "***REDACTED***";

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["password", "api_key", "token", "secret", "credential"];

/// Recursively walks a JSON value, replacing the value of any object key
/// whose name contains one of [`SENSITIVE_KEY_FRAGMENTS`] (case
/// insensitive) with a fixed sentinel. Arrays and nested objects are
/// walked in full; scalars and already-redacted values pass through
/// unchanged.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_KEY_FRAGMENTS.iter().any(|frag| lower.contains(frag)) {
                    redacted.insert(key.clone(), Value::String(REDACTED_SENTINEL.to_string()));
                } else {
                    redacted.insert(key.clone(), redact(v));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn redact_context(context: &HashMap<String, Value>) -> HashMap<String, Value> {
    context.iter().map(|(k, v)| (k.clone(), redact(v))).collect()
}

pub struct ErrorLogger {
    repository: Arc<dyn PipelineErrorRepository>,
}

impl ErrorLogger {
    pub fn new(repository: Arc<dyn PipelineErrorRepository>) -> Self {
        Self { repository }
    }

    /// Logs one classified failure: redacts `context`, persists a
    /// [`PipelineErrorRecord`] (best effort — a database failure here is
    /// itself logged but does not propagate), and always emits a
    /// structured ERROR log line.
    ///
    /// `stack_trace` is whatever string-form backtrace the caller has on
    /// hand — processors that fail via `ProcessingResult::failure` report
    /// only a message, so the scheduler passes a placeholder in that case
    /// (`spec.md` §4.4, step 2: "capture a stack trace string").
    #[allow(clippy::too_many_arguments)]
    pub async fn log_error(
        &self,
        correlation_id: CorrelationId,
        request_id: RequestId,
        document_id: DocumentId,
        stage_name: &str,
        error_type: &str,
        error_category: ErrorCategory,
        error_message: &str,
        stack_trace: &str,
        context: HashMap<String, Value>,
        attempt: u32,
        max_attempts: u32,
        is_transient: bool,
    ) -> ErrorId {
        let redacted_context = redact_context(&context);

        let record = PipelineErrorRecord::new(
            correlation_id.clone(),
            request_id,
            document_id,
            stage_name,
            error_type,
            error_category,
            error_message,
            stack_trace,
            redacted_context.clone(),
            attempt,
            max_attempts,
            is_transient,
        );
        let error_id = record.error_id().clone();

        if let Err(e) = self.repository.save(&record).await {
            error!(
                error_id = %error_id,
                correlation_id = %correlation_id,
                db_error = %e,
                "failed to persist pipeline_errors row; structured log remains the sink of record"
            );
        }

        error!(
            error_id = %error_id,
            correlation_id = %correlation_id,
            document_id = %document_id,
            stage = stage_name,
            error_type,
            error_category = %error_category,
            context = ?redacted_context,
            "{}",
            error_message
        );

        error_id
    }

    pub async fn by_id(&self, error_id: &ErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError> {
        self.repository.find_by_id(error_id).await
    }

    pub async fn by_request(&self, request_id: &str) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        self.repository.find_by_correlation_prefix(request_id).await
    }

    pub async fn list_unresolved(&self, limit: u32) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        self.repository.find_unresolved(limit).await
    }

    pub async fn mark_resolved(&self, error_id: &ErrorId, resolved_by: Option<String>, notes: Option<String>) -> Result<(), PipelineError> {
        if let Some(mut record) = self.repository.find_by_id(error_id).await? {
            record.resolve(resolved_by, notes);
            self.repository.save(&record).await?;
        }
        Ok(())
    }

    /// Marks an error record `failed` — retries are exhausted or the
    /// classified error was never retry-eligible (`spec.md` §4.9 step 3c).
    pub async fn mark_failed(&self, error_id: &ErrorId) -> Result<(), PipelineError> {
        if let Some(mut record) = self.repository.find_by_id(error_id).await? {
            record.fail();
            self.repository.save(&record).await?;
        }
        Ok(())
    }

    /// Resolves every `retrying` error record for `(request_id, stage_name)`
    /// when a background retry finally succeeds, so the chain terminates at
    /// `resolved` rather than sitting at `retrying` forever (`spec.md` §8
    /// scenario 2: "error row's final status is `resolved`").
    pub async fn resolve_retrying_for_stage(&self, request_id: RequestId, stage_name: &str) -> Result<(), PipelineError> {
        let records = self.repository.find_by_correlation_prefix(&request_id.to_string()).await?;
        for mut record in records {
            if record.stage_name() == stage_name && record.status() == PipelineErrorStatus::Retrying {
                record.resolve(None, None);
                self.repository.save(&record).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct InMemoryErrorRepo {
        records: TokioMutex<Vec<PipelineErrorRecord>>,
    }

    #[async_trait]
    impl PipelineErrorRepository for InMemoryErrorRepo {
        async fn save(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError> {
            let mut records = self.records.lock().await;
            records.retain(|r| r.error_id() != record.error_id());
            records.push(record.clone());
            Ok(())
        }

        async fn find_by_id(&self, error_id: &ErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError> {
            let records = self.records.lock().await;
            Ok(records.iter().find(|r| r.error_id() == error_id).cloned())
        }

        async fn find_by_correlation_prefix(&self, request_id: &str) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
            let records = self.records.lock().await;
            Ok(records.iter().filter(|r| r.request_id().to_string() == request_id).cloned().collect())
        }

        async fn find_unresolved(&self, _limit: u32) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
            Ok(vec![])
        }
    }

    fn retrying_record(request_id: RequestId, stage_name: &str, attempt: u32) -> PipelineErrorRecord {
        let correlation_id = CorrelationId::generate(&request_id.to_string(), stage_name, attempt);
        let mut record = PipelineErrorRecord::new(
            correlation_id,
            request_id,
            DocumentId::new(),
            stage_name,
            "Timeout",
            ErrorCategory::Network,
            "timed out",
            "stack",
            HashMap::new(),
            attempt,
            3,
            true,
        );
        record.schedule_retry(chrono::Utc::now());
        record
    }

    #[tokio::test]
    async fn resolve_retrying_for_stage_resolves_only_matching_stage_and_status() {
        let repo = Arc::new(InMemoryErrorRepo::default());
        let logger = ErrorLogger::new(repo.clone());
        let request_id = RequestId::new();

        let matching = retrying_record(request_id, "upload", 0);
        let other_stage = retrying_record(request_id, "text_extraction", 0);
        repo.save(&matching).await.unwrap();
        repo.save(&other_stage).await.unwrap();

        logger.resolve_retrying_for_stage(request_id, "upload").await.unwrap();

        let updated_matching = repo.find_by_id(matching.error_id()).await.unwrap().unwrap();
        let updated_other = repo.find_by_id(other_stage.error_id()).await.unwrap().unwrap();
        assert_eq!(updated_matching.status(), PipelineErrorStatus::Resolved);
        assert_eq!(updated_other.status(), PipelineErrorStatus::Retrying);
    }

    #[test]
    fn redacts_keys_matching_any_sensitive_fragment_case_insensitively() {
        let input = json!({
            "Password": "hunter2",
            "api_key": "sk-abc",
            "note": "fine",
            "nested": { "Secret_Token": "xyz", "ok": 1 },
        });

        let output = redact(&input);

        assert_eq!(output["Password"], json!(REDACTED_SENTINEL));
        assert_eq!(output["api_key"], json!(REDACTED_SENTINEL));
        assert_eq!(output["note"], json!("fine"));
        assert_eq!(output["nested"]["Secret_Token"], json!(REDACTED_SENTINEL));
        assert_eq!(output["nested"]["ok"], json!(1));
    }

    #[test]
    fn redacts_within_arrays() {
        let input = json!([{ "token": "abc" }, { "safe": "value" }]);
        let output = redact(&input);
        assert_eq!(output[0]["token"], json!(REDACTED_SENTINEL));
        assert_eq!(output[1]["safe"], json!("value"));
    }

    #[test]
    fn leaves_non_sensitive_scalars_untouched() {
        assert_eq!(redact(&json!(42)), json!(42));
        assert_eq!(redact(&json!("plain string")), json!("plain string"));
    }
}
