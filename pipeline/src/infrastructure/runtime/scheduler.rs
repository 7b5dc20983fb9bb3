// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Scheduler
//!
//! Drives one attempt of one stage for one document (`spec.md` §4.9):
//! compute the correlation id, acquire the advisory lock, start the
//! tracker, call the processor, classify any failure, consult the retry
//! orchestrator, and release the lock on every exit path. Multi-stage,
//! run-all, and smart-resume all reduce to repeated single-stage runs
//! over the canonical order.

use crate::infrastructure::error_logging::ErrorLogger;
use crate::infrastructure::retry::{RetryOrchestrator, RetryPolicyStore};
use crate::infrastructure::runtime::lock_guard::LockGuard;
use crate::infrastructure::tracker::StageTracker;
use pipeline_domain::entities::ProcessingContext;
use pipeline_domain::repositories::{AdvisoryLockManager, StageStatusRepository};
use pipeline_domain::services::error_classifier::classify_message;
use pipeline_domain::value_objects::{
    AdvisoryLockId, DocumentId, ErrorClassification, RequestId, Stage, StageOutcome, StageOutcomeStatus, StageStatusValue,
};
use pipeline_domain::{PipelineError, StageRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct PipelineScheduler {
    lock_manager: Arc<dyn AdvisoryLockManager>,
    stage_status_repository: Arc<dyn StageStatusRepository>,
    tracker: Arc<StageTracker>,
    error_logger: Arc<ErrorLogger>,
    policy_store: Arc<RetryPolicyStore>,
    orchestrator: Arc<RetryOrchestrator>,
    registry: Arc<dyn StageRegistry>,
    cancellation: CancellationToken,
    default_stage_timeout: Duration,
}

impl PipelineScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lock_manager: Arc<dyn AdvisoryLockManager>,
        stage_status_repository: Arc<dyn StageStatusRepository>,
        tracker: Arc<StageTracker>,
        error_logger: Arc<ErrorLogger>,
        policy_store: Arc<RetryPolicyStore>,
        orchestrator: Arc<RetryOrchestrator>,
        registry: Arc<dyn StageRegistry>,
        cancellation: CancellationToken,
        default_stage_timeout: Duration,
    ) -> Self {
        Self {
            lock_manager,
            stage_status_repository,
            tracker,
            error_logger,
            policy_store,
            orchestrator,
            registry,
            cancellation,
            default_stage_timeout,
        }
    }

    /// Runs a single stage from scratch for `document_id`, under a fresh
    /// request id.
    pub async fn run_stage(self: &Arc<Self>, document_id: DocumentId, request_id: RequestId, stage: Stage) -> Result<StageOutcome, PipelineError> {
        let mut context = ProcessingContext::new(document_id, request_id);
        self.run_stage_with_context(&mut context, stage).await
    }

    /// Runs an explicit ordered list of stages, stopping at the first
    /// non-retried failure (`spec.md` §4.9, "Multi-stage").
    pub async fn run_stages(
        self: &Arc<Self>,
        document_id: DocumentId,
        request_id: RequestId,
        stages: &[Stage],
    ) -> Result<Vec<StageOutcome>, PipelineError> {
        let mut context = ProcessingContext::new(document_id, request_id);
        let mut outcomes = Vec::with_capacity(stages.len());

        for &stage in stages {
            let outcome = self.run_stage_with_context(&mut context, stage).await?;
            let stop = matches!(outcome.status, StageOutcomeStatus::Failed);
            outcomes.push(outcome);
            if stop {
                break;
            }
        }

        Ok(outcomes)
    }

    /// Runs every canonical stage in order.
    pub async fn run_all(self: &Arc<Self>, document_id: DocumentId, request_id: RequestId) -> Result<Vec<StageOutcome>, PipelineError> {
        self.run_stages(document_id, request_id, &Stage::ALL).await
    }

    /// Inspects persisted `stage_status` and runs every stage currently
    /// `pending` or `failed`, in canonical order, skipping stages another
    /// worker has `running` (`spec.md` §4.9, "Smart-resume").
    pub async fn smart_resume(self: &Arc<Self>, document_id: DocumentId) -> Result<Vec<StageOutcome>, PipelineError> {
        let rows = self.stage_status_repository.find_all_for_document(document_id).await?;

        let runnable: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(|stage| {
                match rows.iter().find(|row| row.stage() == *stage).map(|row| row.status()) {
                    None => true,
                    Some(StageStatusValue::Pending) | Some(StageStatusValue::Failed) => true,
                    _ => false,
                }
            })
            .collect();

        self.run_stages(document_id, RequestId::new(), &runnable).await
    }

    async fn run_stage_with_context(self: &Arc<Self>, context: &mut ProcessingContext, stage: Stage) -> Result<StageOutcome, PipelineError> {
        let document_id = context.document_id();
        let correlation_id = context.correlation_id(stage.as_str());
        let started_at = chrono::Utc::now();

        if self.cancellation.is_cancelled() {
            return Err(PipelineError::cancelled(format!(
                "scheduler shutting down; stage {} for document {document_id} not started",
                stage.as_str()
            )));
        }

        let lock_id = AdvisoryLockId::derive(&document_id.to_string(), stage.as_str());
        if !self.lock_manager.try_acquire(lock_id).await? {
            return Ok(StageOutcome::new(
                stage.as_str(),
                StageOutcomeStatus::SkippedDueToLock,
                None,
                correlation_id,
                started_at,
                chrono::Utc::now(),
                None,
            ));
        }
        let mut guard = LockGuard::new(self.lock_manager.clone(), lock_id);

        let outcome = self.drive_stage(context, stage, correlation_id, started_at).await;

        guard.release().await?;
        outcome
    }

    async fn drive_stage(
        self: &Arc<Self>,
        context: &mut ProcessingContext,
        stage: Stage,
        correlation_id: pipeline_domain::value_objects::CorrelationId,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<StageOutcome, PipelineError> {
        let document_id = context.document_id();
        let request_id = *context.request_id();
        let attempt = context.retry_attempt();

        let Some(processor) = self.registry.resolve(stage) else {
            let error_id = self
                .error_logger
                .log_error(
                    correlation_id.clone(),
                    request_id,
                    document_id,
                    stage.as_str(),
                    "UnregisteredStage",
                    pipeline_domain::value_objects::ErrorCategory::Internal,
                    &format!("no processor registered for stage {}", stage.as_str()),
                    "no processor registered; nothing to unwind",
                    context.snapshot(),
                    attempt,
                    0,
                    false,
                )
                .await;

            return Ok(StageOutcome::new(
                stage.as_str(),
                StageOutcomeStatus::Failed,
                Some(error_id),
                correlation_id,
                started_at,
                chrono::Utc::now(),
                None,
            ));
        };

        let policy = self.policy_store.resolve("scheduler", stage.as_str()).await?;
        let timeout = Duration::from_secs(self.default_stage_timeout.as_secs().min((policy.max_delay_seconds * 10.0) as u64));

        let handle = self.tracker.start_stage(document_id, stage, attempt).await?;

        let process_result = tokio::time::timeout(timeout, processor.process(context)).await;

        let (classification, message, stack_trace): (ErrorClassification, String, String) = match process_result {
            Ok(Ok(result)) if result.success => {
                handle.complete().await?;
                self.error_logger.resolve_retrying_for_stage(request_id, stage.as_str()).await?;
                return Ok(StageOutcome::new(
                    stage.as_str(),
                    StageOutcomeStatus::Completed,
                    None,
                    correlation_id,
                    started_at,
                    chrono::Utc::now(),
                    Some(result.data),
                ));
            }
            Ok(Ok(result)) => {
                let message = result.error.unwrap_or_else(|| "stage reported failure without a message".to_string());
                let stack_trace = "stage reported failure via ProcessingResult; no native stack trace available".to_string();
                (classify_message(&message, None), message, stack_trace)
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                let stack_trace = format!("{e:?}");
                (e.classify(), message, stack_trace)
            }
            Err(_elapsed) => {
                let message = format!("stage {} timed out after {:?}", stage.as_str(), timeout);
                let stack_trace = message.clone();
                (classify_message("deadline exceeded", None), message, stack_trace)
            }
        };

        let error_id = self
            .error_logger
            .log_error(
                correlation_id.clone(),
                request_id,
                document_id,
                stage.as_str(),
                &classification.error_type,
                classification.category,
                &message,
                &stack_trace,
                context.snapshot(),
                attempt,
                policy.max_retries,
                classification.is_transient,
            )
            .await;

        let eligible = self.orchestrator.should_retry(classification.category, classification.is_transient, &policy, attempt);

        if eligible {
            handle.fail(&error_id, "retry scheduled in background").await?;

            let delay = self.orchestrator.compute_delay(&policy, attempt, classification.retry_after);
            let scheduler = self.clone();
            let mut retry_context = context.clone();
            let stage_for_closure = stage;

            self.orchestrator
                .spawn_background_retry(error_id.clone(), document_id, stage, delay, move || async move {
                    retry_context.advance_retry(stage_for_closure.as_str());
                    scheduler.run_stage_with_context(&mut retry_context, stage_for_closure).await.map(|_| ())
                })
                .await?;

            return Ok(StageOutcome::new(
                stage.as_str(),
                StageOutcomeStatus::RetryScheduled,
                Some(error_id),
                correlation_id,
                started_at,
                chrono::Utc::now(),
                None,
            ));
        }

        self.error_logger.mark_failed(&error_id).await?;
        handle.fail(&error_id, message).await?;

        Ok(StageOutcome::new(
            stage.as_str(),
            StageOutcomeStatus::Failed,
            Some(error_id),
            correlation_id,
            started_at,
            chrono::Utc::now(),
            None,
        ))
    }
}
