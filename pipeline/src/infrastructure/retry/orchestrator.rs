// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Orchestrator
//!
//! Retry-eligibility and backoff scheduling (`spec.md` §4.7). Eligibility
//! is purely a function of the classified error and the active policy:
//! `is_transient && category ∈ policy.retry_on && attempt < max_retries`.
//! Backoff is full-jitter: `base = min(base_delay · multiplier^attempt,
//! max_delay)`, raised to an explicit `retry_after` hint when the error
//! carried one, then `final = base · (1 - j + 2·j·U)` for `U ~ Uniform(0,1)`.

use crate::infrastructure::runtime::supervisor::{spawn_supervised, AppResult};
use pipeline_domain::entities::RetryPolicy;
use pipeline_domain::repositories::{PipelineErrorRepository, StageStatusRepository};
use pipeline_domain::value_objects::{DocumentId, ErrorCategory, ErrorId, Stage};
use pipeline_domain::PipelineError;
use rand::Rng as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct RetryOrchestrator {
    error_repository: Arc<dyn PipelineErrorRepository>,
    stage_status_repository: Arc<dyn StageStatusRepository>,
}

impl RetryOrchestrator {
    pub fn new(
        error_repository: Arc<dyn PipelineErrorRepository>,
        stage_status_repository: Arc<dyn StageStatusRepository>,
    ) -> Self {
        Self {
            error_repository,
            stage_status_repository,
        }
    }

    /// Whether a failed attempt at `category`, with the given
    /// transience and policy, is eligible for another attempt.
    pub fn should_retry(&self, category: ErrorCategory, is_transient: bool, policy: &RetryPolicy, attempt: u32) -> bool {
        is_transient && policy.retry_on.contains(&category) && attempt < policy.max_retries
    }

    /// Computes the full-jitter delay before the next attempt.
    pub fn compute_delay(&self, policy: &RetryPolicy, attempt: u32, retry_after: Option<u64>) -> Duration {
        let exponential = policy.base_delay_seconds * policy.backoff_multiplier.powi(attempt as i32);
        let mut base = exponential.min(policy.max_delay_seconds);

        if let Some(hint) = retry_after {
            base = base.max(hint as f64);
        }

        let jitter = policy.jitter_fraction.clamp(0.0, 1.0);
        let u: f64 = rand::rng().random_range(0.0..1.0);
        let factor = (1.0 - jitter) + 2.0 * jitter * u;
        let final_seconds = (base * factor).max(0.0);

        Duration::from_secs_f64(final_seconds)
    }

    /// Schedules a background retry: marks the error record `retrying`
    /// with `next_retry_at`, resets the stage_status row to `pending`,
    /// then after `delay` invokes `rerun` — the scheduler's re-entry
    /// point for this one `(document, stage)` — on a supervised task.
    ///
    /// `rerun` is responsible for bumping `context.retry_attempt`,
    /// deriving the next correlation id, and re-acquiring the advisory
    /// lock; this method only owns the timing and the two status writes
    /// that must happen before the delay starts.
    pub async fn spawn_background_retry<F, Fut>(
        &self,
        error_id: ErrorId,
        document_id: DocumentId,
        stage: Stage,
        delay: Duration,
        rerun: F,
    ) -> Result<JoinHandle<AppResult<()>>, PipelineError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let next_retry_at = chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();

        if let Some(mut record) = self.error_repository.find_by_id(&error_id).await? {
            record.schedule_retry(next_retry_at);
            self.error_repository.save(&record).await?;
        }

        if let Some(mut status) = self.stage_status_repository.find(document_id, stage).await? {
            status.reset_for_retry();
            self.stage_status_repository.upsert(&status).await?;
        }

        let handle = spawn_supervised("background-retry", async move {
            tokio::time::sleep(delay).await;
            rerun().await
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_domain::value_objects::ErrorCategory;

    fn policy() -> RetryPolicy {
        RetryPolicy::code_default("scheduler", "upload")
    }

    #[test]
    fn retries_only_when_transient_and_category_allowed_and_attempts_remain() {
        let orchestrator_policy = policy();
        let orchestrator = RetryOrchestrator::new(Arc::new(NoopErrorRepo), Arc::new(NoopStatusRepo));

        assert!(orchestrator.should_retry(ErrorCategory::Network, true, &orchestrator_policy, 0));
        assert!(!orchestrator.should_retry(ErrorCategory::Network, true, &orchestrator_policy, 3));
        assert!(!orchestrator.should_retry(ErrorCategory::Validation, false, &orchestrator_policy, 0));
    }

    #[test]
    fn compute_delay_without_jitter_is_exact_exponential_backoff() {
        let mut p = policy();
        p.jitter_fraction = 0.0;
        p.base_delay_seconds = 1.0;
        p.backoff_multiplier = 2.0;
        p.max_delay_seconds = 60.0;
        let orchestrator = RetryOrchestrator::new(Arc::new(NoopErrorRepo), Arc::new(NoopStatusRepo));

        assert_eq!(orchestrator.compute_delay(&p, 0, None).as_secs_f64(), 1.0);
        assert_eq!(orchestrator.compute_delay(&p, 1, None).as_secs_f64(), 2.0);
        assert_eq!(orchestrator.compute_delay(&p, 2, None).as_secs_f64(), 4.0);
    }

    #[test]
    fn compute_delay_is_capped_at_max_delay_seconds() {
        let mut p = policy();
        p.jitter_fraction = 0.0;
        p.base_delay_seconds = 1.0;
        p.backoff_multiplier = 10.0;
        p.max_delay_seconds = 5.0;
        let orchestrator = RetryOrchestrator::new(Arc::new(NoopErrorRepo), Arc::new(NoopStatusRepo));

        assert_eq!(orchestrator.compute_delay(&p, 5, None).as_secs_f64(), 5.0);
    }

    #[test]
    fn compute_delay_respects_retry_after_hint() {
        let mut p = policy();
        p.jitter_fraction = 0.0;
        p.base_delay_seconds = 1.0;
        p.backoff_multiplier = 2.0;
        p.max_delay_seconds = 60.0;
        let orchestrator = RetryOrchestrator::new(Arc::new(NoopErrorRepo), Arc::new(NoopStatusRepo));

        assert_eq!(orchestrator.compute_delay(&p, 0, Some(30)).as_secs_f64(), 30.0);
    }

    #[test]
    fn compute_delay_with_jitter_stays_within_bounds() {
        let mut p = policy();
        p.jitter_fraction = 0.2;
        p.base_delay_seconds = 10.0;
        p.backoff_multiplier = 1.0;
        p.max_delay_seconds = 10.0;
        let orchestrator = RetryOrchestrator::new(Arc::new(NoopErrorRepo), Arc::new(NoopStatusRepo));

        for _ in 0..50 {
            let delay = orchestrator.compute_delay(&p, 0, None).as_secs_f64();
            assert!((8.0..=12.0).contains(&delay), "delay {delay} out of expected jitter range");
        }
    }

    struct NoopErrorRepo;
    #[async_trait::async_trait]
    impl PipelineErrorRepository for NoopErrorRepo {
        async fn save(&self, _record: &pipeline_domain::entities::PipelineErrorRecord) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn find_by_id(&self, _error_id: &ErrorId) -> Result<Option<pipeline_domain::entities::PipelineErrorRecord>, PipelineError> {
            Ok(None)
        }
        async fn find_by_correlation_prefix(
            &self,
            _request_id: &str,
        ) -> Result<Vec<pipeline_domain::entities::PipelineErrorRecord>, PipelineError> {
            Ok(vec![])
        }
        async fn find_unresolved(&self, _limit: u32) -> Result<Vec<pipeline_domain::entities::PipelineErrorRecord>, PipelineError> {
            Ok(vec![])
        }
    }

    struct NoopStatusRepo;
    #[async_trait::async_trait]
    impl StageStatusRepository for NoopStatusRepo {
        async fn upsert(&self, _status: &pipeline_domain::entities::StageStatus) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn find(
            &self,
            _document_id: DocumentId,
            _stage: Stage,
        ) -> Result<Option<pipeline_domain::entities::StageStatus>, PipelineError> {
            Ok(None)
        }
        async fn find_all_for_document(&self, _document_id: DocumentId) -> Result<Vec<pipeline_domain::entities::StageStatus>, PipelineError> {
            Ok(vec![])
        }
    }
}
