// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Tracker
//!
//! `start_stage` produces a scoped [`StageHandle`] supporting
//! `update_progress` and, once, one of `complete`/`fail`/`skip` (`spec.md`
//! §4.6). Start inserts or updates the `stage_status` row to `running`,
//! records `started_at`, and increments `attempt`. Progress writes go to
//! the same row without changing status, and are rate-limited to at most
//! one write per `progress_write_interval_ms` per `(document, stage)` —
//! except the terminal write, which always goes through.

use pipeline_domain::entities::StageStatus;
use pipeline_domain::repositories::StageStatusRepository;
use pipeline_domain::value_objects::{DocumentId, ErrorId, Stage};
use pipeline_domain::PipelineError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct StageTracker {
    repository: Arc<dyn StageStatusRepository>,
    progress_write_interval: Duration,
}

impl StageTracker {
    pub fn new(repository: Arc<dyn StageStatusRepository>, progress_write_interval: Duration) -> Self {
        Self {
            repository,
            progress_write_interval,
        }
    }

    /// Starts (or restarts, on a retry) a stage attempt and returns a
    /// handle for reporting progress and the terminal outcome.
    pub async fn start_stage(&self, document_id: DocumentId, stage: Stage, attempt: u32) -> Result<StageHandle, PipelineError> {
        let mut status = self
            .repository
            .find(document_id, stage)
            .await?
            .unwrap_or_else(|| StageStatus::pending(document_id, stage));

        status.start(attempt);
        self.repository.upsert(&status).await?;

        Ok(StageHandle {
            repository: self.repository.clone(),
            document_id,
            stage,
            progress_write_interval: self.progress_write_interval,
            last_write: Mutex::new(None),
            finished: Mutex::new(false),
        })
    }
}

/// A scoped handle for one stage attempt. Not `Drop`-enforced — a stage
/// processor that panics mid-attempt leaves the row at `running`, matching
/// the documented abandonment behavior (`spec.md` §4.9, cancellation and
/// timeouts) rather than silently marking it failed on unwind.
pub struct StageHandle {
    repository: Arc<dyn StageStatusRepository>,
    document_id: DocumentId,
    stage: Stage,
    progress_write_interval: Duration,
    last_write: Mutex<Option<Instant>>,
    finished: Mutex<bool>,
}

impl StageHandle {
    /// Writes progress, rate-limited to once per `progress_write_interval`.
    pub async fn update_progress(&self, progress_percent: u8) -> Result<(), PipelineError> {
        {
            let mut last_write = self.last_write.lock().await;
            if let Some(last) = *last_write {
                if last.elapsed() < self.progress_write_interval {
                    return Ok(());
                }
            }
            *last_write = Some(Instant::now());
        }

        if let Some(mut status) = self.repository.find(self.document_id, self.stage).await? {
            status.update_progress(progress_percent);
            self.repository.upsert(&status).await?;
        }
        Ok(())
    }

    pub async fn complete(&self) -> Result<(), PipelineError> {
        self.finish(|status| status.complete()).await
    }

    pub async fn fail(&self, error_id: &ErrorId, message: impl Into<String>) -> Result<(), PipelineError> {
        let message = message.into();
        let error_id = error_id.clone();
        self.finish(|status| status.fail(message, error_id)).await
    }

    pub async fn skip(&self, reason: impl Into<String>) -> Result<(), PipelineError> {
        let reason = reason.into();
        self.finish(|status| status.skip(reason)).await
    }

    async fn finish(&self, apply: impl FnOnce(&mut StageStatus)) -> Result<(), PipelineError> {
        let mut finished = self.finished.lock().await;
        if *finished {
            return Ok(());
        }

        let mut status = self
            .repository
            .find(self.document_id, self.stage)
            .await?
            .unwrap_or_else(|| StageStatus::pending(self.document_id, self.stage));

        apply(&mut status);
        self.repository.upsert(&status).await?;
        *finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct InMemoryRepo {
        rows: TokioMutex<Vec<StageStatus>>,
    }

    #[async_trait]
    impl StageStatusRepository for InMemoryRepo {
        async fn upsert(&self, status: &StageStatus) -> Result<(), PipelineError> {
            let mut rows = self.rows.lock().await;
            rows.retain(|s| !(s.document_id() == status.document_id() && s.stage() == status.stage()));
            rows.push(status.clone());
            Ok(())
        }

        async fn find(&self, document_id: DocumentId, stage: Stage) -> Result<Option<StageStatus>, PipelineError> {
            let rows = self.rows.lock().await;
            Ok(rows.iter().find(|s| s.document_id() == document_id && s.stage() == stage).cloned())
        }

        async fn find_all_for_document(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, PipelineError> {
            let rows = self.rows.lock().await;
            Ok(rows.iter().filter(|s| s.document_id() == document_id).cloned().collect())
        }
    }

    #[tokio::test]
    async fn start_stage_marks_row_running_with_one_indexed_attempt() {
        let repo = Arc::new(InMemoryRepo::default());
        let tracker = StageTracker::new(repo.clone(), Duration::from_millis(0));
        let document_id = DocumentId::new();

        // `retry_attempt` 0 (the zero-indexed first attempt) persists as
        // `attempt=1` (`spec.md` §8 scenario 1).
        tracker.start_stage(document_id, Stage::Upload, 0).await.unwrap();

        let status = repo.find(document_id, Stage::Upload).await.unwrap().unwrap();
        assert_eq!(status.attempt(), 1);
        assert!(status.started_at().is_some());
    }

    #[tokio::test]
    async fn complete_is_idempotent_and_sets_terminal_state() {
        let repo = Arc::new(InMemoryRepo::default());
        let tracker = StageTracker::new(repo.clone(), Duration::from_millis(0));
        let document_id = DocumentId::new();

        let handle = tracker.start_stage(document_id, Stage::Upload, 0).await.unwrap();
        handle.complete().await.unwrap();
        handle.complete().await.unwrap();

        let status = repo.find(document_id, Stage::Upload).await.unwrap().unwrap();
        assert_eq!(status.progress_percent(), 100);
    }

    #[tokio::test]
    async fn progress_writes_are_rate_limited() {
        let repo = Arc::new(InMemoryRepo::default());
        let tracker = StageTracker::new(repo.clone(), Duration::from_secs(60));
        let document_id = DocumentId::new();

        let handle = tracker.start_stage(document_id, Stage::Upload, 0).await.unwrap();
        handle.update_progress(10).await.unwrap();
        handle.update_progress(90).await.unwrap();

        let status = repo.find(document_id, Stage::Upload).await.unwrap().unwrap();
        assert_eq!(status.progress_percent(), 10);
    }
}
