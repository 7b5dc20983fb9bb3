// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Service
//!
//! The six control-surface operations (`spec.md` §6), each a thin
//! pass-through to the scheduler or the status repository. This is the
//! seam `bootstrap::cli::Commands` dispatches against — neither this
//! crate's `main` nor the CLI parser know anything about advisory locks,
//! retries, or Postgres.

use crate::infrastructure::runtime::PipelineScheduler;
use pipeline_domain::entities::StageStatus;
use pipeline_domain::repositories::StageStatusRepository;
use pipeline_domain::value_objects::{DocumentId, RequestId, Stage, StageOutcome};
use pipeline_domain::PipelineError;
use std::sync::Arc;

pub struct ApplicationService {
    scheduler: Arc<PipelineScheduler>,
    stage_status_repository: Arc<dyn StageStatusRepository>,
}

impl ApplicationService {
    pub fn new(scheduler: Arc<PipelineScheduler>, stage_status_repository: Arc<dyn StageStatusRepository>) -> Self {
        Self {
            scheduler,
            stage_status_repository,
        }
    }

    pub async fn run_stage(&self, document_id: DocumentId, stage: Stage) -> Result<StageOutcome, PipelineError> {
        self.scheduler.run_stage(document_id, RequestId::new(), stage).await
    }

    pub async fn run_stages(&self, document_id: DocumentId, stages: &[Stage]) -> Result<Vec<StageOutcome>, PipelineError> {
        self.scheduler.run_stages(document_id, RequestId::new(), stages).await
    }

    pub async fn run_all(&self, document_id: DocumentId) -> Result<Vec<StageOutcome>, PipelineError> {
        self.scheduler.run_all(document_id, RequestId::new()).await
    }

    pub async fn smart_resume(&self, document_id: DocumentId) -> Result<Vec<StageOutcome>, PipelineError> {
        self.scheduler.smart_resume(document_id).await
    }

    /// Every persisted `stage_status` row for `document_id`, in canonical
    /// stage order (stages never started have no row and are omitted —
    /// the caller distinguishes "not started" from "pending" the same way
    /// `smart_resume` does).
    pub async fn stage_status(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, PipelineError> {
        let mut rows = self.stage_status_repository.find_all_for_document(document_id).await?;
        rows.sort_by_key(|row| row.stage().ordinal());
        Ok(rows)
    }

    /// The fifteen canonical stages in run order — a pure, database-free
    /// lookup.
    pub fn list_stages(&self) -> Vec<Stage> {
        Stage::ALL.to_vec()
    }
}
