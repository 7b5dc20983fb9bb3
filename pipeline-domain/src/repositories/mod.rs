// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repository Traits
//!
//! Abstractions over persistence the domain depends on but does not
//! implement. Postgres-backed implementations live in
//! `pipeline::infrastructure::db` (`spec.md` §6, §4.2–§4.5).

use crate::entities::{Document, PipelineErrorRecord, RetryPolicy, StageStatus};
use crate::error::PipelineError;
use crate::value_objects::{AdvisoryLockId, DocumentId, ErrorId, Stage};
use async_trait::async_trait;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn save(&self, document: &Document) -> Result<(), PipelineError>;
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, PipelineError>;
    /// Looks up a document by its content hash, so the upload stage can
    /// enforce `spec.md` §3's uniqueness invariant before inserting a
    /// duplicate (unless the caller has opted into force-reprocessing).
    async fn find_by_content_hash(&self, content_hash: &str) -> Result<Option<Document>, PipelineError>;
}

#[async_trait]
pub trait StageStatusRepository: Send + Sync {
    async fn upsert(&self, status: &StageStatus) -> Result<(), PipelineError>;
    async fn find(&self, document_id: DocumentId, stage: Stage) -> Result<Option<StageStatus>, PipelineError>;
    async fn find_all_for_document(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, PipelineError>;
}

#[async_trait]
pub trait RetryPolicyRepository: Send + Sync {
    async fn find(&self, component: &str, stage_name: &str) -> Result<Option<RetryPolicy>, PipelineError>;
}

#[async_trait]
pub trait PipelineErrorRepository: Send + Sync {
    async fn save(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError>;
    async fn find_by_id(&self, error_id: &ErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError>;
    async fn find_by_correlation_prefix(&self, request_id: &str) -> Result<Vec<PipelineErrorRecord>, PipelineError>;
    async fn find_unresolved(&self, limit: u32) -> Result<Vec<PipelineErrorRecord>, PipelineError>;
}

/// The database's non-blocking, session-scoped advisory lock primitive
/// (`spec.md` §4.2). A lock held by a manager instance is scoped to the
/// database session/connection that acquired it — releasing is always
/// attempted on every exit path, including panics, via RAII in the
/// infrastructure implementation's guard type.
#[async_trait]
pub trait AdvisoryLockManager: Send + Sync {
    /// Attempts to acquire the lock without blocking. Returns `true` iff
    /// acquired.
    async fn try_acquire(&self, lock_id: AdvisoryLockId) -> Result<bool, PipelineError>;

    /// Releases a previously acquired lock. A no-op (not an error) if the
    /// lock was not held.
    async fn release(&self, lock_id: AdvisoryLockId) -> Result<(), PipelineError>;
}
