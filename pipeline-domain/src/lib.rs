// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Domain
//!
//! Core business logic and rules of the document pipeline engine,
//! independent of databases, the file system, or the CLI. Implements
//! Domain-Driven Design patterns:
//!
//! - **Entities** (`entities`): `Document`, `StageStatus`, `ProcessingContext`,
//!   `RetryPolicy`, `PipelineErrorRecord` — mutable, identity-bearing.
//! - **Value objects** (`value_objects`): `ErrorCategory`, `ErrorClassification`,
//!   `CorrelationId`, `AdvisoryLockId`, `Stage`, the ID newtypes, `StageOutcome`
//!   — immutable, compared by value.
//! - **Domain services** (`services`): the error classifier and the
//!   `StageProcessor` contract.
//! - **Repositories** (`repositories`): persistence abstractions implemented
//!   by the infrastructure layer.
//! - **Error** (`error`): the single [`PipelineError`] type crossing every
//!   layer.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{Document, DocumentType, PipelineErrorRecord, ProcessingContext, RetryPolicy, StageStatus};
pub use error::PipelineError;
pub use services::{ProcessingResult, ResourceProfile, StageProcessor, StageRegistry};
pub use value_objects::{
    AdvisoryLockId, CorrelationId, DocumentId, DocumentProcessingStatus, ErrorCategory, ErrorClassification, ErrorId,
    RequestId, Stage, StageOutcome, StageOutcomeStatus, StageStatusValue,
};
