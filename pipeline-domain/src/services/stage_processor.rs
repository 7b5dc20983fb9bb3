// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Processor Contract
//!
//! Every stage implementation satisfies this trait (`spec.md` §4.8). A
//! processor must not modify shared state outside the [`ProcessingContext`]
//! it is given; on failure it returns a non-success [`ProcessingResult`] or
//! raises a [`PipelineError`] — the scheduler treats both identically via
//! the classifier.

use crate::entities::ProcessingContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Declares a stage's resource needs, consulted by callers that want to
/// schedule work with awareness of CPU/GPU/memory pressure. The core
/// scheduler (§4.9) does not itself enforce these — see Non-goals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceProfile {
    pub cpu_intensive: bool,
    pub memory_intensive: bool,
    pub gpu_required: bool,
    pub est_ram_gb: f64,
    pub est_gpu_gb: f64,
    pub parallel_safe: bool,
}

/// The result of one `process` call.
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    pub success: bool,
    pub data: HashMap<String, Value>,
    pub metadata: HashMap<String, Value>,
    pub error: Option<String>,
    pub error_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl ProcessingResult {
    pub fn success(data: HashMap<String, Value>, metadata: HashMap<String, Value>) -> Self {
        Self {
            success: true,
            data,
            metadata,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// A single canonical stage's processing logic.
///
/// Concrete stage logic (text extraction, embedding, etc.) is out of scope
/// for this crate — implementations here are thin contract-conformant
/// stand-ins registered by name in the infrastructure layer's stage
/// registry (`spec.md` §4.8, §10 Non-goals).
#[async_trait]
pub trait StageProcessor: Send + Sync {
    /// The stage name this processor handles, e.g. `"text_extraction"`.
    fn stage_name(&self) -> &str;

    /// Context keys this stage expects earlier stages to have populated.
    fn required_inputs(&self) -> Vec<String>;

    /// Context keys this stage populates for downstream stages.
    fn outputs(&self) -> Vec<String>;

    fn resource_profile(&self) -> ResourceProfile;

    async fn process(&self, context: &mut ProcessingContext) -> Result<ProcessingResult, PipelineError>;
}

/// Maps a canonical [`crate::value_objects::Stage`] to the processor that
/// handles it. The scheduler depends on this abstraction rather than a
/// concrete registry type so it stays ignorant of how processors are
/// constructed and wired (`spec.md` §4.8, §4.9).
pub trait StageRegistry: Send + Sync {
    fn resolve(&self, stage: crate::value_objects::Stage) -> Option<std::sync::Arc<dyn StageProcessor>>;
}
