// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry
//!
//! Wires each canonical [`Stage`] to the [`StageProcessor`] that handles
//! it. Concrete text-extraction/OCR/embedding logic is out of scope here
//! — [`NoopStageProcessor`] is a contract-conformant stand-in that marks
//! its stage complete without touching the document, so the scheduler,
//! retry orchestrator, and control surface can be exercised end to end
//! against a real `Stage → StageProcessor` wiring.

use async_trait::async_trait;
use pipeline_domain::entities::ProcessingContext;
use pipeline_domain::services::{ProcessingResult, ResourceProfile, StageProcessor, StageRegistry};
use pipeline_domain::value_objects::Stage;
use pipeline_domain::PipelineError;
use std::collections::HashMap;
use std::sync::Arc;

/// Completes immediately, recording only that it ran. Downstream stages
/// that declare `required_inputs` this processor doesn't populate will
/// simply not find them in the context — acceptable for a stand-in whose
/// job is to prove the scheduling machinery, not simulate real outputs.
pub struct NoopStageProcessor {
    stage: Stage,
}

impl NoopStageProcessor {
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }
}

#[async_trait]
impl StageProcessor for NoopStageProcessor {
    fn stage_name(&self) -> &str {
        self.stage.as_str()
    }

    fn required_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn resource_profile(&self) -> ResourceProfile {
        ResourceProfile::default()
    }

    async fn process(&self, context: &mut ProcessingContext) -> Result<ProcessingResult, PipelineError> {
        let mut metadata = HashMap::new();
        metadata.insert("stage".to_string(), serde_json::Value::String(self.stage.as_str().to_string()));
        context.merge_metadata(metadata.clone());
        Ok(ProcessingResult::success(HashMap::new(), metadata))
    }
}

/// A [`StageRegistry`] mapping every canonical stage to a registered
/// processor, with [`NoopStageProcessor`] filling any stage a caller
/// hasn't overridden with a real implementation.
pub struct DefaultStageRegistry {
    processors: HashMap<Stage, Arc<dyn StageProcessor>>,
}

impl DefaultStageRegistry {
    /// Builds a registry where every one of the fifteen canonical stages
    /// resolves to [`NoopStageProcessor`].
    pub fn with_noop_processors() -> Self {
        let processors = Stage::ALL
            .into_iter()
            .map(|stage| (stage, Arc::new(NoopStageProcessor::new(stage)) as Arc<dyn StageProcessor>))
            .collect();
        Self { processors }
    }

    /// Overrides a single stage's processor, e.g. once a real
    /// implementation becomes available.
    pub fn register(&mut self, stage: Stage, processor: Arc<dyn StageProcessor>) {
        self.processors.insert(stage, processor);
    }
}

impl StageRegistry for DefaultStageRegistry {
    fn resolve(&self, stage: Stage) -> Option<Arc<dyn StageProcessor>> {
        self.processors.get(&stage).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_stage_resolves() {
        let registry = DefaultStageRegistry::with_noop_processors();
        for stage in Stage::ALL {
            assert!(registry.resolve(stage).is_some());
        }
    }

    #[tokio::test]
    async fn noop_processor_reports_success() {
        let processor = NoopStageProcessor::new(Stage::Upload);
        let mut context = ProcessingContext::new(pipeline_domain::value_objects::DocumentId::new(), pipeline_domain::value_objects::RequestId::new());
        let result = processor.process(&mut context).await.unwrap();
        assert!(result.success);
    }
}
