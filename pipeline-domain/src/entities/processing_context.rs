// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Context Entity
//!
//! The in-memory bag carried stage-to-stage (`spec.md` §3). A single
//! pipeline run owns its context exclusively; it accumulates each stage's
//! outputs for downstream stages and is serialized into the error record
//! when a stage fails.

use crate::value_objects::{CorrelationId, DocumentId, RequestId};
use serde_json::Value;
use std::collections::HashMap;

/// Mutable, per-run execution state passed to every [`crate::services::StageProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    document_id: DocumentId,
    request_id: RequestId,
    file_path: Option<String>,
    document_type: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    series: Option<String>,
    version: Option<String>,
    language: Option<String>,
    file_hash: Option<String>,
    file_size: Option<u64>,
    retry_attempt: u32,
    metadata: HashMap<String, Value>,
    processing_config: HashMap<String, Value>,
}

impl ProcessingContext {
    pub fn new(document_id: DocumentId, request_id: RequestId) -> Self {
        Self {
            document_id,
            request_id,
            file_path: None,
            document_type: None,
            manufacturer: None,
            model: None,
            series: None,
            version: None,
            language: None,
            file_hash: None,
            file_size: None,
            retry_attempt: 0,
            metadata: HashMap::new(),
            processing_config: HashMap::new(),
        }
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn retry_attempt(&self) -> u32 {
        self.retry_attempt
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn file_hash(&self) -> Option<&str> {
        self.file_hash.as_deref()
    }

    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn processing_config(&self) -> &HashMap<String, Value> {
        &self.processing_config
    }

    pub fn set_file_path(&mut self, file_path: impl Into<String>) {
        self.file_path = Some(file_path.into());
    }

    pub fn set_file_hash(&mut self, file_hash: impl Into<String>) {
        self.file_hash = Some(file_hash.into());
    }

    pub fn set_file_size(&mut self, file_size: u64) {
        self.file_size = Some(file_size);
    }

    pub fn set_document_type(&mut self, document_type: impl Into<String>) {
        self.document_type = Some(document_type.into());
    }

    pub fn set_processing_config(&mut self, config: HashMap<String, Value>) {
        self.processing_config = config;
    }

    /// Merges a stage's output into the shared metadata bag, for
    /// downstream stages to read.
    pub fn merge_metadata(&mut self, updates: HashMap<String, Value>) {
        self.metadata.extend(updates);
    }

    /// Bumps the retry attempt counter and derives the correlation id for
    /// the next attempt of `stage_name`, per the retry orchestrator's
    /// `spawn_background_retry` contract (§4.7).
    pub fn advance_retry(&mut self, stage_name: &str) -> CorrelationId {
        self.retry_attempt += 1;
        CorrelationId::generate(&self.request_id.to_string(), stage_name, self.retry_attempt)
    }

    pub fn correlation_id(&self, stage_name: &str) -> CorrelationId {
        CorrelationId::generate(&self.request_id.to_string(), stage_name, self.retry_attempt)
    }

    /// A flat snapshot of the descriptive fields, for embedding into a
    /// [`super::PipelineErrorRecord`] when this run's current stage fails.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let mut snapshot = HashMap::new();
        snapshot.insert("document_id".to_string(), Value::String(self.document_id.to_string()));
        snapshot.insert("request_id".to_string(), Value::String(self.request_id.to_string()));
        if let Some(path) = &self.file_path {
            snapshot.insert("file_path".to_string(), Value::String(path.clone()));
        }
        if let Some(document_type) = &self.document_type {
            snapshot.insert("document_type".to_string(), Value::String(document_type.clone()));
        }
        if let Some(manufacturer) = &self.manufacturer {
            snapshot.insert("manufacturer".to_string(), Value::String(manufacturer.clone()));
        }
        if let Some(model) = &self.model {
            snapshot.insert("model".to_string(), Value::String(model.clone()));
        }
        if let Some(series) = &self.series {
            snapshot.insert("series".to_string(), Value::String(series.clone()));
        }
        if let Some(version) = &self.version {
            snapshot.insert("version".to_string(), Value::String(version.clone()));
        }
        if let Some(language) = &self.language {
            snapshot.insert("language".to_string(), Value::String(language.clone()));
        }
        if let Some(hash) = &self.file_hash {
            snapshot.insert("file_hash".to_string(), Value::String(hash.clone()));
        }
        if let Some(size) = self.file_size {
            snapshot.insert("file_size".to_string(), Value::Number(size.into()));
        }
        snapshot.insert("retry_attempt".to_string(), Value::Number(self.retry_attempt.into()));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_retry_increments_attempt_and_reflects_in_correlation_id() {
        let mut ctx = ProcessingContext::new(DocumentId::new(), RequestId::new());
        assert_eq!(ctx.retry_attempt(), 0);
        let id = ctx.advance_retry("upload");
        assert_eq!(ctx.retry_attempt(), 1);
        assert!(id.as_str().ends_with(".retry_1"));
    }

    #[test]
    fn merge_metadata_accumulates_across_stages() {
        let mut ctx = ProcessingContext::new(DocumentId::new(), RequestId::new());
        let mut first = HashMap::new();
        first.insert("page_count".to_string(), Value::Number(3.into()));
        ctx.merge_metadata(first);
        let mut second = HashMap::new();
        second.insert("table_count".to_string(), Value::Number(1.into()));
        ctx.merge_metadata(second);
        assert_eq!(ctx.metadata().len(), 2);
    }

    #[test]
    fn snapshot_always_includes_identity_fields() {
        let ctx = ProcessingContext::new(DocumentId::new(), RequestId::new());
        let snapshot = ctx.snapshot();
        assert!(snapshot.contains_key("document_id"));
        assert!(snapshot.contains_key("request_id"));
        assert!(snapshot.contains_key("retry_attempt"));
    }
}
