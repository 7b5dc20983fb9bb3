// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Entity
//!
//! The unit of work the pipeline processes end to end — a single uploaded
//! document moving through the fifteen canonical stages (`spec.md` §2, §3).

use crate::services::datetime_serde;
use crate::value_objects::{DocumentId, DocumentProcessingStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The declared document type (`spec.md` §3). Filled by the upload stage
/// from caller-supplied metadata; later stages (classification) may
/// correct it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ServiceManual,
    PartsCatalog,
    TechnicalBulletin,
    UserManual,
    InstallationGuide,
    TroubleshootingGuide,
    CpmdDatabase,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::ServiceManual => "service_manual",
            DocumentType::PartsCatalog => "parts_catalog",
            DocumentType::TechnicalBulletin => "technical_bulletin",
            DocumentType::UserManual => "user_manual",
            DocumentType::InstallationGuide => "installation_guide",
            DocumentType::TroubleshootingGuide => "troubleshooting_guide",
            DocumentType::CpmdDatabase => "cpmd_database",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "service_manual" => DocumentType::ServiceManual,
            "parts_catalog" => DocumentType::PartsCatalog,
            "technical_bulletin" => DocumentType::TechnicalBulletin,
            "user_manual" => DocumentType::UserManual,
            "installation_guide" => DocumentType::InstallationGuide,
            "troubleshooting_guide" => DocumentType::TroubleshootingGuide,
            "cpmd_database" => DocumentType::CpmdDatabase,
            _ => return None,
        })
    }
}

/// A document under pipeline processing.
///
/// Identity is `id`; `content_hash` is the uniqueness key a caller uses to
/// detect re-uploads of the same bytes (`spec.md` §3's invariant: unique
/// across non-force-reprocessed documents — the force-reprocess exception
/// is enforced by the caller, which is free to bypass the uniqueness
/// lookup, not by this entity). Every field but `id`, `content_hash`, and
/// `size_bytes` may be null/empty at upload time and filled in as later
/// stages run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    file_name: String,
    content_hash: String,
    size_bytes: u64,
    document_type: DocumentType,
    manufacturer: Option<String>,
    series: Option<String>,
    models: Vec<String>,
    version: Option<String>,
    language: Option<String>,
    processing_status: DocumentProcessingStatus,
    #[serde(with = "datetime_serde")]
    created_at: DateTime<Utc>,
    #[serde(with = "datetime_serde")]
    updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new document from uploaded bytes, computing its content
    /// hash (`spec.md` §3: "content hash (SHA-256 of bytes)"). Descriptive
    /// metadata beyond filename/type/size is left unset for later stages.
    pub fn new(file_name: impl Into<String>, document_type: DocumentType, bytes: &[u8]) -> Self {
        let now = Utc::now();
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let content_hash = hex::encode(hasher.finalize());

        Self {
            id: DocumentId::new(),
            file_name: file_name.into(),
            content_hash,
            size_bytes: bytes.len() as u64,
            document_type,
            manufacturer: None,
            series: None,
            models: Vec::new(),
            version: None,
            language: None,
            processing_status: DocumentProcessingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a document from persisted fields, for repository
    /// implementations loading rows back out of storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: DocumentId,
        file_name: String,
        content_hash: String,
        size_bytes: u64,
        document_type: DocumentType,
        manufacturer: Option<String>,
        series: Option<String>,
        models: Vec<String>,
        version: Option<String>,
        language: Option<String>,
        processing_status: DocumentProcessingStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            file_name,
            content_hash,
            size_bytes,
            document_type,
            manufacturer,
            series,
            models,
            version,
            language,
            processing_status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn processing_status(&self) -> DocumentProcessingStatus {
        self.processing_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_processing_status(&mut self, status: DocumentProcessingStatus) {
        self.processing_status = status;
        self.touch();
    }

    pub fn set_manufacturer(&mut self, manufacturer: impl Into<String>) {
        self.manufacturer = Some(manufacturer.into());
        self.touch();
    }

    pub fn set_series(&mut self, series: impl Into<String>) {
        self.series = Some(series.into());
        self.touch();
    }

    pub fn set_models(&mut self, models: Vec<String>) {
        self.models = models;
        self.touch();
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
        self.touch();
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = Some(language.into());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stamps_created_and_updated_at_equal() {
        let doc = Document::new("manual.pdf", DocumentType::ServiceManual, b"Hello world");
        assert_eq!(doc.created_at(), doc.updated_at());
    }

    #[test]
    fn new_computes_sha256_content_hash() {
        let doc = Document::new("manual.pdf", DocumentType::ServiceManual, b"Hello world");
        let mut hasher = Sha256::new();
        hasher.update(b"Hello world");
        assert_eq!(doc.content_hash(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn new_defaults_to_pending_and_empty_optional_metadata() {
        let doc = Document::new("manual.pdf", DocumentType::ServiceManual, b"data");
        assert_eq!(doc.processing_status(), DocumentProcessingStatus::Pending);
        assert!(doc.manufacturer().is_none());
        assert!(doc.series().is_none());
        assert!(doc.models().is_empty());
        assert!(doc.version().is_none());
        assert!(doc.language().is_none());
    }

    #[test]
    fn touch_advances_updated_at_only() {
        let mut doc = Document::new("manual.pdf", DocumentType::ServiceManual, b"data");
        let created = doc.created_at();
        std::thread::sleep(std::time::Duration::from_millis(2));
        doc.touch();
        assert_eq!(doc.created_at(), created);
        assert!(doc.updated_at() >= created);
    }

    #[test]
    fn setters_fill_in_metadata_as_stages_run() {
        let mut doc = Document::new("manual.pdf", DocumentType::ServiceManual, b"data");
        doc.set_manufacturer("Acme");
        doc.set_series("X200");
        doc.set_models(vec!["X200-A".to_string(), "X200-B".to_string()]);
        doc.set_version("v2");
        doc.set_language("en");
        doc.set_processing_status(DocumentProcessingStatus::Completed);

        assert_eq!(doc.manufacturer(), Some("Acme"));
        assert_eq!(doc.series(), Some("X200"));
        assert_eq!(doc.models(), &["X200-A".to_string(), "X200-B".to_string()]);
        assert_eq!(doc.version(), Some("v2"));
        assert_eq!(doc.language(), Some("en"));
        assert_eq!(doc.processing_status(), DocumentProcessingStatus::Completed);
    }

    #[test]
    fn document_type_round_trips_through_as_str() {
        for dt in [
            DocumentType::ServiceManual,
            DocumentType::PartsCatalog,
            DocumentType::TechnicalBulletin,
            DocumentType::UserManual,
            DocumentType::InstallationGuide,
            DocumentType::TroubleshootingGuide,
            DocumentType::CpmdDatabase,
        ] {
            assert_eq!(DocumentType::parse(dt.as_str()), Some(dt));
        }
    }
}
