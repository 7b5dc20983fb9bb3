// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Postgres adapter for [`DocumentRepository`].

use async_trait::async_trait;
use pipeline_domain::entities::{Document, DocumentType};
use pipeline_domain::repositories::DocumentRepository;
use pipeline_domain::value_objects::{DocumentId, DocumentProcessingStatus};
use pipeline_domain::PipelineError;
use sqlx::{PgPool, Row};

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DOCUMENT_COLUMNS: &str = r#"
    id, file_name, content_hash, size_bytes, document_type,
    manufacturer, series, models, version, language,
    processing_status, created_at, updated_at
"#;

fn status_to_str(status: DocumentProcessingStatus) -> &'static str {
    match status {
        DocumentProcessingStatus::Pending => "pending",
        DocumentProcessingStatus::Processing => "processing",
        DocumentProcessingStatus::Completed => "completed",
        DocumentProcessingStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> DocumentProcessingStatus {
    match s {
        "processing" => DocumentProcessingStatus::Processing,
        "completed" => DocumentProcessingStatus::Completed,
        "failed" => DocumentProcessingStatus::Failed,
        _ => DocumentProcessingStatus::Pending,
    }
}

fn row_to_document(row: sqlx::postgres::PgRow) -> Result<Document, PipelineError> {
    let id: uuid::Uuid = row.try_get("id").map_err(row_err)?;
    let file_name: String = row.try_get("file_name").map_err(row_err)?;
    let content_hash: String = row.try_get("content_hash").map_err(row_err)?;
    let size_bytes: i64 = row.try_get("size_bytes").map_err(row_err)?;
    let document_type: String = row.try_get("document_type").map_err(row_err)?;
    let manufacturer: Option<String> = row.try_get("manufacturer").map_err(row_err)?;
    let series: Option<String> = row.try_get("series").map_err(row_err)?;
    let models_json: serde_json::Value = row.try_get("models").map_err(row_err)?;
    let version: Option<String> = row.try_get("version").map_err(row_err)?;
    let language: Option<String> = row.try_get("language").map_err(row_err)?;
    let processing_status: String = row.try_get("processing_status").map_err(row_err)?;
    let created_at: chrono::DateTime<chrono::Utc> = row.try_get("created_at").map_err(row_err)?;
    let updated_at: chrono::DateTime<chrono::Utc> = row.try_get("updated_at").map_err(row_err)?;

    let models: Vec<String> = serde_json::from_value(models_json).unwrap_or_default();

    Ok(Document::from_parts(
        DocumentId::from_uuid(id),
        file_name,
        content_hash,
        size_bytes as u64,
        DocumentType::parse(&document_type).unwrap_or(DocumentType::ServiceManual),
        manufacturer,
        series,
        models,
        version,
        language,
        status_from_str(&processing_status),
        created_at,
        updated_at,
    ))
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn save(&self, document: &Document) -> Result<(), PipelineError> {
        let models_json =
            serde_json::to_value(document.models()).map_err(|e| PipelineError::database_error(format!("failed to serialize document models: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, file_name, content_hash, size_bytes, document_type,
                manufacturer, series, models, version, language,
                processing_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                file_name = EXCLUDED.file_name,
                content_hash = EXCLUDED.content_hash,
                size_bytes = EXCLUDED.size_bytes,
                document_type = EXCLUDED.document_type,
                manufacturer = EXCLUDED.manufacturer,
                series = EXCLUDED.series,
                models = EXCLUDED.models,
                version = EXCLUDED.version,
                language = EXCLUDED.language,
                processing_status = EXCLUDED.processing_status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(document.id().as_uuid())
        .bind(document.file_name())
        .bind(document.content_hash())
        .bind(document.size_bytes() as i64)
        .bind(document.document_type().as_str())
        .bind(document.manufacturer())
        .bind(document.series())
        .bind(models_json)
        .bind(document.version())
        .bind(document.language())
        .bind(status_to_str(document.processing_status()))
        .bind(document.created_at())
        .bind(document.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to save document: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, PipelineError> {
        let row = sqlx::query(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to load document: {e}")))?;

        row.map(row_to_document).transpose()
    }

    async fn find_by_content_hash(&self, content_hash: &str) -> Result<Option<Document>, PipelineError> {
        let row = sqlx::query(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE content_hash = $1"))
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to look up document by content hash: {e}")))?;

        row.map(row_to_document).transpose()
    }
}

fn row_err(e: sqlx::Error) -> PipelineError {
    PipelineError::database_error(format!("failed to read document row: {e}"))
}
