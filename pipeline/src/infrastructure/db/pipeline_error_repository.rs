// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Postgres adapter for [`PipelineErrorRepository`].
//!
//! [`PipelineErrorRecord`] is stored whole, as JSONB, in `payload` — the
//! entity already derives `Serialize`/`Deserialize` and exposes no public
//! constructor that accepts every field back (only `new`, which mints a
//! fresh `error_id`), so round-tripping through individual columns would
//! require widening its public API for persistence alone. The remaining
//! columns are projections of the payload kept in sync on every write,
//! used only for indexing/filtering.

use async_trait::async_trait;
use pipeline_domain::entities::PipelineErrorRecord;
use pipeline_domain::repositories::PipelineErrorRepository;
use pipeline_domain::value_objects::ErrorId;
use pipeline_domain::PipelineError;
use sqlx::{PgPool, Row};

pub struct PgPipelineErrorRepository {
    pool: PgPool,
}

impl PgPipelineErrorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_payload(raw: serde_json::Value) -> Result<PipelineErrorRecord, PipelineError> {
    serde_json::from_value(raw).map_err(|e| PipelineError::database_error(format!("malformed pipeline_errors payload: {e}")))
}

fn row_err(e: sqlx::Error) -> PipelineError {
    PipelineError::database_error(format!("failed to read pipeline_errors row: {e}"))
}

#[async_trait]
impl PipelineErrorRepository for PgPipelineErrorRepository {
    async fn save(&self, record: &PipelineErrorRecord) -> Result<(), PipelineError> {
        let payload = serde_json::to_value(record)
            .map_err(|e| PipelineError::database_error(format!("failed to serialize pipeline error record: {e}")))?;

        let (request_id_str, _stage, _attempt) = record
            .correlation_id()
            .parse()
            .ok_or_else(|| PipelineError::database_error("error record has a malformed correlation id"))?;
        let request_id: uuid::Uuid = request_id_str
            .parse()
            .map_err(|e| PipelineError::database_error(format!("error record's request id is not a UUID: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO pipeline_errors
                (error_id, document_id, correlation_id, request_id, stage_name, error_category, status, created_at, updated_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now(), $8)
            ON CONFLICT (error_id) DO UPDATE SET
                status = EXCLUDED.status,
                updated_at = now(),
                payload = EXCLUDED.payload
            "#,
        )
        .bind(record.error_id().as_str())
        .bind(record.document_id().as_uuid())
        .bind(record.correlation_id().as_str())
        .bind(request_id)
        .bind(record.stage_name())
        .bind(record.error_category().as_str())
        .bind(record.status().as_str())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to save pipeline error record: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, error_id: &ErrorId) -> Result<Option<PipelineErrorRecord>, PipelineError> {
        let row = sqlx::query("SELECT payload FROM pipeline_errors WHERE error_id = $1")
            .bind(error_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to load pipeline error record: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: serde_json::Value = row.try_get("payload").map_err(row_err)?;
        Ok(Some(decode_payload(payload)?))
    }

    async fn find_by_correlation_prefix(&self, request_id: &str) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        let rows = if let Ok(parsed) = request_id.parse::<uuid::Uuid>() {
            sqlx::query("SELECT payload FROM pipeline_errors WHERE request_id = $1 ORDER BY created_at")
                .bind(parsed)
                .fetch_all(&self.pool)
                .await
        } else {
            let like_pattern = format!("{request_id}.%");
            sqlx::query("SELECT payload FROM pipeline_errors WHERE correlation_id LIKE $1 ORDER BY created_at")
                .bind(like_pattern)
                .fetch_all(&self.pool)
                .await
        }
        .map_err(|e| PipelineError::database_error(format!("failed to list pipeline error records: {e}")))?;

        rows.into_iter()
            .map(|r| {
                let payload: serde_json::Value = r.try_get("payload").map_err(row_err)?;
                decode_payload(payload)
            })
            .collect()
    }

    async fn find_unresolved(&self, limit: u32) -> Result<Vec<PipelineErrorRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT payload FROM pipeline_errors WHERE status NOT IN ('resolved', 'failed') ORDER BY created_at LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to list unresolved pipeline error records: {e}")))?;

        rows.into_iter()
            .map(|r| {
                let payload: serde_json::Value = r.try_get("payload").map_err(row_err)?;
                decode_payload(payload)
            })
            .collect()
    }
}
