// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Postgres adapter for [`StageStatusRepository`].

use async_trait::async_trait;
use pipeline_domain::entities::StageStatus;
use pipeline_domain::repositories::StageStatusRepository;
use pipeline_domain::value_objects::{DocumentId, ErrorId, Stage, StageStatusValue};
use pipeline_domain::PipelineError;
use sqlx::{PgPool, Row};

pub struct PgStageStatusRepository {
    pool: PgPool,
}

impl PgStageStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_to_str(status: StageStatusValue) -> &'static str {
    status.as_str()
}

fn status_from_str(s: &str) -> StageStatusValue {
    match s {
        "pending" => StageStatusValue::Pending,
        "running" => StageStatusValue::Running,
        "completed" => StageStatusValue::Completed,
        "failed" => StageStatusValue::Failed,
        _ => StageStatusValue::Skipped,
    }
}

fn row_to_stage_status(row: &sqlx::postgres::PgRow) -> Result<StageStatus, PipelineError> {
    let document_id: uuid::Uuid = row.try_get("document_id").map_err(row_err)?;
    let stage_name: String = row.try_get("stage_name").map_err(row_err)?;
    let status: String = row.try_get("status").map_err(row_err)?;
    let progress_percent: i16 = row.try_get("progress_percent").map_err(row_err)?;
    let attempt: i32 = row.try_get("attempt").map_err(row_err)?;
    let error_message: Option<String> = row.try_get("error_message").map_err(row_err)?;
    let last_error_id: Option<String> = row.try_get("last_error_id").map_err(row_err)?;
    let started_at: Option<chrono::DateTime<chrono::Utc>> = row.try_get("started_at").map_err(row_err)?;
    let completed_at: Option<chrono::DateTime<chrono::Utc>> = row.try_get("completed_at").map_err(row_err)?;
    let updated_at: chrono::DateTime<chrono::Utc> = row.try_get("updated_at").map_err(row_err)?;

    let stage = Stage::parse(&stage_name)
        .ok_or_else(|| PipelineError::database_error(format!("unknown stage name in stage_status row: {stage_name}")))?;

    Ok(StageStatus::from_parts(
        DocumentId::from_uuid(document_id),
        stage,
        status_from_str(&status),
        progress_percent as u8,
        attempt as u32,
        error_message,
        last_error_id.map(ErrorId::from_string),
        started_at,
        completed_at,
        updated_at,
    ))
}

fn row_err(e: sqlx::Error) -> PipelineError {
    PipelineError::database_error(format!("failed to read stage_status row: {e}"))
}

#[async_trait]
impl StageStatusRepository for PgStageStatusRepository {
    async fn upsert(&self, status: &StageStatus) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO stage_status
                (document_id, stage_name, status, progress_percent, attempt, error_message, last_error_id, started_at, completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (document_id, stage_name) DO UPDATE SET
                status = EXCLUDED.status,
                progress_percent = EXCLUDED.progress_percent,
                attempt = EXCLUDED.attempt,
                error_message = EXCLUDED.error_message,
                last_error_id = EXCLUDED.last_error_id,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(status.document_id().as_uuid())
        .bind(status.stage().as_str())
        .bind(status_to_str(status.status()))
        .bind(status.progress_percent() as i16)
        .bind(status.attempt() as i32)
        .bind(status.error_message())
        .bind(status.last_error_id().map(|id| id.as_str()))
        .bind(status.started_at())
        .bind(status.completed_at())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to upsert stage_status: {e}")))?;

        Ok(())
    }

    async fn find(&self, document_id: DocumentId, stage: Stage) -> Result<Option<StageStatus>, PipelineError> {
        let row = sqlx::query(
            r#"
            SELECT document_id, stage_name, status, progress_percent, attempt, error_message, last_error_id, started_at, completed_at, updated_at
            FROM stage_status WHERE document_id = $1 AND stage_name = $2
            "#,
        )
        .bind(document_id.as_uuid())
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to load stage_status: {e}")))?;

        row.map(|r| row_to_stage_status(&r)).transpose()
    }

    async fn find_all_for_document(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, PipelineError> {
        let rows = sqlx::query(
            r#"
            SELECT document_id, stage_name, status, progress_percent, attempt, error_message, last_error_id, started_at, completed_at, updated_at
            FROM stage_status WHERE document_id = $1
            "#,
        )
        .bind(document_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to list stage_status rows: {e}")))?;

        rows.iter().map(row_to_stage_status).collect()
    }
}
