// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Postgres adapter for [`RetryPolicyRepository`].
//!
//! `retry_on` is stored as a JSON array of category strings rather than a
//! separate join table — the set is small, closed, and never queried on
//! its own.

use async_trait::async_trait;
use pipeline_domain::entities::RetryPolicy;
use pipeline_domain::repositories::RetryPolicyRepository;
use pipeline_domain::value_objects::ErrorCategory;
use pipeline_domain::PipelineError;
use sqlx::{PgPool, Row};
use std::collections::HashSet;

pub struct PgRetryPolicyRepository {
    pool: PgPool,
}

impl PgRetryPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn category_from_str(s: &str) -> Option<ErrorCategory> {
    ErrorCategory::all().into_iter().find(|c| c.as_str() == s)
}

#[async_trait]
impl RetryPolicyRepository for PgRetryPolicyRepository {
    async fn find(&self, component: &str, stage_name: &str) -> Result<Option<RetryPolicy>, PipelineError> {
        let row = sqlx::query(
            r#"
            SELECT component, stage_name, max_retries, base_delay_seconds, max_delay_seconds,
                   backoff_multiplier, jitter_fraction, retry_on
            FROM retry_policies WHERE component = $1 AND stage_name = $2
            "#,
        )
        .bind(component)
        .bind(stage_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to load retry policy: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let component: String = row.try_get("component").map_err(row_err)?;
        let stage_name: String = row.try_get("stage_name").map_err(row_err)?;
        let max_retries: i32 = row.try_get("max_retries").map_err(row_err)?;
        let base_delay_seconds: f64 = row.try_get("base_delay_seconds").map_err(row_err)?;
        let max_delay_seconds: f64 = row.try_get("max_delay_seconds").map_err(row_err)?;
        let backoff_multiplier: f64 = row.try_get("backoff_multiplier").map_err(row_err)?;
        let jitter_fraction: f64 = row.try_get("jitter_fraction").map_err(row_err)?;
        let retry_on_raw: String = row.try_get("retry_on").map_err(row_err)?;

        let retry_on_names: Vec<String> = serde_json::from_str(&retry_on_raw)
            .map_err(|e| PipelineError::database_error(format!("malformed retry_on column: {e}")))?;
        let retry_on: HashSet<ErrorCategory> = retry_on_names.iter().filter_map(|s| category_from_str(s)).collect();

        Ok(Some(RetryPolicy {
            component,
            stage_name,
            max_retries: max_retries as u32,
            base_delay_seconds,
            max_delay_seconds,
            backoff_multiplier,
            jitter_fraction,
            retry_on,
        }))
    }
}

fn row_err(e: sqlx::Error) -> PipelineError {
    PipelineError::database_error(format!("failed to read retry_policies row: {e}"))
}
