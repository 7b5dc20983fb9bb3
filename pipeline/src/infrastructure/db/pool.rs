// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Connection Pool
//!
//! Builds the shared `PgPool` and runs embedded migrations against it.
//! Called once from the composition root (`pipeline::main`).

use crate::infrastructure::config::PipelineConfig;
use pipeline_domain::PipelineError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and applies any pending migrations under
/// `migrations/`, embedded into the binary at compile time.
pub async fn build_pool(config: &PipelineConfig) -> Result<PgPool, PipelineError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to connect to database: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| PipelineError::database_error(format!("failed to run migrations: {e}")))?;

    Ok(pool)
}
