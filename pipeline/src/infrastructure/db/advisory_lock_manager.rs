// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Advisory Lock Manager
//!
//! Session-scoped, non-blocking advisory locks (`spec.md` §4.2). Each lock
//! is acquired and released on a single checked-out connection held for
//! the lock's lifetime — Postgres advisory locks are tied to the session
//! (connection) that took them, so returning the connection to the pool
//! between `try_acquire` and `release` would let another task's session
//! hold a lock this one thinks it owns.

use async_trait::async_trait;
use parking_lot::Mutex;
use pipeline_domain::repositories::AdvisoryLockManager;
use pipeline_domain::value_objects::AdvisoryLockId;
use pipeline_domain::PipelineError;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashMap;
use std::sync::Arc;

pub struct PgAdvisoryLockManager {
    pool: PgPool,
    held: Arc<Mutex<HashMap<i64, PoolConnection<Postgres>>>>,
}

impl PgAdvisoryLockManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            held: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl AdvisoryLockManager for PgAdvisoryLockManager {
    async fn try_acquire(&self, lock_id: AdvisoryLockId) -> Result<bool, PipelineError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to check out connection for advisory lock: {e}")))?;

        let row = sqlx::query("SELECT pg_try_advisory_lock($1) AS acquired")
            .bind(lock_id.as_i64())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to attempt advisory lock: {e}")))?;

        let acquired: bool = row
            .try_get("acquired")
            .map_err(|e| PipelineError::database_error(format!("failed to read advisory lock result: {e}")))?;

        if acquired {
            self.held.lock().insert(lock_id.as_i64(), conn);
        }

        Ok(acquired)
    }

    async fn release(&self, lock_id: AdvisoryLockId) -> Result<(), PipelineError> {
        let conn = self.held.lock().remove(&lock_id.as_i64());

        let Some(mut conn) = conn else {
            return Ok(());
        };

        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(lock_id.as_i64())
            .execute(&mut *conn)
            .await
            .map_err(|e| PipelineError::database_error(format!("failed to release advisory lock: {e}")))?;

        Ok(())
    }
}
