// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task Supervision Utilities
//!
//! Wraps `tokio::spawn` so no background task — in particular a scheduled
//! retry (`spec.md` §4.7) — is ever spawned-and-forgotten: every outcome is
//! logged, and panics are converted into a typed [`PipelineError`] rather
//! than silently dropped.

use pipeline_domain::PipelineError;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub type AppResult<T> = Result<T, PipelineError>;

/// Spawns a supervised task. The caller must eventually await the returned
/// handle with [`join_supervised`] to observe its outcome.
pub fn spawn_supervised<F, T>(name: &'static str, fut: F) -> JoinHandle<AppResult<T>>
where
    F: std::future::Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    debug!(task = name, "task starting");

    tokio::spawn(async move {
        let result = fut.await;

        match &result {
            Ok(_) => debug!(task = name, "task completed successfully"),
            Err(e) => error!(task = name, error = %e, "task failed"),
        }

        result
    })
}

/// Awaits a supervised task handle, converting panics and cancellation
/// into [`PipelineError`] rather than propagating a bare `JoinError`.
pub async fn join_supervised<T>(handle: JoinHandle<AppResult<T>>) -> AppResult<T> {
    match handle.await {
        Ok(task_result) => task_result,
        Err(e) if e.is_panic() => Err(PipelineError::internal_error(format!("task panicked: {e}"))),
        Err(e) if e.is_cancelled() => Err(PipelineError::cancelled(format!("task cancelled: {e}"))),
        Err(e) => Err(PipelineError::internal_error(format!("task join failed: {e}"))),
    }
}
