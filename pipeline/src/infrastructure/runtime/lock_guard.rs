// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Lock Guard
//!
//! RAII wrapper around [`AdvisoryLockManager::release`] so the scheduler
//! cannot forget to release an acquired lock on any exit path, including
//! an early `?` return or a panic unwinding through the stack (`spec.md`
//! §4.2, §4.5).
//!
//! `release` is async and `Drop::drop` is not, so the guard cannot await
//! its own release on drop. Instead the scheduler calls
//! [`LockGuard::release`] explicitly on every path it controls; `Drop`
//! exists as a last-resort net that spawns the release onto the runtime
//! so a forgotten explicit release still eventually happens, and logs
//! loudly so the omission gets noticed.

use pipeline_domain::repositories::AdvisoryLockManager;
use pipeline_domain::value_objects::AdvisoryLockId;
use pipeline_domain::PipelineError;
use std::sync::Arc;

pub struct LockGuard {
    manager: Arc<dyn AdvisoryLockManager>,
    lock_id: AdvisoryLockId,
    released: bool,
}

impl LockGuard {
    pub fn new(manager: Arc<dyn AdvisoryLockManager>, lock_id: AdvisoryLockId) -> Self {
        Self {
            manager,
            lock_id,
            released: false,
        }
    }

    /// Releases the lock. Idempotent — a second call is a no-op.
    pub async fn release(&mut self) -> Result<(), PipelineError> {
        if self.released {
            return Ok(());
        }
        self.manager.release(self.lock_id).await?;
        self.released = true;
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(lock_id = %self.lock_id, "advisory lock guard dropped without an explicit release; spawning a fallback release");

        let manager = self.manager.clone();
        let lock_id = self.lock_id;
        tokio::spawn(async move {
            if let Err(e) = manager.release(lock_id).await {
                tracing::error!(lock_id = %lock_id, error = %e, "fallback advisory lock release failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingManager {
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AdvisoryLockManager for CountingManager {
        async fn try_acquire(&self, _lock_id: AdvisoryLockId) -> Result<bool, PipelineError> {
            Ok(true)
        }

        async fn release(&self, _lock_id: AdvisoryLockId) -> Result<(), PipelineError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn explicit_release_is_idempotent() {
        let releases = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(CountingManager { releases: releases.clone() });
        let lock_id = AdvisoryLockId::derive("doc", "stage");
        let mut guard = LockGuard::new(manager, lock_id);

        guard.release().await.unwrap();
        guard.release().await.unwrap();

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
