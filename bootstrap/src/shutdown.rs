// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! The cancellation signal the scheduler consults before starting a new
//! stage (`spec.md` §5): "a scheduler invocation respects a cancellation
//! signal and will not start a new stage after cancellation". Built on
//! `tokio_util::sync::CancellationToken` rather than a hand-rolled flag, so
//! cloning and `.cancelled().await` compose with the rest of the `tokio`
//! ecosystem the scheduler already uses.
//!
//! The grace period (`shutdown_grace_seconds`, default 30s) is the window
//! the runtime entry waits for in-flight stages to finish before it stops
//! waiting — per spec this does not forcibly cancel a stuck processor, it
//! just stops waiting for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 30;

/// Coordinates graceful shutdown across scheduler workers.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    shutdown_initiated: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(Notify::new()),
        }
    }

    /// A token workers can clone and check with `.is_cancelled()` /
    /// `.cancelled().await` before starting a new stage.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Cancels the token exactly once, even under concurrent callers (the
    /// signal handler and a manual shutdown request could both fire).
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!(grace_period_secs = self.grace_period.as_secs(), "initiating graceful shutdown");
            self.token.cancel();
        }
    }

    /// Waits for [`Self::complete_shutdown`] or the grace period, whichever
    /// comes first. Returns `true` iff shutdown completed within the grace
    /// window.
    pub async fn wait_for_shutdown(&self) -> bool {
        if !self.is_shutting_down() {
            tracing::warn!("wait_for_shutdown called before shutdown was initiated");
            return true;
        }

        tokio::select! {
            _ = self.shutdown_complete.notified() => {
                tracing::info!("shutdown completed within grace period");
                true
            }
            _ = tokio::time::sleep(self.grace_period) => {
                tracing::warn!("shutdown grace period expired with stages still in flight");
                false
            }
        }
    }

    /// Waits with a caller-supplied timeout instead of the configured grace
    /// period, for the per-stage abandon-wait behavior in `spec.md` §5.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        if !self.is_shutting_down() {
            return true;
        }

        tokio::select! {
            _ = self.shutdown_complete.notified() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }

    /// Signals that all in-flight work has wound down.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.notify_waiters();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_coordinator_is_not_shutting_down() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        assert!(!coordinator.is_shutting_down());
        assert!(!coordinator.token().is_cancelled());
    }

    #[test]
    fn initiate_shutdown_cancels_the_token() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let token = coordinator.token();
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[test]
    fn initiate_shutdown_is_idempotent() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_true_on_timely_completion() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let background = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            background.complete_shutdown();
        });

        let completed = tokio::time::timeout(Duration::from_millis(500), coordinator.wait_for_shutdown())
            .await
            .unwrap_or(false);
        assert!(completed);
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_false_on_grace_period_expiry() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(20));
        coordinator.initiate_shutdown();
        assert!(!coordinator.wait_for_shutdown().await);
    }

    #[tokio::test]
    async fn wait_with_timeout_uses_the_caller_supplied_duration() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
        coordinator.initiate_shutdown();
        assert!(!coordinator.wait_with_timeout(Duration::from_millis(20)).await);
    }
}
