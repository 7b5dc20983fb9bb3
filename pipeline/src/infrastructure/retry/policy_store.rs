// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy Store
//!
//! Bounded, TTL-expiring cache in front of [`RetryPolicyRepository`]
//! (`spec.md` §9, Design Notes — "no unbounded global caches"). A miss
//! falls through to the database, then to [`RetryPolicy::code_default`]
//! when no row exists either, per §3.

use moka::sync::Cache;
use pipeline_domain::entities::RetryPolicy;
use pipeline_domain::repositories::RetryPolicyRepository;
use pipeline_domain::PipelineError;
use std::sync::Arc;
use std::time::Duration;

/// Capacity ceiling on distinct `(component, stage_name)` cache entries.
/// Generous relative to the fifteen canonical stages but still bounded.
const MAX_CACHED_POLICIES: u64 = 1024;

pub struct RetryPolicyStore {
    repository: Arc<dyn RetryPolicyRepository>,
    cache: Cache<(String, String), RetryPolicy>,
}

impl RetryPolicyStore {
    pub fn new(repository: Arc<dyn RetryPolicyRepository>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(MAX_CACHED_POLICIES).time_to_live(ttl).build();
        Self { repository, cache }
    }

    /// Resolves the active policy for `(component, stage_name)`: cache,
    /// then database, then the built-in conservative default.
    pub async fn resolve(&self, component: &str, stage_name: &str) -> Result<RetryPolicy, PipelineError> {
        let key = (component.to_string(), stage_name.to_string());

        if let Some(policy) = self.cache.get(&key) {
            return Ok(policy);
        }

        let policy = match self.repository.find(component, stage_name).await? {
            Some(policy) => policy,
            None => RetryPolicy::code_default(component, stage_name),
        };

        self.cache.insert(key, policy.clone());
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRepository {
        calls: Arc<AtomicUsize>,
        row: Option<RetryPolicy>,
    }

    #[async_trait]
    impl RetryPolicyRepository for CountingRepository {
        async fn find(&self, _component: &str, _stage_name: &str) -> Result<Option<RetryPolicy>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.row.clone())
        }
    }

    #[tokio::test]
    async fn falls_back_to_code_default_when_no_row_exists() {
        let calls = Arc::new(AtomicUsize::new(0));
        let repo = Arc::new(CountingRepository { calls: calls.clone(), row: None });
        let store = RetryPolicyStore::new(repo, Duration::from_secs(60));

        let policy = store.resolve("scheduler", "upload").await.unwrap();
        assert_eq!(policy.max_retries, RetryPolicy::code_default("scheduler", "upload").max_retries);
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_hits_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let repo = Arc::new(CountingRepository { calls: calls.clone(), row: None });
        let store = RetryPolicyStore::new(repo, Duration::from_secs(60));

        store.resolve("scheduler", "upload").await.unwrap();
        store.resolve("scheduler", "upload").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_stages_are_cached_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let repo = Arc::new(CountingRepository { calls: calls.clone(), row: None });
        let store = RetryPolicyStore::new(repo, Duration::from_secs(60));

        store.resolve("scheduler", "upload").await.unwrap();
        store.resolve("scheduler", "storage").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
