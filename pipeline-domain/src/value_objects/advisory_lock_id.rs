// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Advisory Lock ID
//!
//! The deterministic 63-bit key used with the database's non-blocking,
//! session-scoped advisory lock primitive (`spec.md` §4.2). Two processes
//! racing to run the same `(document_id, stage_name)` pair always derive the
//! same lock ID and so only one acquires the lock.

use sha2::{Digest, Sha256};
use std::fmt;

/// A lock key in `pg_try_advisory_lock`'s signed-64-bit key space, always
/// non-negative (top bit cleared) so it round-trips through Postgres's
/// `bigint` without sign surprises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvisoryLockId(i64);

impl AdvisoryLockId {
    /// Derives the lock ID for a `(document_id, stage_name)` pair.
    ///
    /// `lock_id = big_endian_u64(SHA256("{document_id}:{stage_name}")[..8]) mod (2^63 - 1)`
    pub fn derive(document_id: &str, stage_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_bytes());
        hasher.update(b":");
        hasher.update(stage_name.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let raw = u64::from_be_bytes(bytes);

        let modulus = (i64::MAX) as u64; // 2^63 - 1
        Self((raw % modulus) as i64)
    }

    /// The raw value, ready to bind as a Postgres `bigint` parameter.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AdvisoryLockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = AdvisoryLockId::derive("doc_1", "text_extraction");
        let b = AdvisoryLockId::derive("doc_1", "text_extraction");
        assert_eq!(a, b);
    }

    #[test]
    fn different_stages_derive_different_ids() {
        let a = AdvisoryLockId::derive("doc_1", "text_extraction");
        let b = AdvisoryLockId::derive("doc_1", "table_extraction");
        assert_ne!(a, b);
    }

    #[test]
    fn different_documents_derive_different_ids() {
        let a = AdvisoryLockId::derive("doc_1", "text_extraction");
        let b = AdvisoryLockId::derive("doc_2", "text_extraction");
        assert_ne!(a, b);
    }

    #[test]
    fn always_non_negative() {
        for i in 0..64 {
            let id = AdvisoryLockId::derive(&format!("doc_{i}"), "storage");
            assert!(id.as_i64() >= 0);
        }
    }
}
