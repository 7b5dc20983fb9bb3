// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Configuration
//!
//! The exhaustive, typed configuration record enumerated in `spec.md` §6.
//! Loaded by layering `config/default.toml` → `config/{env}.toml` →
//! `PIPELINE_*` environment variables via the `config` crate, then
//! deserialized with `#[serde(deny_unknown_fields)]` — an unrecognized key
//! anywhere in that chain is a startup error, not a silently ignored typo
//! (`spec.md` §9, "Design Notes").

use pipeline_domain::PipelineError;
use serde::{Deserialize, Serialize};

/// Every configuration field the core reads, plus the two the database
/// connection needs (`database_url`, `max_db_connections`) that the
/// distilled spec left implicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Upper bound on scheduler invocations the host runs in parallel.
    #[serde(default = "defaults::max_concurrent_documents")]
    pub max_concurrent_documents: u32,

    /// TTL, in seconds, for the in-memory retry-policy cache.
    #[serde(default = "defaults::policy_cache_ttl_seconds")]
    pub policy_cache_ttl_seconds: u64,

    /// Minimum interval, in milliseconds, between progress writes for a
    /// single `(document, stage)` pair.
    #[serde(default = "defaults::progress_write_interval_ms")]
    pub progress_write_interval_ms: u64,

    /// Path to the structured JSON log sink.
    #[serde(default = "defaults::log_file_path")]
    pub log_file_path: String,

    /// Rotation threshold, in bytes, for the log file.
    #[serde(default = "defaults::log_max_bytes")]
    pub log_max_bytes: u64,

    /// Number of rotated backups to retain (`pipeline.log.1` … `.N`).
    #[serde(default = "defaults::log_backup_count")]
    pub log_backup_count: u32,

    /// Per-stage wall-clock cap applied when a processor does not declare
    /// its own expected duration.
    #[serde(default = "defaults::default_stage_timeout_seconds")]
    pub default_stage_timeout_seconds: u64,

    /// Time to wait for in-flight stages on cancellation.
    #[serde(default = "defaults::shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,

    /// Whether the upload stage may force-reprocess a duplicate content
    /// hash. Gated externally (auth/admin surface); the core only reads
    /// this flag.
    #[serde(default = "defaults::force_reprocess_allowed")]
    pub force_reprocess_allowed: bool,

    /// Postgres connection string. Required — no sensible default.
    pub database_url: String,

    /// Connection pool ceiling.
    #[serde(default = "defaults::max_db_connections")]
    pub max_db_connections: u32,
}

impl PipelineConfig {
    /// Validates field ranges the `config` crate's type system cannot
    /// express on its own (`spec.md` §9: unknown fields fail at
    /// deserialization; out-of-range values fail here).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_concurrent_documents == 0 {
            return Err(PipelineError::invalid_config("max_concurrent_documents must be >= 1"));
        }
        if self.max_db_connections == 0 {
            return Err(PipelineError::invalid_config("max_db_connections must be >= 1"));
        }
        if self.log_max_bytes == 0 {
            return Err(PipelineError::invalid_config("log_max_bytes must be >= 1"));
        }
        if self.database_url.trim().is_empty() {
            return Err(PipelineError::invalid_config("database_url must not be empty"));
        }
        Ok(())
    }

    /// Loads configuration by layering `config/default.toml`, an optional
    /// `config/{env}.toml` (`PIPELINE_ENV`, default `development`), and
    /// `PIPELINE_*` environment variables, in that order of increasing
    /// precedence.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Result<Self, PipelineError> {
        let env = std::env::var("PIPELINE_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        if let Some(path) = explicit_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder = builder.add_source(config::Environment::with_prefix("PIPELINE").separator("__"));

        let raw = builder
            .build()
            .map_err(|e| PipelineError::invalid_config(format!("failed to load configuration: {e}")))?;

        let parsed: PipelineConfig = raw
            .try_deserialize()
            .map_err(|e| PipelineError::invalid_config(format!("invalid configuration: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }
}

mod defaults {
    pub fn max_concurrent_documents() -> u32 {
        4
    }
    pub fn policy_cache_ttl_seconds() -> u64 {
        300
    }
    pub fn progress_write_interval_ms() -> u64 {
        250
    }
    pub fn log_file_path() -> String {
        "pipeline.log".to_string()
    }
    pub fn log_max_bytes() -> u64 {
        100 * 1024 * 1024
    }
    pub fn log_backup_count() -> u32 {
        10
    }
    pub fn default_stage_timeout_seconds() -> u64 {
        300
    }
    pub fn shutdown_grace_seconds() -> u64 {
        30
    }
    pub fn force_reprocess_allowed() -> bool {
        true
    }
    pub fn max_db_connections() -> u32 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineConfig {
        PipelineConfig {
            max_concurrent_documents: 4,
            policy_cache_ttl_seconds: 300,
            progress_write_interval_ms: 250,
            log_file_path: "pipeline.log".to_string(),
            log_max_bytes: 100 * 1024 * 1024,
            log_backup_count: 10,
            default_stage_timeout_seconds: 300,
            shutdown_grace_seconds: 30,
            force_reprocess_allowed: true,
            database_url: "postgres://localhost/pipeline".to_string(),
            max_db_connections: 10,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn zero_max_concurrent_documents_is_rejected() {
        let mut cfg = sample();
        cfg.max_concurrent_documents = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let mut cfg = sample();
        cfg.database_url = "   ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_toml_key_fails_to_deserialize() {
        let toml_str = r#"
            database_url = "postgres://localhost/pipeline"
            not_a_real_field = 123
        "#;
        let parsed: Result<PipelineConfig, _> = toml::from_str(toml_str);
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let toml_str = r#"database_url = "postgres://localhost/pipeline""#;
        let parsed: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.max_concurrent_documents, 4);
        assert_eq!(parsed.log_backup_count, 10);
        assert!(parsed.force_reprocess_allowed);
    }
}
