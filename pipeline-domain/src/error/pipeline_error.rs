// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single error type crosses every layer of this crate and the
//! infrastructure crate built on top of it. Each variant carries enough
//! context for logging and maps onto exactly one of the eleven
//! [`ErrorCategory`] values the classifier (§4.1) ever produces, so
//! `category()` below and the runtime classifier agree by construction.
//!
//! ## Error Recovery
//!
//! [`PipelineError::classify`] is the single source of truth retry decisions
//! are made from — it is conservative by design: anything not explicitly
//! known to be permanent classifies as `Unknown`/transient rather than
//! silently dropping a retryable failure.

use crate::value_objects::{ErrorCategory, ErrorClassification};
use thiserror::Error;

/// Domain-wide error type.
///
/// Variants that wrap an opaque `String` instead of a typed cause are
/// intentional: the originating error (an HTTP client error, a database
/// driver error) has already been converted to its displayable form by the
/// time it crosses into this type, since the domain crate itself talks to
/// neither HTTP nor the database.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authorization denied: {0}")]
    Authorization(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("advisory lock unavailable: {0}")]
    LockUnavailable(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("stage processing failed: {0}")]
    ProcessingFailed(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// The closed category this variant belongs to. Every variant maps to
    /// exactly one category; there is no fallthrough arm, so a new variant
    /// that forgets to pick one fails to compile.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::InvalidConfiguration(_) => ErrorCategory::Validation,
            PipelineError::ValidationError(_) => ErrorCategory::Validation,
            PipelineError::NotFound(_) => ErrorCategory::NotFound,
            PipelineError::Network(_) => ErrorCategory::Network,
            PipelineError::Timeout(_) => ErrorCategory::Timeout,
            PipelineError::RateLimited(_) => ErrorCategory::RateLimit,
            PipelineError::Authentication(_) => ErrorCategory::Authentication,
            PipelineError::Authorization(_) => ErrorCategory::Authorization,
            PipelineError::DatabaseError(_) => ErrorCategory::Database,
            PipelineError::ResourceExhausted(_) => ErrorCategory::ResourceExhausted,
            PipelineError::LockUnavailable(_) => ErrorCategory::Database,
            PipelineError::IoError(_) => ErrorCategory::Internal,
            PipelineError::SerializationError(_) => ErrorCategory::Internal,
            PipelineError::ProcessingFailed(_) => ErrorCategory::Internal,
            PipelineError::Cancelled(_) => ErrorCategory::Internal,
            PipelineError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this category is, in the abstract, worth retrying — before
    /// consulting the active [`crate::entities::RetryPolicy`]'s `retry_on`
    /// set, which has the final word.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::RateLimit
                | ErrorCategory::ResourceExhausted
                | ErrorCategory::Database
                | ErrorCategory::Unknown
        )
    }

    /// Classifies this error, producing the [`ErrorClassification`] the
    /// error logger persists and the retry orchestrator consults.
    ///
    /// Carries no `retry_after` hint of its own — a caller that parsed one
    /// from e.g. a response header attaches it via
    /// [`ErrorClassification::with_retry_after`].
    pub fn classify(&self) -> ErrorClassification {
        ErrorClassification::new(self.variant_name(), self.category(), self.is_transient())
    }

    fn variant_name(&self) -> &'static str {
        match self {
            PipelineError::InvalidConfiguration(_) => "InvalidConfiguration",
            PipelineError::ValidationError(_) => "ValidationError",
            PipelineError::NotFound(_) => "NotFound",
            PipelineError::Network(_) => "Network",
            PipelineError::Timeout(_) => "Timeout",
            PipelineError::RateLimited(_) => "RateLimited",
            PipelineError::Authentication(_) => "Authentication",
            PipelineError::Authorization(_) => "Authorization",
            PipelineError::DatabaseError(_) => "DatabaseError",
            PipelineError::ResourceExhausted(_) => "ResourceExhausted",
            PipelineError::LockUnavailable(_) => "LockUnavailable",
            PipelineError::IoError(_) => "IoError",
            PipelineError::SerializationError(_) => "SerializationError",
            PipelineError::ProcessingFailed(_) => "ProcessingFailed",
            PipelineError::Cancelled(_) => "Cancelled",
            PipelineError::InternalError(_) => "InternalError",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

// sqlx::Error conversion lives in the `pipeline` crate, not here — the
// domain crate has no database dependency of its own.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_classifies_without_panicking() {
        let errors = vec![
            PipelineError::invalid_config("x"),
            PipelineError::ValidationError("x".into()),
            PipelineError::not_found("x"),
            PipelineError::Network("x".into()),
            PipelineError::Timeout("x".into()),
            PipelineError::RateLimited("x".into()),
            PipelineError::Authentication("x".into()),
            PipelineError::Authorization("x".into()),
            PipelineError::database_error("x"),
            PipelineError::ResourceExhausted("x".into()),
            PipelineError::LockUnavailable("x".into()),
            PipelineError::IoError("x".into()),
            PipelineError::SerializationError("x".into()),
            PipelineError::processing_failed("x"),
            PipelineError::Cancelled("x".into()),
            PipelineError::internal_error("x"),
        ];
        for error in errors {
            let classification = error.classify();
            assert_eq!(classification.category, error.category());
        }
    }

    #[test]
    fn validation_and_authorization_are_not_transient() {
        assert!(!PipelineError::ValidationError("x".into()).is_transient());
        assert!(!PipelineError::Authorization("x".into()).is_transient());
        assert!(!PipelineError::Authentication("x".into()).is_transient());
    }

    #[test]
    fn network_timeout_and_rate_limit_are_transient() {
        assert!(PipelineError::Network("x".into()).is_transient());
        assert!(PipelineError::Timeout("x".into()).is_transient());
        assert!(PipelineError::RateLimited("x".into()).is_transient());
    }

    #[test]
    fn io_error_converts_from_std_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::IoError(_)));
    }
}
