// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain error types. One [`PipelineError`] crosses every layer; see
//! [`pipeline_error`] for the categorization and classification rules.

mod pipeline_error;

pub use pipeline_error::PipelineError;

/// Convenience alias used throughout the domain and infrastructure crates.
pub type Result<T> = std::result::Result<T, PipelineError>;
