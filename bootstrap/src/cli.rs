// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI
//!
//! The `clap` mapping of the control surface (`spec.md` §6): "any RPC/CLI
//! mapping is acceptable" — this crate's mapping is one subcommand per
//! operation. Stage names are taken as plain strings here and validated
//! against the canonical [`Stage`](pipeline_domain::value_objects::Stage)
//! set by the caller (`pipeline::main`), since this crate has no
//! dependency on `pipeline-domain`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug, Clone)]
#[command(name = "pipeline")]
#[command(about = concat!("Document pipeline execution engine v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file layered over `config/default.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose (DEBUG-level) console logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Override `database_url` from the config file.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// One variant per `spec.md` §6 control-surface operation.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a single named stage for a document.
    RunStage {
        #[arg(long)]
        document_id: Uuid,
        #[arg(long)]
        stage: String,
    },

    /// Run an explicit ordered list of stages for a document.
    RunStages {
        #[arg(long)]
        document_id: Uuid,
        /// Comma-separated stage names, run in the order given.
        #[arg(long, value_delimiter = ',')]
        stages: Vec<String>,
    },

    /// Run every canonical stage for a document, in order.
    RunAll {
        #[arg(long)]
        document_id: Uuid,
    },

    /// Resume a document from its persisted `stage_status`: run every
    /// stage currently `pending` or `failed`, skipping `processing` and
    /// `completed` ones.
    SmartResume {
        #[arg(long)]
        document_id: Uuid,
    },

    /// Print each stage's persisted status for a document.
    Status {
        #[arg(long)]
        document_id: Uuid,
    },

    /// Print the fifteen canonical stages in run order.
    ListStages,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_stage_with_required_flags() {
        let id = Uuid::new_v4();
        let cli = Cli::parse_from(["pipeline", "run-stage", "--document-id", &id.to_string(), "--stage", "upload"]);
        match cli.command {
            Commands::RunStage { document_id, stage } => {
                assert_eq!(document_id, id);
                assert_eq!(stage, "upload");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_comma_separated_stage_list() {
        let id = Uuid::new_v4();
        let cli = Cli::parse_from([
            "pipeline",
            "run-stages",
            "--document-id",
            &id.to_string(),
            "--stages",
            "upload,text_extraction,storage",
        ]);
        match cli.command {
            Commands::RunStages { stages, .. } => {
                assert_eq!(stages, vec!["upload", "text_extraction", "storage"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_stages_takes_no_arguments() {
        let cli = Cli::parse_from(["pipeline", "list-stages"]);
        assert!(matches!(cli.command, Commands::ListStages));
    }

    #[test]
    fn global_flags_are_optional() {
        let cli = Cli::parse_from(["pipeline", "list-stages"]);
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
        assert!(cli.database_url.is_none());
    }
}
