// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Binary Entry Point
//!
//! Parses the CLI, loads configuration, wires every repository and
//! service onto one Postgres pool, installs signal handling, dispatches
//! the requested control-surface operation, and maps the outcome onto a
//! process exit code (`spec.md` §6, §9).

use bootstrap::cli::{Cli, Commands};
use bootstrap::exit_code::ExitCode;
use bootstrap::shutdown::ShutdownCoordinator;
use bootstrap::signals::create_signal_handler;
use clap::Parser;
use pipeline::application::{ApplicationService, DefaultStageRegistry};
use pipeline::infrastructure::config::PipelineConfig;
use pipeline::infrastructure::db::{
    build_pool, PgAdvisoryLockManager, PgPipelineErrorRepository, PgRetryPolicyRepository, PgStageStatusRepository,
};
use pipeline::infrastructure::error_logging::ErrorLogger;
use pipeline::infrastructure::logging;
use pipeline::infrastructure::retry::{RetryOrchestrator, RetryPolicyStore};
use pipeline::infrastructure::runtime::PipelineScheduler;
use pipeline::infrastructure::tracker::StageTracker;
use pipeline_domain::value_objects::{DocumentId, Stage, StageOutcome, StageOutcomeStatus};
use pipeline_domain::PipelineError;
use std::process::ExitCode as ProcessExitCode;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> ProcessExitCode {
    let cli = Cli::parse();

    let mut config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return to_process_code(ExitCode::Config);
        }
    };

    if let Some(database_url) = &cli.database_url {
        config.database_url = database_url.clone();
    }

    let _log_guard = match logging::init(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return to_process_code(ExitCode::Software);
        }
    };

    let exit_code = run(config, cli.command).await;
    to_process_code(exit_code)
}

async fn run(config: PipelineConfig, command: Commands) -> ExitCode {
    let pool = match build_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            return ExitCode::Unavailable;
        }
    };

    let stage_status_repository = Arc::new(PgStageStatusRepository::new(pool.clone()));
    let error_repository = Arc::new(PgPipelineErrorRepository::new(pool.clone()));
    let retry_policy_repository = Arc::new(PgRetryPolicyRepository::new(pool.clone()));
    let lock_manager = Arc::new(PgAdvisoryLockManager::new(pool.clone()));

    let tracker = Arc::new(StageTracker::new(
        stage_status_repository.clone(),
        Duration::from_millis(config.progress_write_interval_ms),
    ));
    let error_logger = Arc::new(ErrorLogger::new(error_repository.clone()));
    let policy_store = Arc::new(RetryPolicyStore::new(
        retry_policy_repository,
        Duration::from_secs(config.policy_cache_ttl_seconds),
    ));
    let orchestrator = Arc::new(RetryOrchestrator::new(error_repository, stage_status_repository.clone()));
    let registry = Arc::new(DefaultStageRegistry::with_noop_processors());

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(config.shutdown_grace_seconds));
    spawn_signal_listener(shutdown.clone());

    let scheduler = Arc::new(PipelineScheduler::new(
        lock_manager,
        stage_status_repository.clone(),
        tracker,
        error_logger,
        policy_store,
        orchestrator,
        registry,
        shutdown.token(),
        Duration::from_secs(config.default_stage_timeout_seconds),
    ));

    let service = ApplicationService::new(scheduler, stage_status_repository);

    dispatch(&service, command).await
}

fn spawn_signal_listener(shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        let handler = create_signal_handler();
        let shutdown_for_callback = shutdown.clone();
        handler
            .wait_for_signal(Box::new(move || shutdown_for_callback.initiate_shutdown()))
            .await;
    });
}

async fn dispatch(service: &ApplicationService, command: Commands) -> ExitCode {
    match command {
        Commands::RunStage { document_id, stage } => {
            let (document_id, stage) = match parse_target(document_id, &stage) {
                Ok(parsed) => parsed,
                Err(code) => return code,
            };
            match service.run_stage(document_id, stage).await {
                Ok(outcome) => report_outcomes(std::slice::from_ref(&outcome)),
                Err(e) => report_error(&e),
            }
        }
        Commands::RunStages { document_id, stages } => {
            let document_id = match parse_document_id(document_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            let mut parsed_stages = Vec::with_capacity(stages.len());
            for name in &stages {
                match Stage::parse(name) {
                    Some(stage) => parsed_stages.push(stage),
                    None => {
                        eprintln!("unknown stage: {name}");
                        return ExitCode::UsageError;
                    }
                }
            }
            match service.run_stages(document_id, &parsed_stages).await {
                Ok(outcomes) => report_outcomes(&outcomes),
                Err(e) => report_error(&e),
            }
        }
        Commands::RunAll { document_id } => {
            let document_id = match parse_document_id(document_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match service.run_all(document_id).await {
                Ok(outcomes) => report_outcomes(&outcomes),
                Err(e) => report_error(&e),
            }
        }
        Commands::SmartResume { document_id } => {
            let document_id = match parse_document_id(document_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match service.smart_resume(document_id).await {
                Ok(outcomes) => report_outcomes(&outcomes),
                Err(e) => report_error(&e),
            }
        }
        Commands::Status { document_id } => {
            let document_id = match parse_document_id(document_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match service.stage_status(document_id).await {
                Ok(rows) => {
                    for row in rows {
                        println!("{:<24} {:?} {}%", row.stage().as_str(), row.status(), row.progress_percent());
                    }
                    ExitCode::Success
                }
                Err(e) => report_error(&e),
            }
        }
        Commands::ListStages => {
            for stage in service.list_stages() {
                println!("{}", stage.as_str());
            }
            ExitCode::Success
        }
    }
}

fn parse_document_id(document_id: uuid::Uuid) -> Result<DocumentId, ExitCode> {
    Ok(DocumentId::from_uuid(document_id))
}

fn parse_target(document_id: uuid::Uuid, stage: &str) -> Result<(DocumentId, Stage), ExitCode> {
    let document_id = parse_document_id(document_id)?;
    match Stage::parse(stage) {
        Some(stage) => Ok((document_id, stage)),
        None => {
            eprintln!("unknown stage: {stage}");
            Err(ExitCode::UsageError)
        }
    }
}

fn report_outcomes(outcomes: &[StageOutcome]) -> ExitCode {
    let mut saw_failure = false;
    for outcome in outcomes {
        println!(
            "{:<24} {:?} (correlation_id={})",
            outcome.stage_name, outcome.status, outcome.correlation_id
        );
        if matches!(outcome.status, StageOutcomeStatus::Failed) {
            saw_failure = true;
        }
    }
    if saw_failure {
        ExitCode::Error
    } else {
        ExitCode::Success
    }
}

fn report_error(error: &PipelineError) -> ExitCode {
    eprintln!("{error}");
    ExitCode::Software
}

fn to_process_code(code: ExitCode) -> ProcessExitCode {
    ProcessExitCode::from(code.as_i32() as u8)
}
