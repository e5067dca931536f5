pub mod baselines;
pub mod run;
pub mod template;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::aws::{AwsConnector, SessionSpec};
use crate::config::{self, BASELINE_SESSION_NAME, RUN_SESSION_NAME};
use crate::error::SsmBatchError;
use crate::wait::PollConfig;
use baselines::BaselinesCommand;
use run::RunCommand;
use template::{BatchOptions, run_batch};

/// Arguments for the run command
#[derive(Debug)]
pub struct RunArgs {
    pub role_name: String,
    pub region: Option<String>,
    pub document: String,
    pub script: String,
    pub poll: PollConfig,
}

/// Arguments for the baselines command
#[derive(Debug)]
pub struct BaselinesArgs {
    pub role_name: String,
    pub region: Option<String>,
    pub operating_systems: Vec<String>,
    pub duration_seconds: i32,
}

pub async fn run(
    options: BatchOptions,
    args: RunArgs,
    cancel: &CancellationToken,
) -> Result<(), SsmBatchError> {
    crate::display::print_info("Running script across accounts and instances from the input sheet");

    let command = RunCommand {
        connector: AwsConnector::new(args.region).await,
        session: SessionSpec::new(args.role_name, RUN_SESSION_NAME),
        document: args.document,
        script: args.script,
        poll: args.poll,
    };

    let report = run_batch(&command, &options, cancel).await?;
    debug!(rows = report.rows.len(), written = report.written, "Batch finished");
    Ok(())
}

pub async fn baselines(
    options: BatchOptions,
    args: BaselinesArgs,
    cancel: &CancellationToken,
) -> Result<(), SsmBatchError> {
    crate::display::print_info("Fetching patch baselines across accounts from the input sheet");

    let command = BaselinesCommand {
        connector: AwsConnector::new(args.region).await,
        session: SessionSpec::new(args.role_name, BASELINE_SESSION_NAME)
            .with_duration(args.duration_seconds),
        operating_systems: args.operating_systems,
    };

    let report = run_batch(&command, &options, cancel).await?;
    debug!(rows = report.rows.len(), written = report.written, "Batch finished");
    Ok(())
}

/// Validate the baseline session duration accepted by STS
pub fn session_duration(seconds: i32) -> Result<i32, SsmBatchError> {
    if !(900..=43_200).contains(&seconds) {
        return Err(SsmBatchError::InvalidArgument(format!(
            "--duration must be between 900 and 43200 seconds, got {}",
            seconds
        )));
    }
    Ok(seconds)
}

/// Default paths for the run command
pub fn run_paths(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: &crate::OutputFormat,
) -> BatchOptions {
    BatchOptions {
        input: input.unwrap_or_else(|| PathBuf::from(config::DEFAULT_RUN_INPUT)),
        output: config::output_path(output, config::DEFAULT_RUN_OUTPUT_STEM, format),
        format: format.clone(),
    }
}

/// Default paths for the baselines command
pub fn baseline_paths(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: &crate::OutputFormat,
) -> BatchOptions {
    BatchOptions {
        input: input.unwrap_or_else(|| PathBuf::from(config::DEFAULT_BASELINE_INPUT)),
        output: config::output_path(output, config::DEFAULT_BASELINE_OUTPUT_STEM, format),
        format: format.clone(),
    }
}
