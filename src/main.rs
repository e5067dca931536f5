use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tokio_util::sync::CancellationToken;

mod aws;
mod commands;
mod config;
mod display;
mod error;
mod fs_utils;
mod input;
mod logging;
mod output;
#[cfg(test)]
mod testing;
mod types;
mod validation;
mod wait;

use error::SsmBatchError;

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Xlsx,
}

#[derive(Parser)]
#[command(name = "ssmbatch")]
#[command(about = "Run SSM commands and audit patch baselines across many AWS accounts")]
#[command(
    long_about = "ssmbatch reads an Excel workbook or CSV sheet of AccountID/Region[/InstanceID] rows, assumes a role in each account and calls AWS Systems Manager. Every row's result, including failures, is written to one output file.\n\nUsage: ssmbatch [GLOBAL_OPTIONS] <COMMAND> [COMMAND_OPTIONS]\nExample: ssmbatch --role-name System_Admin -o xlsx run --input instance.xlsx"
)]
#[command(version = env!("SSMBATCH_VERSION"))]
struct Cli {
    #[arg(
        short = 'r',
        long,
        default_value = config::DEFAULT_ROLE_NAME,
        help = "Role to assume in every target account (global option)"
    )]
    role_name: String,

    #[arg(
        long,
        help = "Region for the role-assumption call (default: from AWS config) (global option)"
    )]
    region: Option<String>,

    #[arg(
        short = 'o',
        long = "format",
        value_enum,
        default_value = "csv",
        help = "Output format: csv, json or xlsx (default: csv) (global option)"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a script on each listed instance via SSM Run Command")]
    Run {
        #[arg(
            short = 'i',
            long,
            help = "Input .xlsx or .csv with AccountID, Region and InstanceID columns (default: instance.csv)"
        )]
        input: Option<PathBuf>,
        #[arg(
            long,
            help = "Output file (default: ssm_command_output_structured.<format>)"
        )]
        output: Option<PathBuf>,
        #[arg(
            short = 'f',
            long = "script-file",
            help = "Script to run; should print a JSON object (default: built-in WinRM/OS check)"
        )]
        script_file: Option<PathBuf>,
        #[arg(long, default_value = config::DEFAULT_DOCUMENT, help = "SSM document to run the script with")]
        document: String,
        #[arg(
            long = "poll-interval",
            default_value_t = config::DEFAULT_POLL_INTERVAL_SECS,
            help = "Seconds before the first status check"
        )]
        poll_interval: u64,
        #[arg(
            long = "max-poll-interval",
            default_value_t = config::DEFAULT_MAX_POLL_INTERVAL_SECS,
            help = "Upper bound in seconds for the growing delay between status checks"
        )]
        max_poll_interval: u64,
        #[arg(
            long,
            default_value_t = config::DEFAULT_TIMEOUT_SECS,
            help = "Seconds to wait for a command before cancelling it"
        )]
        timeout: u64,
    },

    #[command(about = "List patch baselines and their approval days for each account/region")]
    Baselines {
        #[arg(
            short = 'i',
            long,
            help = "Input .xlsx or .csv with AccountID and Region columns (default: input.csv)"
        )]
        input: Option<PathBuf>,
        #[arg(
            long,
            help = "Output file (default: windows_patch_baseline_details.<format>)"
        )]
        output: Option<PathBuf>,
        #[arg(
            long = "os",
            default_value = config::DEFAULT_OPERATING_SYSTEMS,
            help = "Comma-separated operating systems to include"
        )]
        operating_systems: String,
        #[arg(
            long,
            default_value_t = config::BASELINE_SESSION_SECONDS,
            help = "Lifetime in seconds of the assumed-role session"
        )]
        duration: i32,
    },
}

/// Exit status for a run stopped by a second Ctrl-C
const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    /// Stop waiting and write what was collected
    Cancel,
    /// A cancel is already underway; stop immediately
    ForceExit,
}

fn on_interrupt(token: &CancellationToken) -> InterruptAction {
    if token.is_cancelled() {
        return InterruptAction::ForceExit;
    }
    token.cancel();
    InterruptAction::Cancel
}

/// Cancel `token` on the first Ctrl-C and exit on the second
fn watch_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&token) {
                InterruptAction::Cancel => display::print_warning(
                    "Interrupt received; finishing up and writing collected results (press Ctrl-C again to force exit)",
                ),
                InterruptAction::ForceExit => {
                    display::print_error("Second interrupt received; exiting without writing results");
                    process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });
}

async fn dispatch(cli: Cli, cancel: &CancellationToken) -> Result<(), SsmBatchError> {
    match cli.command {
        Commands::Run {
            input,
            output,
            script_file,
            document,
            poll_interval,
            max_poll_interval,
            timeout,
        } => {
            let args = commands::RunArgs {
                role_name: cli.role_name,
                region: cli.region,
                document,
                script: config::load_script(script_file.as_deref())?,
                poll: config::poll_config(poll_interval, max_poll_interval, timeout)?,
            };
            let options = commands::run_paths(input, output, &cli.format);
            commands::run(options, args, cancel).await
        }
        Commands::Baselines {
            input,
            output,
            operating_systems,
            duration,
        } => {
            let args = commands::BaselinesArgs {
                role_name: cli.role_name,
                region: cli.region,
                operating_systems: config::parse_operating_systems(&operating_systems)?,
                duration_seconds: commands::session_duration(duration)?,
            };
            let options = commands::baseline_paths(input, output, &cli.format);
            commands::baselines(options, args, cancel).await
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    if let Err(e) = dispatch(cli, &cancel).await {
        tracing::error!("{}", e);
        process::exit(1);
    }
}
