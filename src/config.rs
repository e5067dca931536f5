use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::OutputFormat;
use crate::error::SsmBatchError;
use crate::wait::PollConfig;

pub const DEFAULT_ROLE_NAME: &str = "System_Admin";

pub const RUN_SESSION_NAME: &str = "PowerShellRunner";
pub const BASELINE_SESSION_NAME: &str = "PatchBaselineFetcher";
/// Shortest session STS allows
pub const BASELINE_SESSION_SECONDS: i32 = 900;

pub const DEFAULT_DOCUMENT: &str = "AWS-RunPowerShellScript";
pub const DEFAULT_RUN_INPUT: &str = "instance.csv";
pub const DEFAULT_RUN_OUTPUT_STEM: &str = "ssm_command_output_structured";
pub const DEFAULT_BASELINE_INPUT: &str = "input.csv";
pub const DEFAULT_BASELINE_OUTPUT_STEM: &str = "windows_patch_baseline_details";
pub const DEFAULT_OPERATING_SYSTEMS: &str = "WINDOWS,AMAZON_LINUX_2";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Script run when no --script-file is given. Emits one JSON object.
pub const DEFAULT_POWERSHELL_SCRIPT: &str = r#"
$service = Get-Service -Name "WinRM"
$systemInfo = Get-ComputerInfo -Property OsName, OsVersion, CsProcessors

$output = [PSCustomObject]@{
    "ServiceStatus" = $service.Status
    "OS_Name" = $systemInfo.OsName
    "OS_Version" = $systemInfo.OsVersion
    "CPU_Count" = $systemInfo.CsProcessors
}

$output | ConvertTo-Json
"#;

/// Resolve the output path, deriving the extension from the format when unset
pub fn output_path(explicit: Option<PathBuf>, stem: &str, format: &OutputFormat) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let extension = match format {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
        };
        PathBuf::from(format!("{}.{}", stem, extension))
    })
}

/// Read the script body from `path`, or fall back to the built-in script
pub fn load_script(path: Option<&Path>) -> Result<String, SsmBatchError> {
    let Some(path) = path else {
        return Ok(DEFAULT_POWERSHELL_SCRIPT.to_string());
    };

    let script = fs::read_to_string(path).map_err(|e| {
        SsmBatchError::InvalidArgument(format!(
            "Failed to read script file '{}': {}",
            path.display(),
            e
        ))
    })?;

    if script.trim().is_empty() {
        return Err(SsmBatchError::InvalidArgument(format!(
            "Script file '{}' is empty",
            path.display()
        )));
    }
    Ok(script)
}

/// Build the poll schedule for command status checks
pub fn poll_config(
    interval_secs: u64,
    max_interval_secs: u64,
    timeout_secs: u64,
) -> Result<PollConfig, SsmBatchError> {
    if interval_secs == 0 {
        return Err(SsmBatchError::InvalidArgument(
            "--poll-interval must be at least 1 second".to_string(),
        ));
    }
    if max_interval_secs < interval_secs {
        return Err(SsmBatchError::InvalidArgument(format!(
            "--max-poll-interval ({}) must not be smaller than --poll-interval ({})",
            max_interval_secs, interval_secs
        )));
    }
    if timeout_secs == 0 {
        return Err(SsmBatchError::InvalidArgument(
            "--timeout must be at least 1 second".to_string(),
        ));
    }

    Ok(PollConfig {
        initial_delay: Duration::from_secs(interval_secs),
        max_delay: Duration::from_secs(max_interval_secs),
        timeout: Duration::from_secs(timeout_secs),
        ..PollConfig::default()
    })
}

/// Split a comma-separated operating system list, e.g. "WINDOWS,AMAZON_LINUX_2"
pub fn parse_operating_systems(raw: &str) -> Result<Vec<String>, SsmBatchError> {
    let values: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if values.is_empty() {
        return Err(SsmBatchError::InvalidArgument(
            "--os needs at least one operating system".to_string(),
        ));
    }
    Ok(values)
}
