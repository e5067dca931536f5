use serde_json::{Map, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aws::{Connector, SessionSpec, SsmOperations};
use crate::commands::template::BatchCommand;
use crate::display::print_error;
use crate::error::SsmBatchError;
use crate::input::InputShape;
use crate::types::{
    COMMAND_OUTPUT_COLUMN, CommandInvocation, CommandStatus, ERROR_COLUMN, OutputRow, TargetRow,
};
use crate::validation::normalize_account_id;
use crate::wait::{PollConfig, poll_until};

const NO_ERROR_CONTENT: &str = "No error content available";

/// How a dispatched command ended, before it is flattened into a row
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Success with a JSON object on stdout
    Fields(Map<String, Value>),
    /// Success with valid JSON that is not an object
    Value(Value),
    /// Success but stdout is not JSON
    Unparseable { error: String, raw: String },
    /// Terminal status other than Success
    Failed {
        status: CommandStatus,
        stderr: Option<String>,
    },
    /// No terminal status before the poll timeout
    TimedOut { command_id: String, after: Duration },
    /// The batch was interrupted while waiting
    Cancelled { command_id: String },
}

impl CommandOutcome {
    /// Interpret a terminal invocation
    pub fn from_invocation(invocation: CommandInvocation) -> Self {
        if invocation.status != CommandStatus::Success {
            return CommandOutcome::Failed {
                status: invocation.status,
                stderr: invocation.standard_error,
            };
        }

        let raw = invocation.standard_output.unwrap_or_default();
        // PowerShell can prefix its output with a byte order mark
        match serde_json::from_str::<Value>(raw.trim_start_matches('\u{feff}')) {
            Ok(Value::Object(fields)) => CommandOutcome::Fields(fields),
            Ok(other) => CommandOutcome::Value(other),
            Err(e) => CommandOutcome::Unparseable {
                error: e.to_string(),
                raw,
            },
        }
    }

    pub fn into_row(self, target: &TargetRow) -> OutputRow {
        let instance_id = target.instance_id.as_deref().unwrap_or_default();
        match self {
            CommandOutcome::Fields(fields) => {
                let mut row = target.identity();
                row.merge_json(fields);
                row
            }
            CommandOutcome::Value(value) => {
                let mut row = target.identity();
                row.insert(COMMAND_OUTPUT_COLUMN, value.to_string());
                row
            }
            CommandOutcome::Unparseable { error, raw } => OutputRow::error(
                target,
                format!(
                    "Error parsing JSON output from instance {}: {}\nRaw output:\n{}",
                    instance_id, error, raw
                ),
            ),
            CommandOutcome::Failed { status, stderr } => {
                warn!("Command on {} ended with status {}", instance_id, status);
                OutputRow::error(
                    target,
                    format!(
                        "SSM command failed or timed out for instance {}.\nError: {}",
                        instance_id,
                        stderr
                            .filter(|s| !s.trim().is_empty())
                            .as_deref()
                            .unwrap_or(NO_ERROR_CONTENT)
                    ),
                )
            }
            CommandOutcome::TimedOut { command_id, after } => OutputRow::error(
                target,
                format!(
                    "Timed out waiting for command {} on instance {} after {:?}",
                    command_id, instance_id, after
                ),
            ),
            CommandOutcome::Cancelled { command_id } => OutputRow::error(
                target,
                format!(
                    "Cancelled while waiting for command {} on instance {}",
                    command_id, instance_id
                ),
            ),
        }
    }
}

/// Runs one script on every instance listed in the sheet
pub struct RunCommand<C: Connector> {
    pub connector: C,
    pub session: SessionSpec,
    pub document: String,
    pub script: String,
    pub poll: PollConfig,
}

impl<C: Connector> RunCommand<C> {
    /// Assume the role, dispatch the script and wait for a terminal status
    pub async fn execute(
        &self,
        target: &TargetRow,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, SsmBatchError> {
        let ssm = self
            .connector
            .connect(&target.account_id, &target.region, &self.session)
            .await?;

        info!(
            "Running {} on instance {} in account {}, region {}...",
            self.document, instance_id, target.account_id, target.region
        );
        let command_id = ssm
            .send_command(instance_id, &self.document, &self.script)
            .await?;

        let waited = poll_until(
            &self.poll,
            cancel,
            || check_invocation(&ssm, &command_id, instance_id),
            &command_id,
        )
        .await;

        match waited {
            Ok(invocation) => Ok(CommandOutcome::from_invocation(invocation)),
            Err(SsmBatchError::Timeout(after)) => {
                cancel_quietly(&ssm, &command_id, instance_id).await;
                Ok(CommandOutcome::TimedOut { command_id, after })
            }
            Err(SsmBatchError::Cancelled) => {
                cancel_quietly(&ssm, &command_id, instance_id).await;
                Ok(CommandOutcome::Cancelled { command_id })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn run_on_instance(&self, target: &TargetRow, cancel: &CancellationToken) -> OutputRow {
        let instance_id = target.instance_id.as_deref().unwrap_or_default();

        if normalize_account_id(&target.account_id).is_none() {
            return OutputRow::error(
                target,
                format!(
                    "Invalid account id '{}': expected 12 digits",
                    target.account_id
                ),
            );
        }
        if instance_id.is_empty() || target.region.is_empty() {
            return OutputRow::error(target, "Missing InstanceID or Region");
        }

        let row = match self.execute(target, instance_id, cancel).await {
            Ok(outcome) => outcome.into_row(target),
            Err(e) => OutputRow::error(
                target,
                format!(
                    "Error running PowerShell script on instance {} in account {}, region {}: {}",
                    instance_id, target.account_id, target.region, e
                ),
            ),
        };

        if let Some(error) = row.get(ERROR_COLUMN) {
            print_error(error);
        }
        row
    }
}

impl<C: Connector> BatchCommand for RunCommand<C> {
    fn input_shape(&self) -> InputShape {
        InputShape::AccountRegionInstance
    }

    async fn process_row(&self, target: &TargetRow, cancel: &CancellationToken) -> Vec<OutputRow> {
        vec![self.run_on_instance(target, cancel).await]
    }

    fn empty_message(&self) -> &'static str {
        "No instances processed; no output written"
    }
}

/// One status poll; yields the invocation once it is terminal
async fn check_invocation<S: SsmOperations>(
    ssm: &S,
    command_id: &str,
    instance_id: &str,
) -> Result<Option<CommandInvocation>, SsmBatchError> {
    let Some(invocation) = ssm.get_command_invocation(command_id, instance_id).await? else {
        info!("Command status for {}: not registered yet", instance_id);
        return Ok(None);
    };
    info!("Command status for {}: {}", instance_id, invocation.status);
    Ok(invocation.status.is_terminal().then_some(invocation))
}

async fn cancel_quietly<S: SsmOperations>(ssm: &S, command_id: &str, instance_id: &str) {
    if let Err(e) = ssm.cancel_command(command_id, instance_id).await {
        warn!("Could not cancel command {}: {}", command_id, e);
    }
}
