use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::PatchOrchestratorFilter;
use std::future::Future;

use crate::error::SsmBatchError;
use crate::types::{
    BaselineDetail, BaselineIdentity, BaselinePage, CommandInvocation, CommandStatus,
};

/// Filter key for `DescribePatchBaselines`
const OPERATING_SYSTEM_FILTER: &str = "OPERATING_SYSTEM";

/// SSM calls used by the batch commands.
///
/// This trait abstracts the SSM client so the command and baseline logic can
/// be exercised without hitting real AWS.
pub trait SsmOperations: Send + Sync {
    /// Run `script` through `document` on a single instance; returns the command id
    fn send_command(
        &self,
        instance_id: &str,
        document: &str,
        script: &str,
    ) -> impl Future<Output = Result<String, SsmBatchError>> + Send;

    /// Current state of a command on one instance.
    ///
    /// `None` means SSM has not registered the invocation yet, which happens
    /// for a short while after `send_command`.
    fn get_command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> impl Future<Output = Result<Option<CommandInvocation>, SsmBatchError>> + Send;

    fn cancel_command(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> impl Future<Output = Result<(), SsmBatchError>> + Send;

    /// One page of baseline identities for the given operating systems
    fn describe_patch_baselines(
        &self,
        operating_systems: &[String],
        next_token: Option<String>,
    ) -> impl Future<Output = Result<BaselinePage, SsmBatchError>> + Send;

    fn get_patch_baseline(
        &self,
        baseline_id: &str,
    ) -> impl Future<Output = Result<BaselineDetail, SsmBatchError>> + Send;
}

impl SsmOperations for Client {
    async fn send_command(
        &self,
        instance_id: &str,
        document: &str,
        script: &str,
    ) -> Result<String, SsmBatchError> {
        let response = self
            .send_command()
            .instance_ids(instance_id)
            .document_name(document)
            .parameters("commands", vec![script.to_string()])
            .send()
            .await
            .map_err(|e| {
                SsmBatchError::AwsError(format!(
                    "Failed to send command: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        response
            .command()
            .and_then(|c| c.command_id())
            .map(str::to_string)
            .ok_or_else(|| SsmBatchError::AwsError("SendCommand returned no command id".to_string()))
    }

    async fn get_command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<Option<CommandInvocation>, SsmBatchError> {
        let response = self
            .get_command_invocation()
            .command_id(command_id)
            .instance_id(instance_id)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_invocation_does_not_exist()) =>
            {
                return Ok(None);
            }
            Err(e) => {
                return Err(SsmBatchError::AwsError(format!(
                    "Failed to get command invocation: {}",
                    DisplayErrorContext(&e)
                )));
            }
        };

        let status = output
            .status()
            .map(|s| CommandStatus::from(s.as_str()))
            .unwrap_or(CommandStatus::Pending);

        Ok(Some(CommandInvocation {
            status,
            standard_output: output.standard_output_content().map(str::to_string),
            standard_error: output.standard_error_content().map(str::to_string),
        }))
    }

    async fn cancel_command(&self, command_id: &str, instance_id: &str) -> Result<(), SsmBatchError> {
        self.cancel_command()
            .command_id(command_id)
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| {
                SsmBatchError::AwsError(format!(
                    "Failed to cancel command {}: {}",
                    command_id,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn describe_patch_baselines(
        &self,
        operating_systems: &[String],
        next_token: Option<String>,
    ) -> Result<BaselinePage, SsmBatchError> {
        let filter = PatchOrchestratorFilter::builder()
            .key(OPERATING_SYSTEM_FILTER)
            .set_values(Some(operating_systems.to_vec()))
            .build();

        let response = self
            .describe_patch_baselines()
            .filters(filter)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                SsmBatchError::AwsError(format!(
                    "Failed to describe patch baselines: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let identities = response
            .baseline_identities()
            .iter()
            .filter_map(|identity| {
                Some(BaselineIdentity {
                    baseline_id: identity.baseline_id()?.to_string(),
                    baseline_name: identity.baseline_name().unwrap_or_default().to_string(),
                    operating_system: identity.operating_system().map(|os| os.as_str().to_string()),
                    default_baseline: Some(identity.default_baseline()),
                })
            })
            .collect();

        Ok(BaselinePage {
            identities,
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn get_patch_baseline(&self, baseline_id: &str) -> Result<BaselineDetail, SsmBatchError> {
        let response = self
            .get_patch_baseline()
            .baseline_id(baseline_id)
            .send()
            .await
            .map_err(|e| {
                SsmBatchError::AwsError(format!(
                    "Failed to get patch baseline {}: {}",
                    baseline_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        let approve_after_days = response
            .approval_rules()
            .map(|group| {
                group
                    .patch_rules()
                    .iter()
                    .map(|rule| rule.approve_after_days())
                    .collect()
            })
            .unwrap_or_default();

        Ok(BaselineDetail { approve_after_days })
    }
}
