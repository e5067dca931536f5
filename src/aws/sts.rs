//! Role assumption into target accounts

use aws_sdk_sts::error::DisplayErrorContext;
use std::time::SystemTime;
use tracing::debug;

use crate::error::SsmBatchError;
use crate::types::AssumedCredentials;
use crate::validation::role_arn;

/// How to assume the role in each target account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub role_name: String,
    pub session_name: String,
    /// Requested credential lifetime; STS applies its own default when unset
    pub duration_seconds: Option<i32>,
}

impl SessionSpec {
    pub fn new(role_name: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            session_name: session_name.into(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, seconds: i32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// Exchange the caller's identity for short-lived credentials in `account_id`
pub async fn assume_role(
    client: &aws_sdk_sts::Client,
    account_id: &str,
    session: &SessionSpec,
) -> Result<AssumedCredentials, SsmBatchError> {
    let arn = role_arn(account_id, &session.role_name);
    debug!(role_arn = %arn, session = %session.session_name, "Assuming role");

    let response = client
        .assume_role()
        .role_arn(&arn)
        .role_session_name(&session.session_name)
        .set_duration_seconds(session.duration_seconds)
        .send()
        .await
        .map_err(|e| {
            SsmBatchError::AwsError(format!(
                "Failed to assume role {}: {}",
                arn,
                DisplayErrorContext(&e)
            ))
        })?;

    let credentials = response.credentials().ok_or_else(|| {
        SsmBatchError::AwsError(format!("AssumeRole for {} returned no credentials", arn))
    })?;

    Ok(AssumedCredentials {
        access_key_id: credentials.access_key_id().to_string(),
        secret_access_key: credentials.secret_access_key().to_string(),
        session_token: credentials.session_token().to_string(),
        expires_at: SystemTime::try_from(*credentials.expiration()).ok(),
    })
}
