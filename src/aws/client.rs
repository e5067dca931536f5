use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ssm::config::Credentials;

use crate::types::AssumedCredentials;

/// Region used for STS when neither the flag nor the environment names one
const FALLBACK_REGION: &str = "us-east-1";

/// Load the caller's AWS configuration with the default credential provider chain
///
/// This will try to load credentials from:
/// 1. Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
/// 2. ~/.aws/credentials file
/// 3. IAM role (when running on EC2, ECS, Lambda, etc.)
pub async fn load_base_config(region: Option<String>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::new(FALLBACK_REGION));

    aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await
}

/// Build an SSM client for `region` that signs with assumed-role credentials
pub fn ssm_client_for(
    base: &SdkConfig,
    credentials: &AssumedCredentials,
    region: &str,
) -> aws_sdk_ssm::Client {
    let provider = Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        Some(credentials.session_token.clone()),
        credentials.expires_at,
        "ssmbatch-assumed-role",
    );

    let config = aws_sdk_ssm::config::Builder::from(base)
        .credentials_provider(provider)
        .region(Region::new(region.to_string()))
        .build();

    aws_sdk_ssm::Client::from_conf(config)
}
