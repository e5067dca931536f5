pub mod client;
pub mod ssm;
pub mod sts;

use std::future::Future;

use crate::error::SsmBatchError;
pub use ssm::SsmOperations;
pub use sts::SessionSpec;

/// Opens an SSM session in a target account and region.
///
/// The AWS implementation assumes a role per call; tests substitute an
/// in-memory fake.
pub trait Connector: Send + Sync {
    type Ssm: SsmOperations;

    fn connect(
        &self,
        account_id: &str,
        region: &str,
        session: &SessionSpec,
    ) -> impl Future<Output = Result<Self::Ssm, SsmBatchError>> + Send;
}

/// Connector backed by STS role assumption
pub struct AwsConnector {
    base: aws_config::SdkConfig,
    sts: aws_sdk_sts::Client,
}

impl AwsConnector {
    pub async fn new(region: Option<String>) -> Self {
        let base = client::load_base_config(region).await;
        let sts = aws_sdk_sts::Client::new(&base);
        Self { base, sts }
    }
}

impl Connector for AwsConnector {
    type Ssm = aws_sdk_ssm::Client;

    async fn connect(
        &self,
        account_id: &str,
        region: &str,
        session: &SessionSpec,
    ) -> Result<Self::Ssm, SsmBatchError> {
        let credentials = sts::assume_role(&self.sts, account_id, session).await?;
        Ok(client::ssm_client_for(&self.base, &credentials, region))
    }
}
