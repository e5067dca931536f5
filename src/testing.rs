//! In-memory fakes for the AWS seams, shared by command tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::aws::{Connector, SessionSpec, SsmOperations};
use crate::error::SsmBatchError;
use crate::types::{
    BaselineDetail, BaselineIdentity, BaselinePage, CommandInvocation, CommandStatus, TargetRow,
};

pub fn instance_row(account_id: &str, region: &str, instance_id: &str) -> TargetRow {
    TargetRow {
        line: 1,
        account_id: account_id.to_string(),
        region: region.to_string(),
        instance_id: Some(instance_id.to_string()),
    }
}

pub fn account_row(account_id: &str, region: &str) -> TargetRow {
    TargetRow {
        line: 1,
        account_id: account_id.to_string(),
        region: region.to_string(),
        instance_id: None,
    }
}

pub fn invocation(status: &str, stdout: Option<&str>, stderr: Option<&str>) -> CommandInvocation {
    CommandInvocation {
        status: CommandStatus::from(status),
        standard_output: stdout.map(str::to_string),
        standard_error: stderr.map(str::to_string),
    }
}

pub fn identity(id: &str, name: &str, os: Option<&str>, default: Option<bool>) -> BaselineIdentity {
    BaselineIdentity {
        baseline_id: id.to_string(),
        baseline_name: name.to_string(),
        operating_system: os.map(str::to_string),
        default_baseline: default,
    }
}

#[derive(Default)]
pub struct FakeSsmState {
    /// Successive GetCommandInvocation replies; the last one repeats
    pub invocations: VecDeque<Option<CommandInvocation>>,
    pub send_error: Option<String>,
    pub poll_error: Option<String>,
    pub sent: Vec<(String, String, String)>,
    pub cancelled: Vec<(String, String)>,
    pub polls: usize,

    /// Pages keyed by the token that requests them; `None` is the first page
    pub pages: HashMap<Option<String>, BaselinePage>,
    pub details: HashMap<String, BaselineDetail>,
    pub describe_error: Option<String>,
    pub detail_error: Option<String>,
    pub os_filters: Vec<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct FakeSsm {
    pub state: Arc<Mutex<FakeSsmState>>,
}

impl FakeSsm {
    pub fn with_invocations(replies: Vec<Option<CommandInvocation>>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().invocations = replies.into();
        fake
    }

    pub fn with_baselines(
        pages: Vec<(Option<&str>, BaselinePage)>,
        details: Vec<(&str, Vec<Option<i32>>)>,
    ) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            for (token, page) in pages {
                state.pages.insert(token.map(str::to_string), page);
            }
            for (id, days) in details {
                state.details.insert(
                    id.to_string(),
                    BaselineDetail {
                        approve_after_days: days,
                    },
                );
            }
        }
        fake
    }
}

impl SsmOperations for FakeSsm {
    async fn send_command(
        &self,
        instance_id: &str,
        document: &str,
        script: &str,
    ) -> Result<String, SsmBatchError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = &state.send_error {
            return Err(SsmBatchError::AwsError(error.clone()));
        }
        state.sent.push((
            instance_id.to_string(),
            document.to_string(),
            script.to_string(),
        ));
        Ok(format!("cmd-{}", state.sent.len()))
    }

    async fn get_command_invocation(
        &self,
        _command_id: &str,
        _instance_id: &str,
    ) -> Result<Option<CommandInvocation>, SsmBatchError> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        if let Some(error) = &state.poll_error {
            return Err(SsmBatchError::AwsError(error.clone()));
        }
        if state.invocations.len() > 1 {
            Ok(state.invocations.pop_front().flatten())
        } else {
            Ok(state.invocations.front().cloned().flatten())
        }
    }

    async fn cancel_command(&self, command_id: &str, instance_id: &str) -> Result<(), SsmBatchError> {
        self.state
            .lock()
            .unwrap()
            .cancelled
            .push((command_id.to_string(), instance_id.to_string()));
        Ok(())
    }

    async fn describe_patch_baselines(
        &self,
        operating_systems: &[String],
        next_token: Option<String>,
    ) -> Result<BaselinePage, SsmBatchError> {
        let mut state = self.state.lock().unwrap();
        state.os_filters.push(operating_systems.to_vec());
        if let Some(error) = &state.describe_error {
            return Err(SsmBatchError::AwsError(error.clone()));
        }
        Ok(state.pages.get(&next_token).cloned().unwrap_or_default())
    }

    async fn get_patch_baseline(&self, baseline_id: &str) -> Result<BaselineDetail, SsmBatchError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = &state.detail_error {
            return Err(SsmBatchError::AwsError(error.clone()));
        }
        Ok(state.details.get(baseline_id).cloned().unwrap_or_default())
    }
}

/// Hands out the same fake SSM session for every account not marked as denied
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub ssm: FakeSsm,
    pub denied_accounts: HashSet<String>,
    pub sessions: Arc<Mutex<Vec<(String, String, SessionSpec)>>>,
}

impl FakeConnector {
    pub fn new(ssm: FakeSsm) -> Self {
        Self {
            ssm,
            ..Self::default()
        }
    }

    pub fn deny(mut self, account_id: &str) -> Self {
        self.denied_accounts.insert(account_id.to_string());
        self
    }
}

impl Connector for FakeConnector {
    type Ssm = FakeSsm;

    async fn connect(
        &self,
        account_id: &str,
        region: &str,
        session: &SessionSpec,
    ) -> Result<FakeSsm, SsmBatchError> {
        self.sessions.lock().unwrap().push((
            account_id.to_string(),
            region.to_string(),
            session.clone(),
        ));
        if self.denied_accounts.contains(account_id) {
            return Err(SsmBatchError::AwsError(format!(
                "AccessDenied: not authorized to perform sts:AssumeRole on account {}",
                account_id
            )));
        }
        Ok(self.ssm.clone())
    }
}
