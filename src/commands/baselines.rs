use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::aws::{Connector, SessionSpec, SsmOperations};
use crate::commands::template::BatchCommand;
use crate::display::{print_error, print_info};
use crate::error::SsmBatchError;
use crate::input::InputShape;
use crate::types::{BaselineRecord, NOT_AVAILABLE, OutputRow, TargetRow};
use crate::validation::normalize_account_id;

/// Join the approve-after-days values of all rules that set one, in rule order
pub fn format_approval_days(days: &[Option<i32>]) -> String {
    let values: Vec<String> = days.iter().flatten().map(|d| d.to_string()).collect();
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(", ")
    }
}

/// Page through every baseline for the given operating systems and fetch
/// the approval rules of each one.
pub async fn fetch_baselines<S: SsmOperations>(
    ssm: &S,
    operating_systems: &[String],
) -> Result<Vec<BaselineRecord>, SsmBatchError> {
    let mut records = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = ssm
            .describe_patch_baselines(operating_systems, next_token.take())
            .await?;

        for identity in page.identities {
            let detail = ssm.get_patch_baseline(&identity.baseline_id).await?;
            debug!(
                baseline = %identity.baseline_id,
                rules = detail.approve_after_days.len(),
                "Fetched baseline"
            );

            records.push(BaselineRecord {
                baseline_id: identity.baseline_id,
                baseline_name: identity.baseline_name,
                operating_system: identity
                    .operating_system
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                default_baseline: identity.default_baseline.unwrap_or(false),
                approval_days: format_approval_days(&detail.approve_after_days),
            });
        }

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Ok(records)
}

/// Lists patch baselines for every account/region in the sheet
pub struct BaselinesCommand<C: Connector> {
    pub connector: C,
    pub session: SessionSpec,
    pub operating_systems: Vec<String>,
}

impl<C: Connector> BaselinesCommand<C> {
    pub async fn baselines_for(&self, target: &TargetRow) -> Vec<OutputRow> {
        if normalize_account_id(&target.account_id).is_none() {
            let message = format!(
                "Invalid account id '{}': expected 12 digits",
                target.account_id
            );
            print_error(&message);
            return vec![OutputRow::error(target, message)];
        }

        let ssm = match self
            .connector
            .connect(&target.account_id, &target.region, &self.session)
            .await
        {
            Ok(ssm) => ssm,
            Err(e) => {
                let message = format!("Error assuming role in account {}: {}", target.account_id, e);
                print_error(&message);
                return vec![OutputRow::error(target, message)];
            }
        };

        match fetch_baselines(&ssm, &self.operating_systems).await {
            Ok(records) => {
                print_info(&format!(
                    "Found {} patch baselines in account {}, region {}",
                    records.len(),
                    target.account_id,
                    target.region
                ));
                records
                    .into_iter()
                    .map(|record| record.into_row(target))
                    .collect()
            }
            Err(e) => {
                let message = format!(
                    "Error fetching patch baselines in region {}: {}",
                    target.region, e
                );
                print_error(&message);
                vec![OutputRow::error(target, message)]
            }
        }
    }
}

impl<C: Connector> BatchCommand for BaselinesCommand<C> {
    fn input_shape(&self) -> InputShape {
        InputShape::AccountRegion
    }

    async fn process_row(&self, target: &TargetRow, _cancel: &CancellationToken) -> Vec<OutputRow> {
        self.baselines_for(target).await
    }

    fn empty_message(&self) -> &'static str {
        "No patch baseline details found."
    }

    fn target_label(&self, _target: &TargetRow, rows: &[OutputRow]) -> String {
        let found = rows.iter().filter(|row| !row.is_error()).count();
        format!("{} baselines", found)
    }
}
