use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub const ACCOUNT_ID_COLUMN: &str = "AccountID";
pub const REGION_COLUMN: &str = "Region";
pub const INSTANCE_ID_COLUMN: &str = "InstanceID";
pub const ERROR_COLUMN: &str = "Error";
pub const COMMAND_OUTPUT_COLUMN: &str = "CommandOutput";

pub const NOT_AVAILABLE: &str = "N/A";

/// One line of the input sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRow {
    /// 1-based data line number in the input file, used in log lines
    pub line: usize,
    pub account_id: String,
    pub region: String,
    pub instance_id: Option<String>,
}

impl TargetRow {
    pub fn identity(&self) -> OutputRow {
        let mut row = OutputRow::new();
        row.insert(ACCOUNT_ID_COLUMN, &self.account_id);
        row.insert(REGION_COLUMN, &self.region);
        if let Some(instance_id) = &self.instance_id {
            row.insert(INSTANCE_ID_COLUMN, instance_id);
        }
        row
    }

    /// Short label for log lines and the summary table
    pub fn target(&self) -> &str {
        self.instance_id.as_deref().unwrap_or(&self.region)
    }
}

/// Temporary credentials from a role assumption. Never persisted.
#[derive(Clone)]
pub struct AssumedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: Option<std::time::SystemTime>,
}

impl fmt::Debug for AssumedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of a Run Command invocation on a single instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Cancelled,
    Cancelling,
    TimedOut,
    Failed,
    Other(String),
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Success
                | CommandStatus::Failed
                | CommandStatus::Cancelled
                | CommandStatus::TimedOut
        )
    }
}

impl From<&str> for CommandStatus {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => CommandStatus::Pending,
            "InProgress" => CommandStatus::InProgress,
            "Delayed" => CommandStatus::Delayed,
            "Success" => CommandStatus::Success,
            "Cancelled" => CommandStatus::Cancelled,
            "Cancelling" => CommandStatus::Cancelling,
            "TimedOut" => CommandStatus::TimedOut,
            "Failed" => CommandStatus::Failed,
            other => CommandStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Pending => "Pending",
            CommandStatus::InProgress => "InProgress",
            CommandStatus::Delayed => "Delayed",
            CommandStatus::Success => "Success",
            CommandStatus::Cancelled => "Cancelled",
            CommandStatus::Cancelling => "Cancelling",
            CommandStatus::TimedOut => "TimedOut",
            CommandStatus::Failed => "Failed",
            CommandStatus::Other(other) => other,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub status: CommandStatus,
    pub standard_output: Option<String>,
    pub standard_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineIdentity {
    pub baseline_id: String,
    pub baseline_name: String,
    pub operating_system: Option<String>,
    pub default_baseline: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BaselinePage {
    pub identities: Vec<BaselineIdentity>,
    pub next_token: Option<String>,
}

/// Approval rules of a baseline, one entry per rule in document order
#[derive(Debug, Clone, Default)]
pub struct BaselineDetail {
    pub approve_after_days: Vec<Option<i32>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineRecord {
    pub baseline_id: String,
    pub baseline_name: String,
    pub operating_system: String,
    pub default_baseline: bool,
    pub approval_days: String,
}

impl BaselineRecord {
    pub fn into_row(self, target: &TargetRow) -> OutputRow {
        let mut row = OutputRow::new();
        row.insert("BaselineId", self.baseline_id);
        row.insert("BaselineName", self.baseline_name);
        row.insert("OperatingSystem", self.operating_system);
        row.insert("DefaultBaseline", if self.default_baseline { "True" } else { "False" });
        row.insert("ApprovalDays", self.approval_days);
        row.insert(ACCOUNT_ID_COLUMN, &target.account_id);
        row.insert(REGION_COLUMN, &target.region);
        row
    }
}

/// A flattened result record. Column order follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRow(Map<String, Value>);

impl OutputRow {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build an identity row carrying a single `Error` column
    pub fn error(target: &TargetRow, message: impl Into<String>) -> Self {
        let mut row = target.identity();
        row.insert(ERROR_COLUMN, message.into());
        row
    }

    /// Insert or replace a column. Replacing keeps the original position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), Value::String(value.into()));
    }

    /// Merge the top-level fields of a JSON object, overriding existing columns
    pub fn merge_json(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            self.insert(key, cell_text(&value));
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.contains(ERROR_COLUMN)
    }
}

/// Render a JSON value as a single spreadsheet cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> TargetRow {
        TargetRow {
            line: 1,
            account_id: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            instance_id: Some("i-abc".to_string()),
        }
    }

    #[test]
    fn test_identity_column_order() {
        let row = target().identity();
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["AccountID", "Region", "InstanceID"]);
    }

    #[test]
    fn test_merge_json_flattens_values() {
        let mut row = target().identity();
        let Value::Object(fields) = json!({
            "ServiceStatus": "Running",
            "CPU_Count": 4,
            "Tags": ["a", "b"],
            "Missing": null
        }) else {
            unreachable!()
        };
        row.merge_json(fields);

        assert_eq!(row.get("ServiceStatus"), Some("Running"));
        assert_eq!(row.get("CPU_Count"), Some("4"));
        assert_eq!(row.get("Tags"), Some(r#"["a","b"]"#));
        assert_eq!(row.get("Missing"), Some(""));
        assert_eq!(row.columns().count(), 7);
    }

    #[test]
    fn test_merge_json_overrides_in_place() {
        let mut row = target().identity();
        let Value::Object(fields) = json!({ "Region": "eu-west-1" }) else {
            unreachable!()
        };
        row.merge_json(fields);

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["AccountID", "Region", "InstanceID"]);
        assert_eq!(row.get("Region"), Some("eu-west-1"));
    }

    #[test]
    fn test_command_status_terminal_states() {
        for status in ["Success", "Failed", "Cancelled", "TimedOut"] {
            assert!(CommandStatus::from(status).is_terminal(), "{status}");
        }
        for status in ["Pending", "InProgress", "Delayed", "Cancelling", "Weird"] {
            assert!(!CommandStatus::from(status).is_terminal(), "{status}");
        }
        assert_eq!(CommandStatus::from("Weird").to_string(), "Weird");
    }

    #[test]
    fn test_baseline_record_row_layout() {
        let record = BaselineRecord {
            baseline_id: "pb-123".to_string(),
            baseline_name: "Windows".to_string(),
            operating_system: "WINDOWS".to_string(),
            default_baseline: true,
            approval_days: "7, 14".to_string(),
        };
        let row = record.into_row(&target());
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(
            columns,
            vec![
                "BaselineId",
                "BaselineName",
                "OperatingSystem",
                "DefaultBaseline",
                "ApprovalDays",
                "AccountID",
                "Region"
            ]
        );
        assert_eq!(row.get("DefaultBaseline"), Some("True"));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = AssumedCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "super-secret".to_string(),
            session_token: "token".to_string(),
            expires_at: None,
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ASIAEXAMPLE"));
        assert!(!debug.contains("super-secret"));
    }
}
