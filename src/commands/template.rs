use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::OutputFormat;
use crate::display::{
    SummaryLine, format_json_output, print_error, print_info, print_success, print_summary,
    print_warning,
};
use crate::error::SsmBatchError;
use crate::input::{InputShape, load_targets};
use crate::output::write_rows;
use crate::types::{ERROR_COLUMN, OutputRow, TargetRow};

pub const CANCELLED_ROW_MESSAGE: &str = "Skipped: run cancelled";

/// Template method trait for per-row batch commands
pub trait BatchCommand {
    /// Columns the input sheet must provide
    fn input_shape(&self) -> InputShape;

    /// Produce the output rows for one input row. Never fails: errors are
    /// reported as rows carrying an `Error` column.
    fn process_row(
        &self,
        target: &TargetRow,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Vec<OutputRow>>;

    /// Logged instead of writing a file when no rows were produced
    fn empty_message(&self) -> &'static str {
        "No rows to write"
    }

    /// Label for the summary table's Target column
    fn target_label(&self, target: &TargetRow, _rows: &[OutputRow]) -> String {
        target.target().to_string()
    }
}

/// Where a batch reads from and writes to
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
}

#[derive(Debug)]
pub struct BatchReport {
    pub rows: Vec<OutputRow>,
    pub written: bool,
}

/// Load the input sheet, process each row in order, then write every result
/// in one shot.
///
/// Only input problems are fatal. After cancellation the remaining rows are
/// recorded as skipped so the output still covers the whole sheet.
pub async fn run_batch<B: BatchCommand>(
    command: &B,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Result<BatchReport, SsmBatchError> {
    let targets = load_targets(&options.input, command.input_shape())?;
    print_info(&format!(
        "Loaded {} rows from '{}'",
        targets.len(),
        options.input.display()
    ));

    let mut rows = Vec::new();
    let mut summary = Vec::with_capacity(targets.len());

    for target in &targets {
        let produced = if cancel.is_cancelled() {
            vec![OutputRow::error(target, CANCELLED_ROW_MESSAGE)]
        } else {
            print_info(&format!(
                "Processing {} in account {}, region {} (row {})",
                target.target(),
                target.account_id,
                target.region,
                target.line
            ));
            command.process_row(target, cancel).await
        };

        summary.push(SummaryLine {
            account_id: target.account_id.clone(),
            region: target.region.clone(),
            target: command.target_label(target, &produced),
            error: produced
                .iter()
                .find_map(|row| row.get(ERROR_COLUMN))
                .map(str::to_string),
        });
        rows.extend(produced);
    }

    let written = match write_rows(&options.output, &rows, &options.format) {
        Ok(true) => {
            print_success(&format!(
                "Wrote {} rows to '{}'",
                rows.len(),
                options.output.display()
            ));
            true
        }
        Ok(false) => {
            print_info(command.empty_message());
            false
        }
        Err(e) => {
            print_error(&format!(
                "Error writing output to '{}': {}",
                options.output.display(),
                e
            ));
            dump_rows(&rows);
            false
        }
    };

    print_summary(&summary);

    Ok(BatchReport { rows, written })
}

/// Last resort when the output file cannot be written
fn dump_rows(rows: &[OutputRow]) {
    match format_json_output(&rows) {
        Ok(json) => {
            print_warning("Results follow on stdout as JSON");
            println!("{}", json);
        }
        Err(e) => print_error(&format!("Could not render results: {}", e)),
    }
}
