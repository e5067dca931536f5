use rust_xlsxwriter::Workbook;
use std::path::Path;

use crate::OutputFormat;
use crate::display::format_json_output;
use crate::error::SsmBatchError;
use crate::fs_utils::write_file_atomic;
use crate::types::OutputRow;

/// Union of all row columns in first-seen order
pub fn collect_columns(rows: &[OutputRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

/// Render rows as CSV. Cells for columns a row lacks are left empty.
pub fn render_csv(rows: &[OutputRow]) -> Result<Vec<u8>, SsmBatchError> {
    let columns = collect_columns(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))?;
    }

    writer
        .into_inner()
        .map_err(|e| SsmBatchError::Io(std::io::Error::other(e.to_string())))
}

/// Render rows as a single-sheet workbook. Missing cells stay empty.
pub fn render_xlsx(rows: &[OutputRow]) -> Result<Vec<u8>, SsmBatchError> {
    let columns = collect_columns(rows);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string(0, sheet_column(col)?, name)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let sheet_row = u32::try_from(index + 1)
            .map_err(|_| SsmBatchError::Spreadsheet("too many rows for a worksheet".to_string()))?;
        for (col, name) in columns.iter().enumerate() {
            if let Some(value) = row.get(name) {
                sheet.write_string(sheet_row, sheet_column(col)?, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_column(index: usize) -> Result<u16, SsmBatchError> {
    u16::try_from(index)
        .map_err(|_| SsmBatchError::Spreadsheet("too many columns for a worksheet".to_string()))
}

/// Write all rows to `path` in one shot.
///
/// Returns `Ok(false)` without touching the filesystem when there is nothing
/// to write.
pub fn write_rows(
    path: &Path,
    rows: &[OutputRow],
    format: &OutputFormat,
) -> Result<bool, SsmBatchError> {
    if rows.is_empty() {
        return Ok(false);
    }

    let contents = match format {
        OutputFormat::Csv => render_csv(rows)?,
        OutputFormat::Json => format_json_output(&rows)?.into_bytes(),
        OutputFormat::Xlsx => render_xlsx(rows)?,
    };

    write_file_atomic(path, &contents)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn row(pairs: &[(&str, &str)]) -> OutputRow {
        let mut row = OutputRow::new();
        for (k, v) in pairs {
            row.insert(*k, *v);
        }
        row
    }

    #[test]
    fn test_columns_union_in_first_seen_order() {
        let rows = vec![
            row(&[("AccountID", "1"), ("Region", "r"), ("OS_Name", "Windows")]),
            row(&[("AccountID", "2"), ("Region", "r"), ("Error", "boom")]),
        ];
        assert_eq!(
            collect_columns(&rows),
            vec!["AccountID", "Region", "OS_Name", "Error"]
        );
    }

    #[test]
    fn test_csv_fills_missing_cells() {
        let rows = vec![
            row(&[("AccountID", "1"), ("OS_Name", "Windows, Server")]),
            row(&[("AccountID", "2"), ("Error", "line1\nline2")]),
        ];
        let csv = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "AccountID,OS_Name,Error\n1,\"Windows, Server\",\n2,,\"line1\nline2\"\n"
        );
    }

    #[test]
    fn test_empty_rows_write_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let written = write_rows(&path, &[], &OutputFormat::Csv).unwrap();
        assert!(!written);
        assert!(!path.exists());
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let rows = vec![row(&[("AccountID", "1"), ("Region", "us-east-1")])];

        assert!(write_rows(&path, &rows, &OutputFormat::Json).unwrap());
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["AccountID"], "1");
        assert_eq!(parsed[0]["Region"], "us-east-1");
    }

    #[test]
    fn test_xlsx_output() {
        use calamine::{Data, Reader, open_workbook_auto};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let rows = vec![
            row(&[("AccountID", "011111111111"), ("Region", "us-east-1"), ("CPU_Count", "4")]),
            row(&[("AccountID", "222222222222"), ("Region", "eu-west-1"), ("Error", "boom")]),
        ];

        assert!(write_rows(&path, &rows, &OutputFormat::Xlsx).unwrap());

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let text = |r: u32, c: u32| range.get_value((r, c)).cloned().unwrap_or(Data::Empty);
        assert_eq!(text(0, 3), Data::String("Error".to_string()));
        assert_eq!(text(1, 0), Data::String("011111111111".to_string()));
        assert_eq!(text(1, 3), Data::Empty);
        assert_eq!(text(2, 3), Data::String("boom".to_string()));
    }
}
