use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use crate::display::print_warning;
use crate::error::SsmBatchError;
use crate::types::{ACCOUNT_ID_COLUMN, INSTANCE_ID_COLUMN, REGION_COLUMN, TargetRow};
use crate::validation::normalize_account_id;

/// Which columns a subcommand needs from the input sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// AccountID, Region
    AccountRegion,
    /// AccountID, Region, InstanceID
    AccountRegionInstance,
}

impl InputShape {
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            InputShape::AccountRegion => &[ACCOUNT_ID_COLUMN, REGION_COLUMN],
            InputShape::AccountRegionInstance => {
                &[ACCOUNT_ID_COLUMN, REGION_COLUMN, INSTANCE_ID_COLUMN]
            }
        }
    }
}

/// Extensions read as Excel workbooks; anything else is parsed as CSV
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// Header cells and data rows of the first sheet, as text
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn read_csv(path: &Path) -> Result<Table, SsmBatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| -> Result<Vec<String>, SsmBatchError> {
            Ok(record?.iter().map(str::to_string).collect())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Table { headers, rows })
}

/// Workbooks store account ids as numbers; whole floats lose their `.0`
fn workbook_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn read_workbook(path: &Path) -> Result<Table, SsmBatchError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        SsmBatchError::Spreadsheet(format!("'{}' contains no worksheets", path.display()))
    })??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();

    Ok(Table {
        headers,
        rows: rows.collect(),
    })
}

/// Load target rows from the first sheet of an Excel workbook or from a CSV
/// file, both with a header row.
///
/// Fails before any row is returned when the file is missing or a required
/// column is absent. Blank rows are skipped; every other row is returned
/// as-is so that it produces exactly one result downstream.
pub fn load_targets(path: &Path, shape: InputShape) -> Result<Vec<TargetRow>, SsmBatchError> {
    if !path.exists() {
        return Err(SsmBatchError::InputNotFound(path.display().to_string()));
    }

    let table = if is_workbook(path) {
        read_workbook(path)?
    } else {
        read_csv(path)?
    };

    let column_index = |name: &str| -> Result<usize, SsmBatchError> {
        table
            .headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .ok_or_else(|| SsmBatchError::MissingColumn(name.to_string()))
    };

    let columns = shape
        .required_columns()
        .iter()
        .map(|name| column_index(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut targets = Vec::new();
    for (index, record) in table.rows.iter().enumerate() {
        let line = index + 1;
        let cell = |i: usize| {
            record
                .get(columns[i])
                .map(String::as_str)
                .unwrap_or("")
                .to_string()
        };

        let account = cell(0);
        let region = cell(1);
        let instance_id = match shape {
            InputShape::AccountRegion => None,
            InputShape::AccountRegionInstance => Some(cell(2)),
        };

        if account.is_empty()
            && region.is_empty()
            && instance_id.as_deref().is_none_or(str::is_empty)
        {
            print_warning(&format!("Skipping blank row {}", line));
            continue;
        }

        targets.push(TargetRow {
            line,
            account_id: normalize_account_id(&account).unwrap_or(account),
            region,
            instance_id,
        });
    }

    Ok(targets)
}
