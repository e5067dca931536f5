use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum SsmBatchError {
    Io(io::Error),
    Csv(csv::Error),
    SerdeJson(serde_json::Error),
    Spreadsheet(String),
    InputNotFound(String),
    MissingColumn(String),
    InvalidArgument(String),
    ParseError(String),
    AwsError(String),
    Timeout(Duration),
    Cancelled,
}

impl fmt::Display for SsmBatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SsmBatchError::Io(e) => write!(f, "IO error: {}", e),
            SsmBatchError::Csv(e) => write!(f, "CSV error: {}", e),
            SsmBatchError::SerdeJson(e) => write!(f, "JSON serialization error: {}", e),
            SsmBatchError::Spreadsheet(msg) => write!(f, "Spreadsheet error: {}", msg),
            SsmBatchError::InputNotFound(path) => write!(
                f,
                "The input file '{}' was not found. Provide the full path with --input",
                path
            ),
            SsmBatchError::MissingColumn(column) => {
                write!(f, "Input file is missing required column '{}'", column)
            }
            SsmBatchError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            SsmBatchError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SsmBatchError::AwsError(msg) => write!(f, "AWS error: {}", msg),
            SsmBatchError::Timeout(after) => write!(f, "timed out after {:?}", after),
            SsmBatchError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl Error for SsmBatchError {}

impl From<io::Error> for SsmBatchError {
    fn from(error: io::Error) -> Self {
        SsmBatchError::Io(error)
    }
}

impl From<csv::Error> for SsmBatchError {
    fn from(error: csv::Error) -> Self {
        SsmBatchError::Csv(error)
    }
}

impl From<serde_json::Error> for SsmBatchError {
    fn from(error: serde_json::Error) -> Self {
        SsmBatchError::SerdeJson(error)
    }
}

impl From<calamine::Error> for SsmBatchError {
    fn from(error: calamine::Error) -> Self {
        SsmBatchError::Spreadsheet(error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SsmBatchError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        SsmBatchError::Spreadsheet(error.to_string())
    }
}
