use serde::{Deserialize, Serialize};

use crate::import::{ImportReport, RowError};

/// Category of a rejected import row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowErrorCode {
    /// Student or course does not exist.
    Reference,
    /// A grade cell is not a number.
    Format,
    /// A grade lies outside 0-100.
    Range,
    /// Storage failure while writing the row.
    Unknown,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImportRowError {
    /// Sheet row number; the header is row 1.
    #[schema(example = 3)]
    pub row: usize,
    pub code: RowErrorCode,
    #[schema(example = "student 20239999 not found")]
    pub message: String,
}

impl From<&RowError> for ImportRowError {
    fn from(err: &RowError) -> Self {
        let code = match err {
            RowError::StudentNotFound { .. } | RowError::CourseNotFound { .. } => {
                RowErrorCode::Reference
            }
            RowError::NotNumeric { .. } => RowErrorCode::Format,
            RowError::OutOfRange { .. } => RowErrorCode::Range,
            RowError::Unknown { .. } => RowErrorCode::Unknown,
        };
        Self {
            row: err.row(),
            code,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImportResponse {
    pub success_count: usize,
    pub failure_count: usize,
    /// Rejected rows in file order.
    pub errors: Vec<ImportRowError>,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        Self {
            success_count: report.success_count,
            failure_count: report.errors.len(),
            errors: report.errors.iter().map(ImportRowError::from).collect(),
        }
    }
}
