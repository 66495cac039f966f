//! Domain errors for ingestion and querying, and their HTTP mapping.

use service_core::error::AppError;
use thiserror::Error;

/// Why an uploaded batch was rejected. Every variant aborts the whole batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The file as a whole is unusable (wrong type, missing or ambiguous
    /// columns, no data rows).
    #[error("{0}")]
    Validation(String),

    /// One row could not be parsed. `row` is the spreadsheet row number,
    /// counting the header as row 1.
    #[error("Row {row}: {message}. Fix the row and upload the file again")]
    Row { row: usize, message: String },

    /// The batch covers periods that already hold records.
    #[error(
        "Period {} already has records in this vault. Resubmit with allow_period_update=true to replace them",
        .periods.join(", ")
    )]
    Conflict { periods: Vec<String> },
}

impl IngestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn row(row: usize, message: impl Into<String>) -> Self {
        Self::Row {
            row,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Row { .. } => "row",
            Self::Conflict { .. } => "conflict",
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Conflict { .. } => AppError::Conflict(anyhow::anyhow!(err.to_string())),
            other => AppError::BadRequest(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// Rejected pagination, ordering or (for deletes) filter parameters. Reads
/// ignore a bad filter value instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page must be an integer >= 1 (got '{0}')")]
    InvalidPage(String),

    #[error("page_size must be an integer between 1 and {max} (got '{value}')")]
    InvalidPageSize { value: String, max: u32 },

    #[error("limit must be 'all' or an integer between 1 and {max} (got '{value}')")]
    InvalidLimit { value: String, max: u32 },

    #[error("sort must be one of date_desc, date_asc, amount_desc, amount_asc (got '{0}')")]
    InvalidSort(String),

    #[error("{field} has an invalid value '{value}'; nothing was deleted")]
    InvalidFilter { field: &'static str, value: String },

    #[error("unknown field '{0}', expected one of category, subcategory, project, account, project_code, year")]
    UnknownField(String),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::BadRequest(anyhow::anyhow!(err.to_string()))
    }
}
