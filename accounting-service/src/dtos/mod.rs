//! Request and response bodies of the HTTP surface.

use crate::models::{PeriodType, UploadBatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 160))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub legal_name: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub tax_id: String,
    #[serde(default)]
    #[validate(length(max = 160))]
    pub business_line: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVaultRequest {
    #[validate(length(min = 1, max = 160))]
    pub name: String,
    #[serde(default)]
    pub period_type: Option<PeriodType>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub batch_id: Uuid,
    pub period_label: String,
    pub rows_inserted: i32,
    pub duplicates_skipped: i32,
    pub rows_replaced: i32,
}

impl From<UploadBatch> for IngestResponse {
    fn from(batch: UploadBatch) -> Self {
        let message = format!(
            "Processed {}: {} row(s) inserted, {} duplicate(s) skipped, {} row(s) replaced",
            batch.filename, batch.rows_inserted, batch.duplicates_skipped, batch.rows_replaced
        );
        Self {
            message,
            batch_id: batch.batch_id,
            period_label: batch.period_label,
            rows_inserted: batch.rows_inserted,
            duplicates_skipped: batch.duplicates_skipped,
            rows_replaced: batch.rows_replaced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub deleted_rows: u64,
}

impl ClearResponse {
    pub fn new(deleted_rows: u64) -> Self {
        let message = if deleted_rows == 0 {
            "No records matched the filters; nothing was deleted".to_string()
        } else {
            format!("Deleted {} record(s)", deleted_rows)
        };
        Self {
            message,
            deleted_rows,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DistinctResponse {
    pub field: &'static str,
    pub values: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse<T> {
    pub items: Vec<T>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_name_is_required() {
        let request: CreateCompanyRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(request.validate().is_err());

        let request: CreateCompanyRequest = serde_json::from_str(r#"{"name": "Acme"}"#).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.tax_id, "");
    }

    #[test]
    fn vault_period_type_is_optional() {
        let request: CreateVaultRequest =
            serde_json::from_str(r#"{"name": "2024", "period_type": "quarterly"}"#).unwrap();
        assert_eq!(request.period_type, Some(PeriodType::Quarterly));

        let request: CreateVaultRequest = serde_json::from_str(r#"{"name": "2024"}"#).unwrap();
        assert_eq!(request.period_type, None);
    }

    #[test]
    fn clear_message_reports_count() {
        assert_eq!(ClearResponse::new(3).message, "Deleted 3 record(s)");
        assert!(ClearResponse::new(0).message.contains("nothing was deleted"));
    }
}
