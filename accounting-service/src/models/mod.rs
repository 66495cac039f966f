//! Domain models for accounting-service.

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Scope
// ============================================================================

/// The (company, vault) pair every record operation is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    pub company_id: Uuid,
    pub vault_id: Uuid,
}

impl Scope {
    pub fn new(company_id: Uuid, vault_id: Uuid) -> Self {
        Self {
            company_id,
            vault_id,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.company_id, self.vault_id)
    }
}

// ============================================================================
// Flow Type
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Income,
    Expense,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Stored values are always canonical.
    pub fn from_str(s: &str) -> Self {
        match s {
            "expense" => Self::Expense,
            _ => Self::Income,
        }
    }

    /// Accepts canonical and Spanish spreadsheet tokens, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "income" | "ingreso" | "ingresos" | "entrada" => Some(Self::Income),
            "expense" | "egreso" | "egresos" | "gasto" | "salida" => Some(Self::Expense),
            _ => None,
        }
    }
}

// ============================================================================
// Company / Vault Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub company_id: Uuid,
    pub name: String,
    pub legal_name: String,
    pub tax_id: String,
    pub business_line: String,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Annual,
    Custom,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
            Self::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "quarterly" => Self::Quarterly,
            "annual" => Self::Annual,
            "custom" => Self::Custom,
            _ => Self::Monthly,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Vault {
    pub vault_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub period_type: String,
    pub created_utc: DateTime<Utc>,
}

impl Vault {
    pub fn period_type(&self) -> PeriodType {
        PeriodType::from_str(&self.period_type)
    }
}

// ============================================================================
// Record Models
// ============================================================================

/// A committed transaction line. `running_balance` is not stored; it is
/// produced by the read query over the whole vault in chronological order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Record {
    pub record_id: Uuid,
    #[serde(skip)]
    pub seq: i64,
    pub company_id: Uuid,
    pub vault_id: Uuid,
    #[serde(rename = "date")]
    pub record_date: NaiveDate,
    pub account: String,
    pub category: String,
    pub subcategory: String,
    pub project: String,
    pub project_code: String,
    pub counterparty: String,
    pub description: String,
    pub document_type: String,
    pub document_number: String,
    pub flow_type: String,
    pub amount: Decimal,
    pub verified: Option<bool>,
    pub comments: String,
    pub source_file: String,
    pub fingerprint: String,
    pub period_label: String,
    pub running_balance: Decimal,
    pub created_utc: DateTime<Utc>,
}

// ============================================================================
// Upload History
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadBatch {
    pub batch_id: Uuid,
    pub company_id: Uuid,
    pub vault_id: Uuid,
    pub filename: String,
    pub period_label: String,
    pub rows_inserted: i32,
    pub duplicates_skipped: i32,
    pub rows_replaced: i32,
    pub created_utc: DateTime<Utc>,
}
