//! Record identity: the dedup fingerprint and the period a row belongs to.
//!
//! Both derivations live behind [`IdentityPolicy`] so they can be replaced
//! without touching the resolver or the store.

use super::normalizer::NormalizedRow;
use crate::models::PeriodType;
use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Clone, Copy)]
pub struct IdentityPolicy {
    pub fingerprint: fn(&NormalizedRow) -> String,
    pub period_label: fn(PeriodType, NaiveDate) -> String,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            fingerprint: stable_fingerprint,
            period_label: calendar_period_label,
        }
    }
}

impl IdentityPolicy {
    pub fn fingerprint(&self, row: &NormalizedRow) -> String {
        (self.fingerprint)(row)
    }

    pub fn period_label(&self, period_type: PeriodType, date: NaiveDate) -> String {
        (self.period_label)(period_type, date)
    }
}

/// SHA-256 over date, category, subcategory, description, flow type,
/// amount (2 decimals) and document number.
pub fn stable_fingerprint(row: &NormalizedRow) -> String {
    let mut input = String::with_capacity(128);
    for part in [
        row.date.format("%Y-%m-%d").to_string().as_str(),
        row.category.as_str(),
        row.subcategory.as_str(),
        row.description.as_str(),
        row.flow_type.as_str(),
        format!("{:.2}", row.amount).as_str(),
        row.document_number.as_str(),
    ] {
        input.push_str(part);
        input.push(FIELD_SEPARATOR);
    }

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `YYYY-MM`, `YYYY-Qn` or `YYYY`. Custom vaults are bucketed by month.
pub fn calendar_period_label(period_type: PeriodType, date: NaiveDate) -> String {
    match period_type {
        PeriodType::Monthly | PeriodType::Custom => {
            format!("{:04}-{:02}", date.year(), date.month())
        }
        PeriodType::Quarterly => format!("{:04}-Q{}", date.year(), date.month0() / 3 + 1),
        PeriodType::Annual => format!("{:04}", date.year()),
    }
}
