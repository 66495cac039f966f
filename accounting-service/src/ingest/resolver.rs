//! Insert / skip / replace decisions for a batch against the vault's state.
//!
//! [`resolve`] is pure: the store loads a [`VaultSnapshot`] inside the write
//! transaction, hands it over, and applies the returned plan.

use super::identity::IdentityPolicy;
use super::normalizer::NormalizedRow;
use crate::error::IngestError;
use crate::models::PeriodType;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    pub row: NormalizedRow,
    pub fingerprint: String,
    pub period_label: String,
}

#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub rows: Vec<PreparedRow>,
    /// Distinct period labels spanned by the rows, sorted.
    pub periods: BTreeSet<String>,
}

impl PreparedBatch {
    pub fn fingerprints(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.fingerprint.clone()).collect()
    }

    pub fn period_labels(&self) -> Vec<String> {
        self.periods.iter().cloned().collect()
    }

    /// Label recorded in the upload history, e.g. `2024-05` or `2024-05, 2024-06`.
    pub fn label(&self) -> String {
        self.period_labels().join(", ")
    }
}

/// Attach fingerprint and period label to every row.
pub fn prepare(
    rows: Vec<NormalizedRow>,
    period_type: PeriodType,
    policy: &IdentityPolicy,
) -> PreparedBatch {
    let mut periods = BTreeSet::new();
    let rows = rows
        .into_iter()
        .map(|row| {
            let period_label = policy.period_label(period_type, row.date);
            periods.insert(period_label.clone());
            PreparedRow {
                fingerprint: policy.fingerprint(&row),
                period_label,
                row,
            }
        })
        .collect();

    PreparedBatch { rows, periods }
}

/// What the vault already holds that is relevant to one batch.
#[derive(Debug, Clone, Default)]
pub struct VaultSnapshot {
    /// Stored record count for each of the batch's period labels.
    pub period_counts: HashMap<String, u64>,
    /// Stored fingerprints that also appear in the batch, with their period.
    pub existing_fingerprints: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct IngestOptions {
    #[serde(default)]
    pub enforce_period_check: bool,
    #[serde(default)]
    pub allow_period_update: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    pub rows_to_insert: Vec<PreparedRow>,
    pub periods_to_delete: Vec<String>,
    pub rows_replaced: u64,
    pub duplicates_skipped: u64,
    pub period_label: String,
}

impl ResolutionPlan {
    pub fn rows_inserted(&self) -> u64 {
        self.rows_to_insert.len() as u64
    }
}

pub fn resolve(
    batch: PreparedBatch,
    snapshot: &VaultSnapshot,
    options: IngestOptions,
) -> Result<ResolutionPlan, IngestError> {
    let overlapping: Vec<String> = batch
        .periods
        .iter()
        .filter(|label| snapshot.period_counts.get(*label).copied().unwrap_or(0) > 0)
        .cloned()
        .collect();

    let periods_to_delete = if options.allow_period_update {
        overlapping
    } else if options.enforce_period_check && !overlapping.is_empty() {
        return Err(IngestError::Conflict {
            periods: overlapping,
        });
    } else {
        Vec::new()
    };

    let rows_replaced = periods_to_delete
        .iter()
        .map(|label| snapshot.period_counts.get(label).copied().unwrap_or(0))
        .sum();
    let deleted: HashSet<&str> = periods_to_delete.iter().map(String::as_str).collect();

    let period_label = batch.label();
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.rows.len());
    let mut rows_to_insert = Vec::with_capacity(batch.rows.len());
    let mut duplicates_skipped = 0;

    for row in batch.rows {
        let stored = snapshot
            .existing_fingerprints
            .get(&row.fingerprint)
            .is_some_and(|period| !deleted.contains(period.as_str()));

        if stored || !seen.insert(row.fingerprint.clone()) {
            duplicates_skipped += 1;
        } else {
            rows_to_insert.push(row);
        }
    }

    Ok(ResolutionPlan {
        rows_to_insert,
        periods_to_delete,
        rows_replaced,
        duplicates_skipped,
        period_label,
    })
}
