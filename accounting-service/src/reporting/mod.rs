//! Aggregates and insights over filtered records.

pub mod aggregation;
pub mod insights;

pub use aggregation::{Bucket, Summary, Totals, TOP_CATEGORY_COUNT};
pub use insights::{evaluate, Insight, Severity};

use serde::Serialize;

/// Totals, leading categories and commentary for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub totals: Totals,
    pub top_categories: Vec<Bucket>,
    pub insights: Vec<Insight>,
}

impl From<Summary> for Report {
    fn from(summary: Summary) -> Self {
        let insights = evaluate(&summary);
        Self {
            totals: summary.totals,
            top_categories: summary.top_categories,
            insights,
        }
    }
}
