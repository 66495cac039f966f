//! Breakdowns and totals over a filtered record set.
//!
//! The store groups by (category, flow type) and (month, flow type); this
//! module folds those groups into the public shapes so every breakdown is
//! derived from the same rows.

use crate::models::FlowType;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

pub const TOP_CATEGORY_COUNT: usize = 5;

fn zero() -> Decimal {
    Decimal::new(0, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryFlowTotal {
    pub category: String,
    pub flow_type: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct MonthFlowTotal {
    pub month: String,
    pub flow_type: String,
    pub total: Decimal,
    pub records: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
    pub records: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Sign-agnostic amount per category, largest first.
    pub by_category: Vec<Bucket>,
    /// Always `[income, expense]`.
    pub by_flow: Vec<Bucket>,
    /// Amount per `YYYY-MM`, oldest first.
    pub by_month: Vec<Bucket>,
    pub top_categories: Vec<Bucket>,
    pub totals: Totals,
    #[serde(skip)]
    pub expense_by_category: Vec<Bucket>,
}

/// Sort largest first; equal values fall back to the label.
fn ranked(map: BTreeMap<String, Decimal>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = map
        .into_iter()
        .map(|(label, value)| Bucket { label, value })
        .collect();
    buckets.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    buckets
}

impl Summary {
    pub fn build(categories: Vec<CategoryFlowTotal>, months: Vec<MonthFlowTotal>) -> Self {
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut expense_by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for group in categories {
            if FlowType::from_str(&group.flow_type) == FlowType::Expense {
                *expense_by_category
                    .entry(group.category.clone())
                    .or_insert_with(zero) += group.total;
            }
            *by_category.entry(group.category).or_insert_with(zero) += group.total;
        }

        let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut income = zero();
        let mut expense = zero();
        let mut records = 0;
        for group in months {
            match FlowType::from_str(&group.flow_type) {
                FlowType::Income => income += group.total,
                FlowType::Expense => expense += group.total,
            }
            records += group.records;
            *by_month.entry(group.month).or_insert_with(zero) += group.total;
        }

        let by_category = ranked(by_category);
        let top_categories = by_category
            .iter()
            .take(TOP_CATEGORY_COUNT)
            .cloned()
            .collect();

        Self {
            by_category,
            by_flow: vec![
                Bucket {
                    label: FlowType::Income.as_str().to_string(),
                    value: income,
                },
                Bucket {
                    label: FlowType::Expense.as_str().to_string(),
                    value: expense,
                },
            ],
            by_month: by_month
                .into_iter()
                .map(|(label, value)| Bucket { label, value })
                .collect(),
            top_categories,
            totals: Totals {
                income,
                expense,
                balance: income - expense,
                records,
            },
            expense_by_category: ranked(expense_by_category),
        }
    }

    /// Sum of every matching amount regardless of flow type.
    pub fn volume(&self) -> Decimal {
        self.totals.income + self.totals.expense
    }
}
