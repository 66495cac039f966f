//! Rule-based commentary on a [`Summary`].
//!
//! Rules are evaluated in declaration order and every match contributes one
//! insight. When nothing matches, a single neutral insight is returned.

use super::aggregation::Summary;
use rust_decimal::Decimal;
use serde::Serialize;

/// Expense/income ratio above which cash pressure is reported.
const CASH_PRESSURE_RATIO: Decimal = Decimal::from_parts(85, 0, 0, false, 2);
/// Share of total volume above which one category dominates.
const CONCENTRATION_SHARE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);
/// Fewer matching records than this makes the figures tentative.
const LOW_SAMPLE_FLOOR: i64 = 10;
const EXPENSE_CATEGORIES_NAMED: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Caution,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
}

struct Rule {
    code: &'static str,
    severity: Severity,
    applies: fn(&Summary) -> bool,
    message: fn(&Summary) -> String,
}

const RULES: &[Rule] = &[
    Rule {
        code: "negative_balance",
        severity: Severity::Warning,
        applies: |s| s.totals.balance.is_sign_negative() && !s.totals.balance.is_zero(),
        message: negative_balance_message,
    },
    Rule {
        code: "cash_pressure",
        severity: Severity::Warning,
        applies: |s| match expense_ratio(s) {
            Some(ratio) => ratio > CASH_PRESSURE_RATIO,
            None => s.totals.expense > Decimal::ZERO,
        },
        message: cash_pressure_message,
    },
    Rule {
        code: "category_concentration",
        severity: Severity::Caution,
        applies: |s| s.by_category.len() > 1 && top_share(s).is_some_and(|share| share > CONCENTRATION_SHARE),
        message: concentration_message,
    },
    Rule {
        code: "low_sample",
        severity: Severity::Caution,
        applies: |s| s.totals.records < LOW_SAMPLE_FLOOR,
        message: |s| {
            format!(
                "Only {} record(s) match the current filters; treat these figures as preliminary until more data is loaded",
                s.totals.records
            )
        },
    },
];

fn expense_ratio(summary: &Summary) -> Option<Decimal> {
    let totals = &summary.totals;
    (!totals.income.is_zero()).then(|| totals.expense / totals.income)
}

fn top_share(summary: &Summary) -> Option<Decimal> {
    let volume = summary.volume();
    let top = summary.by_category.first()?;
    (!volume.is_zero()).then(|| top.value / volume)
}

fn percent(ratio: Decimal) -> Decimal {
    (ratio * Decimal::ONE_HUNDRED).round_dp(1)
}

fn negative_balance_message(summary: &Summary) -> String {
    let names: Vec<&str> = summary
        .expense_by_category
        .iter()
        .take(EXPENSE_CATEGORIES_NAMED)
        .map(|b| b.label.as_str())
        .collect();
    if names.is_empty() {
        format!("Balance is negative ({})", summary.totals.balance)
    } else {
        format!(
            "Balance is negative ({}). Review the largest expense categories first: {}",
            summary.totals.balance,
            names.join(", ")
        )
    }
}

fn cash_pressure_message(summary: &Summary) -> String {
    match expense_ratio(summary) {
        Some(ratio) => format!(
            "Expenses amount to {}% of income; cash pressure is high",
            percent(ratio)
        ),
        None => format!(
            "Expenses of {} were recorded with no income in the same selection",
            summary.totals.expense
        ),
    }
}

fn concentration_message(summary: &Summary) -> String {
    let label = summary
        .by_category
        .first()
        .map(|b| b.label.as_str())
        .unwrap_or_default();
    let share = top_share(summary).map(percent).unwrap_or_default();
    format!(
        "Category '{}' represents {}% of the recorded volume",
        label, share
    )
}

/// Apply every rule to `summary`; never returns an empty list.
pub fn evaluate(summary: &Summary) -> Vec<Insight> {
    let mut insights: Vec<Insight> = RULES
        .iter()
        .filter(|rule| (rule.applies)(summary))
        .map(|rule| Insight {
            code: rule.code,
            severity: rule.severity,
            message: (rule.message)(summary),
        })
        .collect();

    if insights.is_empty() {
        insights.push(Insight {
            code: "stable",
            severity: Severity::Info,
            message: "Income covers expenses and no category dominates; finances look stable"
                .to_string(),
        });
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::aggregation::{CategoryFlowTotal, MonthFlowTotal};

    fn summary(groups: &[(&str, &str, i64)], records_per_group: i64) -> Summary {
        let categories = groups
            .iter()
            .map(|(category, flow, cents)| CategoryFlowTotal {
                category: category.to_string(),
                flow_type: flow.to_string(),
                total: Decimal::new(*cents, 2),
            })
            .collect();
        let months = groups
            .iter()
            .map(|(_, flow, cents)| MonthFlowTotal {
                month: "2024-05".to_string(),
                flow_type: flow.to_string(),
                total: Decimal::new(*cents, 2),
                records: records_per_group,
            })
            .collect();
        Summary::build(categories, months)
    }

    fn codes(insights: &[Insight]) -> Vec<&'static str> {
        insights.iter().map(|i| i.code).collect()
    }

    #[test]
    fn healthy_books_are_stable() {
        let s = summary(
            &[
                ("Ventas", "income", 40000),
                ("Consultoria", "income", 40000),
                ("Servicios", "expense", 10000),
            ],
            10,
        );
        assert_eq!(codes(&evaluate(&s)), vec!["stable"]);
    }

    #[test]
    fn all_matching_rules_fire_in_order() {
        let s = summary(
            &[
                ("Ventas", "income", 10000),
                ("Nomina", "expense", 50000),
                ("Renta", "expense", 2000),
            ],
            1,
        );
        let insights = evaluate(&s);
        assert_eq!(
            codes(&insights),
            vec!["negative_balance", "cash_pressure", "category_concentration", "low_sample"]
        );
        assert!(insights[0].message.contains("Nomina, Renta"));
        assert!(insights[1].message.contains("520.0%"));
    }

    #[test]
    fn expenses_without_income_are_pressure() {
        let s = summary(&[("Renta", "expense", 1000)], 20);
        let insights = evaluate(&s);
        assert!(codes(&insights).contains(&"cash_pressure"));
        assert!(insights
            .iter()
            .any(|i| i.message.contains("with no income")));
    }

    #[test]
    fn empty_selection_is_low_sample() {
        let s = summary(&[], 0);
        assert_eq!(codes(&evaluate(&s)), vec!["low_sample"]);
    }
}
