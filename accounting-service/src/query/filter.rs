//! Record filters shared by listing, pagination, aggregation and clearing.

use crate::error::QueryError;
use crate::ingest::normalizer::parse_date_text;
use crate::models::FlowType;
use chrono::NaiveDate;
use serde::Deserialize;

/// Filter values exactly as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub project: Option<String>,
    pub account: Option<String>,
    pub project_code: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub flow_type: Option<String>,
    /// Year-month, `YYYY-MM`.
    pub period: Option<String>,
    pub date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Parsed, conjunctive record filter. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// `ILIKE` pattern over the description, wildcards already escaped.
    pub search: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub project: Option<String>,
    pub account: Option<String>,
    pub project_code: Option<String>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    /// Canonical flow type, or the caller's token when it names no flow type
    /// so that the filter matches nothing.
    pub flow_type: Option<String>,
    pub period: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

impl RecordFilter {
    /// Unparseable values are dropped instead of failing the request.
    pub fn from_params(params: &FilterParams) -> Self {
        let date = present(&params.date).and_then(parse_date_text);

        let mut filter = Self {
            search: present(&params.search).map(like_pattern),
            category: owned(&params.category),
            subcategory: owned(&params.subcategory),
            project: owned(&params.project),
            account: owned(&params.account),
            project_code: owned(&params.project_code),
            year: present(&params.year)
                .and_then(|y| y.parse::<i32>().ok())
                .filter(|y| (1..=9999).contains(y)),
            month: present(&params.month)
                .and_then(|m| m.parse::<i32>().ok())
                .filter(|m| (1..=12).contains(m)),
            flow_type: present(&params.flow_type).map(|token| {
                FlowType::parse(token)
                    .map(|flow| flow.as_str().to_string())
                    .unwrap_or_else(|| token.to_lowercase())
            }),
            period: present(&params.period).and_then(parse_period),
            date,
            date_from: present(&params.date_from).and_then(parse_date_text),
            date_to: present(&params.date_to).and_then(parse_date_text),
        };

        if filter.date.is_some() {
            filter.year = None;
            filter.month = None;
            filter.period = None;
            filter.date_from = None;
            filter.date_to = None;
        }

        filter
    }

    /// Like [`RecordFilter::from_params`], but any supplied value that does
    /// not parse is an error. Destructive operations use this so that a typo
    /// can never widen the selection.
    pub fn from_params_strict(params: &FilterParams) -> Result<Self, QueryError> {
        let checks: [(&'static str, &Option<String>, fn(&str) -> bool); 7] = [
            ("year", &params.year, |v| {
                v.parse::<i32>().is_ok_and(|y| (1..=9999).contains(&y))
            }),
            ("month", &params.month, |v| {
                v.parse::<i32>().is_ok_and(|m| (1..=12).contains(&m))
            }),
            ("flow_type", &params.flow_type, |v| FlowType::parse(v).is_some()),
            ("period", &params.period, |v| parse_period(v).is_some()),
            ("date", &params.date, |v| parse_date_text(v).is_some()),
            ("date_from", &params.date_from, |v| parse_date_text(v).is_some()),
            ("date_to", &params.date_to, |v| parse_date_text(v).is_some()),
        ];

        for (field, value, valid) in checks {
            if let Some(raw) = present(value) {
                if !valid(raw) {
                    return Err(QueryError::InvalidFilter {
                        field,
                        value: raw.to_string(),
                    });
                }
            }
        }

        Ok(Self::from_params(params))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `%term%` with `\`, `%` and `_` escaped for `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_period(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

/// Filter predicates over `records`, appended after the scope predicates
/// `company_id = $1 AND vault_id = $2`. Bind with [`bind_filter!`].
pub const FILTER_SQL: &str = r#"
      AND ($3::text IS NULL OR description ILIKE $3)
      AND ($4::text IS NULL OR category = $4)
      AND ($5::text IS NULL OR subcategory = $5)
      AND ($6::text IS NULL OR project = $6)
      AND ($7::text IS NULL OR account = $7)
      AND ($8::text IS NULL OR project_code = $8)
      AND ($9::int IS NULL OR EXTRACT(YEAR FROM record_date)::int = $9)
      AND ($10::int IS NULL OR EXTRACT(MONTH FROM record_date)::int = $10)
      AND ($11::text IS NULL OR flow_type = $11)
      AND ($12::text IS NULL OR to_char(record_date, 'YYYY-MM') = $12)
      AND ($13::date IS NULL OR record_date = $13)
      AND ($14::date IS NULL OR record_date >= $14)
      AND ($15::date IS NULL OR record_date <= $15)
"#;

/// Number of placeholders used by the scope plus [`FILTER_SQL`].
pub const FILTER_BINDS: usize = 15;

/// Bind scope and filter values to a query built on [`FILTER_SQL`].
#[macro_export]
macro_rules! bind_filter {
    ($query:expr, $scope:expr, $filter:expr) => {
        $query
            .bind($scope.company_id)
            .bind($scope.vault_id)
            .bind(&$filter.search)
            .bind(&$filter.category)
            .bind(&$filter.subcategory)
            .bind(&$filter.project)
            .bind(&$filter.account)
            .bind(&$filter.project_code)
            .bind($filter.year)
            .bind($filter.month)
            .bind(&$filter.flow_type)
            .bind(&$filter.period)
            .bind($filter.date)
            .bind($filter.date_from)
            .bind($filter.date_to)
    };
}
