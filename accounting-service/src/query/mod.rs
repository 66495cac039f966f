//! Query vocabulary for records: filters, pagination, ordering and the
//! fields that drive filter menus.

pub mod filter;
pub mod page;

pub use filter::{FilterParams, RecordFilter, FILTER_BINDS, FILTER_SQL};
pub use page::{parse_limit, Page, PageParams, PageRequest, SortOrder};

use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    Category,
    Subcategory,
    Project,
    Account,
    ProjectCode,
    Year,
}

impl DistinctField {
    /// Accepts singular and plural path segments (`category`, `categories`).
    pub fn parse(segment: &str) -> Result<Self, QueryError> {
        match segment.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Ok(Self::Category),
            "subcategory" | "subcategories" => Ok(Self::Subcategory),
            "project" | "projects" => Ok(Self::Project),
            "account" | "accounts" => Ok(Self::Account),
            "project_code" | "project_codes" => Ok(Self::ProjectCode),
            "year" | "years" => Ok(Self::Year),
            _ => Err(QueryError::UnknownField(segment.to_string())),
        }
    }

    /// SQL expression producing the value as text.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Project => "project",
            Self::Account => "account",
            Self::ProjectCode => "project_code",
            Self::Year => "to_char(record_date, 'YYYY')",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Project => "project",
            Self::Account => "account",
            Self::ProjectCode => "project_code",
            Self::Year => "year",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_field_accepts_plurals() {
        assert_eq!(DistinctField::parse("Categories"), Ok(DistinctField::Category));
        assert_eq!(DistinctField::parse("project_codes"), Ok(DistinctField::ProjectCode));
        assert_eq!(DistinctField::parse("years").map(|f| f.column()), Ok("to_char(record_date, 'YYYY')"));
        assert!(DistinctField::parse("amount").is_err());
    }
}
