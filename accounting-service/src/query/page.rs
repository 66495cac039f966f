//! Pagination, list limits and display ordering.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};

/// Paging and ordering parameters from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn from_params(
        params: &PageParams,
        default_size: u32,
        max_size: u32,
    ) -> Result<Self, QueryError> {
        let page = match params.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| QueryError::InvalidPage(raw.to_string()))?,
        };

        let page_size = match params.page_size.as_deref().map(str::trim) {
            None | Some("") => default_size.min(max_size),
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|size| (1..=max_size).contains(size))
                .ok_or_else(|| QueryError::InvalidPageSize {
                    value: raw.to_string(),
                    max: max_size,
                })?,
        };

        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

/// Row cap for the unpaginated list. `None` means every matching row.
pub fn parse_limit(
    params: &PageParams,
    default_limit: u32,
    max_limit: u32,
) -> Result<Option<i64>, QueryError> {
    match params.limit.as_deref().map(str::trim) {
        None | Some("") => Ok(Some(i64::from(default_limit.min(max_limit)))),
        Some(raw) if raw.eq_ignore_ascii_case("all") => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|limit| (1..=max_limit).contains(limit))
            .map(|limit| Some(i64::from(limit)))
            .ok_or_else(|| QueryError::InvalidLimit {
                value: raw.to_string(),
                max: max_limit,
            }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: total.div_ceil(u64::from(request.page_size)),
        }
    }
}

/// Display order. Ties are always broken by insertion order so paging is
/// stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl SortOrder {
    pub fn from_params(params: &PageParams) -> Result<Self, QueryError> {
        match params.sort.as_deref().map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "date_desc" => Ok(Self::DateDesc),
                "date_asc" => Ok(Self::DateAsc),
                "amount_desc" => Ok(Self::AmountDesc),
                "amount_asc" => Ok(Self::AmountAsc),
                _ => Err(QueryError::InvalidSort(raw.to_string())),
            },
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            Self::DateDesc => "record_date DESC, seq DESC",
            Self::DateAsc => "record_date ASC, seq ASC",
            Self::AmountDesc => "amount DESC, seq DESC",
            Self::AmountAsc => "amount ASC, seq ASC",
        }
    }
}
