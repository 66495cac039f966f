use crate::dtos::{ClearResponse, DistinctResponse, RecordListResponse};
use crate::middleware::VaultScope;
use crate::query::{
    parse_limit, DistinctField, FilterParams, PageParams, PageRequest, RecordFilter, SortOrder,
};
use crate::services::record_cleared;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::collections::HashMap;

/// Matching records with their running balance, capped by `limit`
/// (`limit=all` lifts the cap).
pub async fn list_records(
    State(state): State<AppState>,
    vault: VaultScope,
    Query(filter): Query<FilterParams>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let limits = &state.config.limits;
    let limit = parse_limit(&paging, limits.default_list_limit, limits.max_list_limit)?;
    let sort = SortOrder::from_params(&paging)?;
    let filter = RecordFilter::from_params(&filter);

    let items = state
        .db
        .list_records(vault.scope, &filter, sort, limit)
        .await?;

    Ok(Json(RecordListResponse {
        count: items.len(),
        items,
    }))
}

pub async fn page_records(
    State(state): State<AppState>,
    vault: VaultScope,
    Query(filter): Query<FilterParams>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let limits = &state.config.limits;
    let page = PageRequest::from_params(&paging, limits.default_page_size, limits.max_page_size)?;
    let sort = SortOrder::from_params(&paging)?;
    let filter = RecordFilter::from_params(&filter);

    Ok(Json(
        state
            .db
            .query_records(vault.scope, &filter, sort, page)
            .await?,
    ))
}

/// Delete the records matching the filter. Without any filter this clears
/// the whole vault; a malformed filter value rejects the request.
pub async fn clear_records(
    State(state): State<AppState>,
    vault: VaultScope,
    Query(filter): Query<FilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = RecordFilter::from_params_strict(&filter)?;
    if filter.is_empty() {
        tracing::warn!(scope = %vault.scope, "Clearing every record of the vault");
    }

    let deleted = state.db.delete_by_filter(vault.scope, &filter).await?;
    record_cleared(deleted);

    Ok(Json(ClearResponse::new(deleted)))
}

pub async fn distinct_values(
    State(state): State<AppState>,
    vault: VaultScope,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let raw = params.get("field").map(String::as_str).unwrap_or_default();
    let field = DistinctField::parse(raw)?;

    let values = state.db.list_distinct(vault.scope, field).await?;

    Ok(Json(DistinctResponse {
        field: field.as_str(),
        values,
    }))
}
