use crate::middleware::VaultScope;
use crate::query::{FilterParams, RecordFilter};
use crate::reporting::Report;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// Breakdowns by category, flow type and month for the filtered records.
pub async fn summary(
    State(state): State<AppState>,
    vault: VaultScope,
    Query(filter): Query<FilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = RecordFilter::from_params(&filter);
    Ok(Json(state.db.summarize(vault.scope, &filter).await?))
}

/// Totals, top categories and insights for the filtered records.
pub async fn report(
    State(state): State<AppState>,
    vault: VaultScope,
    Query(filter): Query<FilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = RecordFilter::from_params(&filter);
    let summary = state.db.summarize(vault.scope, &filter).await?;
    Ok(Json(Report::from(summary)))
}
