use crate::dtos::{CreateCompanyRequest, CreateVaultRequest};
use crate::middleware::{parse_id, VaultScope};
use crate::models::PeriodType;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn create_company(
    State(state): State<AppState>,
    Json(request): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let company = state
        .db
        .create_company(
            request.name.trim(),
            request.legal_name.trim(),
            request.tax_id.trim(),
            request.business_line.trim(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_companies().await?))
}

pub async fn create_vault(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<CreateVaultRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let company_id = parse_id("company_id", &company_id)?;

    let vault = state
        .db
        .create_vault(
            company_id,
            request.name.trim(),
            request.period_type.unwrap_or(PeriodType::Monthly),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(vault)))
}

pub async fn list_vaults(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let company_id = parse_id("company_id", &company_id)?;
    state.db.get_company(company_id).await?;
    Ok(Json(state.db.list_vaults(company_id).await?))
}

/// Removes the vault with all of its records and upload history.
pub async fn delete_vault(
    State(state): State<AppState>,
    vault: VaultScope,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_vault(vault.scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
