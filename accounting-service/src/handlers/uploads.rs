use crate::dtos::IngestResponse;
use crate::ingest::{normalize, read_sheet, IdentityPolicy, IngestOptions};
use crate::middleware::VaultScope;
use crate::services::{record_error, record_ingest};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartError, rejection::QueryRejection, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "File exceeds the upload limit of {} bytes",
            max_bytes
        ))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart body: {}", e))
    }
}

/// Take the `file` part of the form, or the first part that carries a filename.
async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        if data.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the upload limit of {} bytes",
                max_bytes
            )));
        }
        return Ok((filename, data.to_vec()));
    }

    Err(AppError::BadRequest(anyhow::anyhow!(
        "No file uploaded; send the spreadsheet in a multipart field named 'file'"
    )))
}

/// Ingest one spreadsheet into the vault.
///
/// Query flags: `enforce_period_check` and `allow_period_update`, both
/// default `false`.
pub async fn upload_file(
    State(state): State<AppState>,
    vault: VaultScope,
    options: Result<Query<IngestOptions>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let Query(options) = options.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid upload options ({}); enforce_period_check and allow_period_update take true or false",
            e.body_text()
        ))
    })?;
    let (filename, data) = read_upload(&mut multipart, state.config.limits.max_upload_bytes).await?;

    tracing::info!(
        filename = %filename,
        size = data.len(),
        enforce_period_check = options.enforce_period_check,
        allow_period_update = options.allow_period_update,
        "Upload received"
    );

    let parse_name = filename.clone();
    let parsed = tokio::task::spawn_blocking(move || {
        read_sheet(&parse_name, &data).and_then(|sheet| normalize(&sheet))
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Spreadsheet parser failed: {}", e)))?;

    let rows = match parsed {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(filename = %filename, error = %e, "Upload rejected");
            record_ingest(e.kind(), 0, 0, 0);
            return Err(e.into());
        }
    };

    let result = state
        .db
        .ingest_batch(
            vault.scope,
            &filename,
            rows,
            options,
            &IdentityPolicy::default(),
        )
        .await;

    match result {
        Ok(batch) => {
            record_ingest(
                "success",
                batch.rows_inserted.max(0) as u64,
                batch.duplicates_skipped.max(0) as u64,
                batch.rows_replaced.max(0) as u64,
            );
            Ok((StatusCode::OK, Json(IngestResponse::from(batch))))
        }
        Err(e) => {
            tracing::warn!(filename = %filename, error = %e, "Upload not committed");
            if let AppError::Conflict(_) = e {
                record_ingest("conflict", 0, 0, 0);
            } else {
                record_ingest("error", 0, 0, 0);
                record_error(e.kind());
            }
            Err(e)
        }
    }
}

pub async fn upload_history(
    State(state): State<AppState>,
    vault: VaultScope,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.upload_history(vault.scope).await?))
}
