use crate::models::{Scope, Vault};
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

/// Parse a path identifier, naming the parameter when it is malformed.
pub fn parse_id(name: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("{} must be a UUID (got '{}')", name, raw))
    })
}

/// The (company, vault) pair named by the request path.
///
/// Extraction fails with 400 for malformed identifiers and 404 when the vault
/// does not exist under that company. Authorization of the caller for the
/// scope happens upstream.
#[derive(Debug, Clone)]
pub struct VaultScope {
    pub scope: Scope,
    pub vault: Vault,
}

#[async_trait]
impl FromRequestParts<AppState> for VaultScope {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid path: {}", e)))?;

        let param = |name: &str| {
            params
                .get(name)
                .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing {} in path", name)))
                .and_then(|raw| parse_id(name, raw))
        };
        let scope = Scope::new(param("company_id")?, param("vault_id")?);

        tracing::Span::current().record("company_id", tracing::field::display(scope.company_id));
        tracing::Span::current().record("vault_id", tracing::field::display(scope.vault_id));

        let vault = state.db.get_vault(scope).await?;
        Ok(Self { scope, vault })
    }
}
