//! Application startup and lifecycle management.

use crate::config::AccountingConfig;
use crate::handlers;
use crate::middleware::metrics_middleware;
use crate::services::{init_metrics, Database};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, RequestId};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AccountingConfig>,
    pub db: Arc<Database>,
}

const VAULT_PATH: &str = "/companies/:company_id/vaults/:vault_id";

/// HTTP routes of the service.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .limits
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let vault = |suffix: &str| format!("{VAULT_PATH}{suffix}");

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/companies",
            post(handlers::create_company).get(handlers::list_companies),
        )
        .route(
            "/companies/:company_id/vaults",
            post(handlers::create_vault).get(handlers::list_vaults),
        )
        .route(&vault(""), delete(handlers::delete_vault))
        .route(
            &vault("/uploads"),
            post(handlers::upload_file).get(handlers::upload_history),
        )
        .route(
            &vault("/records"),
            get(handlers::list_records).delete(handlers::clear_records),
        )
        .route(&vault("/records/page"), get(handlers::page_records))
        .route(&vault("/summary"), get(handlers::summary))
        .route(&vault("/report"), get(handlers::report))
        .route(&vault("/distinct/:field"), get(handlers::distinct_values))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.0.as_str())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                        company_id = tracing::field::Empty,
                        vault_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect, migrate and bind the listener.
    pub async fn build(config: AccountingConfig) -> Result<Self, AppError> {
        // Initialize metrics
        init_metrics();

        // Connect to database
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        // Bind HTTP listener
        let http_addr = config.common.socket_addr();
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Accounting service listener bound");

        let state = AppState {
            config: Arc::new(config),
            db: Arc::new(db),
        };

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let http_router = router(self.state.clone());

        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, http_router)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "HTTP server error");
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
