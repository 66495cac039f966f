//! Services module for accounting-service.

pub mod database;
pub mod metrics;

pub use database::Database;
pub use metrics::{
    get_metrics, init_metrics, record_cleared, record_error, record_http_request, record_ingest,
};
