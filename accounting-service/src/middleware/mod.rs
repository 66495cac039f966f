pub mod metrics;
pub mod scope;

pub use metrics::metrics_middleware;
pub use scope::{parse_id, VaultScope};
