pub mod companies;
pub mod health;
pub mod records;
pub mod reports;
pub mod uploads;

pub use companies::{create_company, create_vault, delete_vault, list_companies, list_vaults};
pub use health::{health_check, metrics_handler, readiness_check};
pub use records::{clear_records, distinct_values, list_records, page_records};
pub use reports::{report, summary};
pub use uploads::{upload_file, upload_history};
