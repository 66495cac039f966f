//! Spreadsheet ingestion: decode, normalize, identify, resolve.

pub mod identity;
pub mod normalizer;
pub mod resolver;
pub mod spreadsheet;

pub use identity::IdentityPolicy;
pub use normalizer::{normalize, NormalizedRow, RawCell, RawSheet};
pub use resolver::{prepare, resolve, IngestOptions, PreparedBatch, ResolutionPlan, VaultSnapshot};
pub use spreadsheet::read_sheet;
