//! Accounting Service - Multi-tenant ingestion, deduplication and reporting
//! of spreadsheet-sourced financial records.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod query;
pub mod reporting;
pub mod services;
pub mod startup;
