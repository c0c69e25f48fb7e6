//! EnergyReader Core Library
//!
//! Shared functionality for the EnergyReader electricity bill analytics tool:
//! - Database access and migrations
//! - CSV import and plain-text bill extraction
//! - Aggregation engine (period filters, monthly trends, regional insights)
//! - Rule-based insight generator
//! - CSV/JSON report export

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod import;
pub mod insights;
pub mod models;
pub mod store;

/// Bill and user fixtures for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analytics::{PeriodWindow, Region};
pub use config::{AppConfig, InsightConfig};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use export::{ExportFormat, ReportKind, ReportMeta};
pub use extract::{BillExtractor, ExtractedBill};
pub use import::parse_bills_csv;
pub use insights::{Insight, InsightGenerator, InsightKind};
pub use store::{BillRepository, InMemoryStore};
