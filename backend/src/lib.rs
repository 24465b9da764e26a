//! # Profiles - pipeline company profile data backend
//!
//! Turns regulatory and operational extracts about pipeline companies
//! (incidents, conditions, throughput and capacity, tolls) into the JSON
//! artifacts read by the company profile dashboards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Warehouse  │────▶│ TableLoader │────▶│  Processor  │────▶│  JSON file  │
//! │ cache/CSV   │     │  (scoped)   │     │ (per domain)│     │ (validated) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use profiles::{process_incidents, IncidentRequest, CompanyScope, TableLoader, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let loader = TableLoader::new(SourceConfig::from_env());
//!     let request = IncidentRequest {
//!         test: true,
//!         companies: CompanyScope::new(["NOVA Gas Transmission Ltd."]),
//!         ..Default::default()
//!     };
//!     let result = process_incidents(&loader, &request).await.unwrap();
//!     println!("{} incidents", result.meta.total_events);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Domain, CompanyScope, ConditionStatus, DateTriple)
//! - [`table`] - Row-oriented table and cell helpers
//! - [`parser`] - CSV parsing with auto-detection
//! - [`source`] - Table loading (fixtures, warehouse, cache)
//! - [`cache`] - Local extract cache
//! - [`transform`] - Domain processors and the output pipeline
//! - [`validation`] - Artifact schema validation
//! - [`profiles`] - Company profile registry
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod logs;
pub mod models;
pub mod table;

// Loading
pub mod cache;
pub mod parser;
pub mod source;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Profiles
pub mod profiles;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CacheError, CsvError, LoadError, OutputError, PipelineError, ProcessError, WarehouseError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Commodity, CompanyScope, ConditionStatus, DateTriple, Domain, Frequency, Lang};
pub use table::{Row, Table};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use cache::{ExtractCache, StoredExtract};
pub use parser::{parse_bytes_auto, parse_csv, parse_csv_file_auto, ParseResult};
pub use source::{SourceConfig, TableLoader, WarehouseClient};

// =============================================================================
// Re-exports - Processors
// =============================================================================

pub use transform::{
    conditions_from_table, incidents_from_table, most_common, most_common_values,
    process_conditions, process_incidents, process_tolls, process_traffic, tolls_from_table,
    traffic_from_table, ConditionOutput, ConditionRequest, IncidentOutput, IncidentRequest,
    MostCommon, OrderedCounts, TollsBundle, TollsRequest, TrafficBundle, TrafficOutput,
    TrafficRequest,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    artifact_path, build_profile, run_conditions, run_incidents, run_tolls, run_traffic,
    write_artifact, BuildOptions, BuildReport, OutputConfig,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, is_valid_artifact, validate, validate_artifact};
