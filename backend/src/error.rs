//! Error types for the profiles data pipeline.
//!
//! The hierarchy mirrors the stages of a batch run:
//!
//! - [`CsvError`] - CSV parsing errors
//! - [`CacheError`] - Local extract cache errors
//! - [`WarehouseError`] - Remote warehouse query errors
//! - [`LoadError`] - Table loading and company scoping
//! - [`ProcessError`] - Domain transforms (incidents, conditions, traffic, tolls)
//! - [`OutputError`] - Artifact serialization, validation and writing
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::{CompanyScope, Domain};

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Two columns share a name.
    #[error("Duplicate column '{0}' in CSV header")]
    DuplicateHeader(String),

    /// Malformed record.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from the local extract cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No extract stored for the domain.
    #[error("No cached extract for {0}")]
    NotFound(Domain),

    /// IO error.
    #[error("Cache IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Cache JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Imported file could not be parsed.
    #[error("Cannot import extract: {0}")]
    Import(#[from] CsvError),
}

// =============================================================================
// Warehouse Errors
// =============================================================================

/// Errors from the remote warehouse client.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Missing connection settings.
    #[error("Warehouse not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Warehouse answered with an error status.
    #[error("Warehouse returned {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Response body is not a row set.
    #[error("Invalid warehouse response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while producing a company-scoped table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be read. Fatal for the run.
    #[error("{domain} data unavailable: {reason}")]
    DataUnavailable { domain: Domain, reason: String },

    /// Company scoping left no rows.
    #[error("No {domain} rows for {scope}")]
    EmptyResult { domain: Domain, scope: CompanyScope },

    /// The column used for company scoping is absent.
    #[error("{domain} table has no '{column}' column")]
    MissingColumn { domain: Domain, column: String },
}

// =============================================================================
// Process Errors
// =============================================================================

/// Errors raised by the domain transforms.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Loading failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Required column not present in the table.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A cell could not be interpreted.
    #[error("Invalid value '{value}' in column '{column}' (record {record})")]
    InvalidValue {
        column: String,
        value: String,
        record: String,
    },

    /// Condition status outside Open / In Progress / Closed.
    #[error("Unknown condition status '{value}' (record {record})")]
    UnknownStatus { value: String, record: String },

    /// A traffic point cannot support a trend description.
    #[error("Point '{point}' has {dates} usable date(s), at least 2 are needed")]
    InsufficientHistory { point: String, dates: usize },

    /// Caller passed an unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing JSON artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error.
    #[error("Output IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization failed.
    #[error("Output JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Artifact does not match its schema.
    #[error("{domain} artifact failed validation: {errors:?}")]
    SchemaError { domain: Domain, errors: Vec<String> },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transform error (includes load failures).
    #[error("{0}")]
    Process(#[from] ProcessError),

    /// Artifact writing error.
    #[error("{0}")]
    Output(#[from] OutputError),

    /// Cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// No profile with that id.
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
}

impl From<LoadError> for PipelineError {
    fn from(err: LoadError) -> Self {
        PipelineError::Process(ProcessError::Load(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Result type for loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for domain transforms.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Result type for artifact output.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> ProcessError -> PipelineError
        let load_err = LoadError::EmptyResult {
            domain: Domain::Incidents,
            scope: CompanyScope::new(["Unknown Pipeline Co."]),
        };
        let pipeline_err: PipelineError = ProcessError::from(load_err).into();
        let msg = pipeline_err.to_string();
        assert!(msg.contains("incidents"));
        assert!(msg.contains("Unknown Pipeline Co."));

        // LoadError -> PipelineError directly
        let load_err = LoadError::DataUnavailable {
            domain: Domain::Traffic,
            reason: "no cached extract".into(),
        };
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("traffic data unavailable"));
    }

    #[test]
    fn test_unknown_status_format() {
        let err = ProcessError::UnknownStatus {
            value: "Pending".into(),
            record: "XG-001-2015-1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Pending"));
        assert!(msg.contains("XG-001-2015-1"));
    }

    #[test]
    fn test_empty_scope_reads_all_companies() {
        let err = LoadError::EmptyResult {
            domain: Domain::Conditions,
            scope: CompanyScope::all(),
        };
        assert_eq!(err.to_string(), "No conditions rows for all companies");
    }
}
