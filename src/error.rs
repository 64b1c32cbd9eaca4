//! Error types for table loading and metric computation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the metrics pipeline.
///
/// The aggregator never swallows these; the caller decides whether to show
/// an empty result or abort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("missing column: {0}")]
    Schema(String),
    #[error("invalid parameter: {0}")]
    Validation(String),
}

/// Errors raised while reading a CSV file or a workbook sheet.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read workbook {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },
    #[error("sheet '{sheet}' not found in {}", .path.display())]
    MissingSheet { path: PathBuf, sheet: String },
}

/// A specialized Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
