//! Error taxonomy for the analytics pipeline.
//!
//! Only conditions that stop a dataset load are returned as
//! [`PipelineError`]. Malformed rows are recorded as [`MalformedRecord`]
//! values and reported in bulk through the exclusion summary.

use serde::Serialize;
use thiserror::Error;

/// Failures that abort a pipeline operation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A discount outside `[0, 1]`: upstream data corruption.
    #[error("row {row}: discount {value} is outside the valid domain [0, 1]")]
    InvalidDiscountDomain { row: usize, value: f64 },

    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unknown discount bin: '{0}'")]
    UnknownDiscountBin(String),

    #[error("unknown dimension: '{0}'")]
    UnknownDimension(String),

    #[error("unknown metric: '{0}'")]
    UnknownMetric(String),

    #[error("unknown reduction: '{0}'")]
    UnknownReduction(String),

    #[error("unknown view: '{0}' (expected tabbed, summary or panels)")]
    UnknownView(String),

    #[error("unknown drilldown scope: '{0}' (expected full or filtered)")]
    UnknownScope(String),

    #[error("invalid drilldown: {0}")]
    InvalidDrilldown(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a raw row could not become a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedReason {
    #[error("missing required field '{field}'")]
    Missing { field: &'static str },

    #[error("field '{field}' has unparseable value '{value}'")]
    Unparseable { field: &'static str, value: String },

    #[error("row could not be read: {message}")]
    Unreadable { message: String },
}

/// A raw row excluded from the run. `row` is the 1-based data row index.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("row {row}: {reason}")]
pub struct MalformedRecord {
    pub row: usize,
    pub reason: MalformedReason,
}
