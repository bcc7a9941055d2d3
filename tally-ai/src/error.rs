//! Error types for tally-ai
//!
//! Two failure kinds stop the pipeline:
//! - `ParseFailure`: structural repair exhausted
//! - `ValidationError`: parsed, but a mandatory field is missing or unusable
//!
//! Reconciliation findings are not errors; they are returned in the
//! `DiagnosticReport` alongside the record.

use thiserror::Error;

/// Structural repair could not produce valid JSON
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecoverable JSON at offset {offset}: {message} (near: {context:?})")]
pub struct ParseFailure {
    /// Byte offset of the failure in the last repair attempt
    pub offset: usize,
    /// Parser message
    pub message: String,
    /// Text surrounding the failure offset
    pub context: String,
}

/// Parsed record is missing or has an unusable mandatory field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Top level is not a JSON object
    #[error("Expected a JSON object at top level, found {0}")]
    NotAnObject(&'static str),

    /// Mandatory field absent or blank
    #[error("Missing mandatory field: {0}")]
    MissingField(&'static str),

    /// Field present but not usable
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Pipeline error
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;
