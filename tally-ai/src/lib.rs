//! tally-ai library interface
//!
//! Repair and reconciliation engine for machine-generated cost breakdowns.
//! Exposes the pipeline and each stage for integration testing.

pub mod error;
pub mod fusion;
pub mod lenient;
pub mod record;
pub mod sanitize;
pub mod types;
pub mod validators;
pub mod workflow;

pub use crate::error::{IngestError, IngestResult, ParseFailure, ValidationError};
pub use crate::types::{CostRecord, DiagnosticReport, Finding, FindingKind, Severity};
pub use crate::workflow::{Analysis, Pipeline};
