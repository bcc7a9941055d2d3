//! Ingest workflow
//!
//! Runs one raw generator response through every stage:
//! 1. Extract the candidate object from surrounding prose
//! 2. Sanitize into strictly valid JSON
//! 3. Parse and validate mandatory fields
//! 4. Migrate classifications into the current taxonomy
//! 5. Reconcile divisions against subcontractors and the target total
//! 6. Audit completeness
//!
//! Parse and validation failures stop the run; everything after step 3 is
//! reported as findings.

pub mod pipeline;

pub use pipeline::{Analysis, Pipeline};
