//! Validation layer
//!
//! Read-only checks over a finished record.
//!
//! # Validators
//! 1. **completeness_auditor** - coverage metrics and per-division breakdown

pub mod completeness_auditor;

pub use completeness_auditor::CompletenessAuditor;
