//! Structural repair of generator output
//!
//! Turns near-valid JSON into strictly valid JSON without altering string
//! literal content.
//!
//! # Components
//! 1. **literal_masker** - isolates and restores quoted literals
//! 2. **structure_repairer** - heuristic separator insertion on masked text
//! 3. **orchestrator** - staged repair attempts and failure diagnostics

pub mod literal_masker;
pub mod orchestrator;
pub mod structure_repairer;

pub use literal_masker::{mask, unmask, MaskedText};
pub use orchestrator::{extract_candidate, sanitize, RepairStrategy, Sanitized, SanitizingOrchestrator};
pub use structure_repairer::{SeparatorRepairer, StructureRepair};
