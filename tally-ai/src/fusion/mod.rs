//! Record fusion stages
//!
//! Both stages mutate the record in place and run in order:
//! 1. **classification_migrator** - obsolete and malformed division codes
//!    rewritten into the current taxonomy
//! 2. **entity_reconciler** - division map cross-checked against
//!    subcontractor aggregates and the target total

pub mod classification_migrator;
pub mod entity_reconciler;

pub use classification_migrator::{ClassificationMigrator, MigrationSummary};
pub use entity_reconciler::EntityReconciler;
