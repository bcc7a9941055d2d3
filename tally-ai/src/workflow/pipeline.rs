//! Pipeline Orchestrator
//!
//! Wires the sanitizer, record parser, migrator, reconciler and auditor
//! together. Each stage holds only immutable configuration, so one
//! `Pipeline` can serve any number of threads.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(&TallyConfig::default());
//! let analysis = pipeline.process(&raw_response)?;
//! println!("{}% classified", analysis.record.coverage_percentage);
//! ```

use crate::error::{IngestResult, ParseFailure};
use crate::fusion::{ClassificationMigrator, EntityReconciler};
use crate::record::parse_record;
use crate::sanitize::orchestrator::{context_window, CONTEXT_RADIUS};
use crate::sanitize::{extract_candidate, RepairStrategy, SanitizingOrchestrator};
use crate::types::{CostRecord, DiagnosticReport, Finding, FindingKind};
use crate::validators::CompletenessAuditor;
use serde::{Deserialize, Serialize};
use tally_common::config::TallyConfig;
use tally_common::Taxonomy;
use tracing::{debug, info};

/// Pipeline output: the repaired record and what was found along the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub record: CostRecord,
    pub report: DiagnosticReport,
}

/// Ingest pipeline
pub struct Pipeline {
    sanitizer: SanitizingOrchestrator,
    migrator: ClassificationMigrator,
    reconciler: EntityReconciler,
    auditor: CompletenessAuditor,
}

impl Pipeline {
    /// Create pipeline from configuration
    pub fn new(config: &TallyConfig) -> Self {
        let taxonomy = Taxonomy::masterformat_2004();
        Self {
            sanitizer: SanitizingOrchestrator::new(),
            migrator: ClassificationMigrator::with_config(taxonomy.clone(), &config.migration),
            reconciler: EntityReconciler::with_config(taxonomy.clone(), config.reconciliation.clone()),
            auditor: CompletenessAuditor::with_thresholds(taxonomy, &config.audit),
        }
    }

    /// Create pipeline from its stages
    pub fn with_stages(
        sanitizer: SanitizingOrchestrator,
        migrator: ClassificationMigrator,
        reconciler: EntityReconciler,
        auditor: CompletenessAuditor,
    ) -> Self {
        Self {
            sanitizer,
            migrator,
            reconciler,
            auditor,
        }
    }

    /// Process one raw generator response
    ///
    /// # Errors
    /// - `IngestError::Parse` when no object can be recovered
    /// - `IngestError::Validation` when a mandatory field is missing
    pub fn process(&self, raw: &str) -> IngestResult<Analysis> {
        let candidate = extract_candidate(raw).ok_or_else(|| ParseFailure {
            offset: 0,
            message: "no JSON object found in input".to_string(),
            context: context_window(raw, 0, CONTEXT_RADIUS),
        })?;

        let sanitized = self.sanitizer.sanitize(candidate)?;
        let mut report = DiagnosticReport::new();
        if sanitized.strategy != RepairStrategy::AlreadyValid {
            report.push(Finding::info(
                FindingKind::StructureRepaired,
                format!("Generator JSON repaired ({:?})", sanitized.strategy),
            ));
        }

        let mut record = parse_record(&sanitized.value)?;
        debug!(contractor = %record.contractor_name, "Record accepted");

        let migration = self.migrator.migrate(&mut record);
        report.extend(migration.findings);

        let reconciliation = self.reconciler.reconcile(&mut record);
        report.merge(reconciliation);

        let audit = self.auditor.audit(&record);
        report.merge(audit);

        info!(
            contractor = %record.contractor_name,
            total = %record.total_amount,
            coverage = record.coverage_percentage,
            total_coverage = report.total_coverage,
            warnings = report.warnings().count(),
            "Cost breakdown processed"
        );

        Ok(Analysis { record, report })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&TallyConfig::default())
    }
}
