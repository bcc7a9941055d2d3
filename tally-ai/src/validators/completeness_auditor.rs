//! Completeness Auditor
//!
//! Read-only audit of a reconciled record. Never fails; every problem is a
//! finding in the returned report.
//!
//! # Coverage Metrics
//! - **Classification coverage**: division total / target × 100, 2 decimals
//!   (not clamped, so over-classification stays visible)
//! - **Total coverage**: (division total + overhead + allowances +
//!   uncategorized) / target × 100, 2 decimals, clamped to [0, 100]
//!
//! # Warnings
//! - total coverage below `min_total_coverage` (default 99.0)
//! - classification coverage below `min_classification_coverage` (default 85.0)
//! - uncategorized fraction above `max_uncategorized_fraction` (default 25%)
//!
//! One informational line per division follows for traceability.

use crate::types::{percent_of, CostRecord, DiagnosticReport, Finding, FindingKind};
use tally_common::config::AuditConfig;
use tally_common::Taxonomy;
use tracing::debug;

/// Items listed per division before summarizing the rest
const ITEM_SUMMARY_LIMIT: usize = 3;

/// Completeness Auditor
pub struct CompletenessAuditor {
    taxonomy: Taxonomy,
    /// Minimum total coverage (percent) before warning
    min_total_coverage: f64,
    /// Minimum classification coverage (percent) before warning
    min_classification_coverage: f64,
    /// Maximum uncategorized fraction of the target before warning
    max_uncategorized_fraction: f64,
}

impl CompletenessAuditor {
    /// Create auditor with default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(Taxonomy::masterformat_2004(), &AuditConfig::default())
    }

    /// Create auditor with custom thresholds
    pub fn with_thresholds(taxonomy: Taxonomy, config: &AuditConfig) -> Self {
        Self {
            taxonomy,
            min_total_coverage: config.min_total_coverage,
            min_classification_coverage: config.min_classification_coverage,
            max_uncategorized_fraction: config.max_uncategorized_fraction,
        }
    }

    /// Audit a record
    pub fn audit(&self, record: &CostRecord) -> DiagnosticReport {
        let target = record.total_amount;
        let classification_coverage = percent_of(record.classification_total(), target);
        let total_coverage = percent_of(record.accounted_total(), target).clamp(0.0, 100.0);

        let mut report = DiagnosticReport {
            classification_coverage,
            total_coverage,
            findings: Vec::new(),
        };

        if total_coverage < self.min_total_coverage {
            report.push(Finding::warning(
                FindingKind::LowTotalCoverage,
                format!(
                    "Total coverage {:.2}% is below {:.2}%: {} of {} accounted for",
                    total_coverage,
                    self.min_total_coverage,
                    record.accounted_total(),
                    target
                ),
            ));
        }

        if classification_coverage < self.min_classification_coverage {
            report.push(Finding::warning(
                FindingKind::LowClassificationCoverage,
                format!(
                    "Classification coverage {:.2}% is below {:.2}%",
                    classification_coverage, self.min_classification_coverage
                ),
            ));
        }

        if let Some(fraction) = record.uncategorized.total.ratio_of(target) {
            if fraction > self.max_uncategorized_fraction {
                report.push(Finding::warning(
                    FindingKind::HighUncategorizedFraction,
                    format!(
                        "Uncategorized costs are {:.2}% of the target (limit {:.2}%)",
                        fraction * 100.0,
                        self.max_uncategorized_fraction * 100.0
                    ),
                ));
            }
        }

        for (code, entry) in &record.csi_divisions {
            report.push(
                Finding::info(
                    FindingKind::DivisionBreakdown,
                    format!(
                        "Division {} ({}): {} ({:.2}% of target){}",
                        code,
                        self.taxonomy.display_name(code),
                        entry.amount,
                        percent_of(entry.amount, target),
                        summarize_items(&entry.items)
                    ),
                )
                .with_code(code.clone()),
            );
        }

        debug!(
            classification_coverage,
            total_coverage,
            divisions = record.csi_divisions.len(),
            warnings = report.warnings().count(),
            "Completeness audit complete"
        );

        report
    }
}

impl Default for CompletenessAuditor {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize_items(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let shown: Vec<&str> = items.iter().take(ITEM_SUMMARY_LIMIT).map(String::as_str).collect();
    let more = items.len().saturating_sub(ITEM_SUMMARY_LIMIT);
    if more > 0 {
        format!(": {} (+{} more)", shown.join(", "), more)
    } else {
        format!(": {}", shown.join(", "))
    }
}
