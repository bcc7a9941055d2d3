//! Entity Reconciler
//!
//! Cross-checks the division map against subcontractor aggregates and the
//! record's target total.
//!
//! # Algorithm
//! 1. Gap synthesis: a subcontractor referencing a critical division that is
//!    absent (or zero) gets an entry of `amount / number of its divisions`
//! 2. Per-subcontractor discrepancy: aggregate vs. sum of linked entries
//! 3. Global discrepancy: target vs. classification + auxiliary pools
//! 4. Uncategorized fraction of the target
//! 5. Pool item sums vs. pool totals
//! 6. Record coverage recomputed after synthesis
//!
//! Entries are only ever added or annotated, never removed.

use crate::types::{percent_of, CostRecord, DiagnosticReport, DivisionEntry, Finding, FindingKind};
use tally_common::config::ReconciliationConfig;
use tally_common::{Money, Taxonomy};
use tracing::{debug, info, warn};

/// Entity Reconciler
pub struct EntityReconciler {
    taxonomy: Taxonomy,
    config: ReconciliationConfig,
    subcontractor_floor: Money,
}

impl EntityReconciler {
    /// Create reconciler with default thresholds
    pub fn new() -> Self {
        Self::with_config(Taxonomy::masterformat_2004(), ReconciliationConfig::default())
    }

    /// Create reconciler with custom thresholds
    pub fn with_config(taxonomy: Taxonomy, config: ReconciliationConfig) -> Self {
        let subcontractor_floor = config.subcontractor_floor();
        Self {
            taxonomy,
            config,
            subcontractor_floor,
        }
    }

    pub fn is_critical(&self, code: &str) -> bool {
        self.config.critical_divisions.iter().any(|c| c == code)
    }

    /// Reconcile `record` in place and report what was found
    pub fn reconcile(&self, record: &mut CostRecord) -> DiagnosticReport {
        let mut report = DiagnosticReport::new();

        self.synthesize_missing_entries(record, &mut report);
        self.check_subcontractors(record, &mut report);
        self.check_global(record, &mut report);
        self.check_pools(record, &mut report);

        record.coverage_percentage = percent_of(record.classification_total(), record.total_amount).clamp(0.0, 100.0);
        report.classification_coverage = percent_of(record.classification_total(), record.total_amount);
        report.total_coverage = percent_of(record.accounted_total(), record.total_amount).clamp(0.0, 100.0);

        debug!(
            coverage = record.coverage_percentage,
            total_coverage = report.total_coverage,
            findings = report.findings.len(),
            "Reconciliation complete"
        );

        report
    }

    fn synthesize_missing_entries(&self, record: &mut CostRecord, report: &mut DiagnosticReport) {
        for sub in &record.subcontractors {
            if !sub.amount.is_positive() {
                continue;
            }
            let share = sub.amount.divide_evenly(sub.divisions.len());

            for code in sub.divisions.iter().filter(|c| self.is_critical(c)) {
                let note = format!(
                    "Synthesized from subcontractor '{}' aggregate {} across {} division(s)",
                    sub.name,
                    sub.amount,
                    sub.divisions.len()
                );

                match record.csi_divisions.get_mut(code) {
                    Some(entry) if entry.amount.is_positive() => continue,
                    Some(entry) => {
                        entry.amount = share;
                        if entry.items.is_empty() {
                            entry.items.push(self.taxonomy.display_name(code));
                        }
                        if entry.subcontractor.is_none() {
                            entry.subcontractor = Some(sub.name.clone());
                        }
                        entry.provenance.push(note);
                    }
                    None => {
                        let mut entry = DivisionEntry::new(share, vec![self.taxonomy.display_name(code)]);
                        entry.subcontractor = Some(sub.name.clone());
                        entry.provenance.push(note);
                        record.csi_divisions.insert(code.clone(), entry);
                    }
                }

                info!(code = %code, subcontractor = %sub.name, amount = %share, "Division entry synthesized");
                report.push(
                    Finding::info(
                        FindingKind::EntrySynthesized,
                        format!(
                            "Division {} ({}) synthesized at {} from subcontractor '{}'",
                            code,
                            self.taxonomy.display_name(code),
                            share,
                            sub.name
                        ),
                    )
                    .with_code(code.clone()),
                );
            }
        }
    }

    fn check_subcontractors(&self, record: &CostRecord, report: &mut DiagnosticReport) {
        for sub in &record.subcontractors {
            if sub.divisions.is_empty() {
                continue;
            }
            let linked = record.linked_total(sub);
            let gap = (sub.amount - linked).abs();
            let relative_limit = sub.amount.abs().as_dollars() * self.config.subcontractor_relative_threshold;

            if gap.as_dollars() > relative_limit && gap > self.subcontractor_floor {
                warn!(
                    subcontractor = %sub.name,
                    aggregate = %sub.amount,
                    linked = %linked,
                    gap = %gap,
                    "Subcontractor discrepancy"
                );
                report.push(Finding::warning(
                    FindingKind::SubcontractorDiscrepancy,
                    format!(
                        "Subcontractor '{}' aggregate {} differs from linked divisions [{}] totaling {} by {}",
                        sub.name,
                        sub.amount,
                        sub.divisions.join(", "),
                        linked,
                        gap
                    ),
                ));
            }
        }
    }

    fn check_global(&self, record: &CostRecord, report: &mut DiagnosticReport) {
        let target = record.total_amount;
        let accounted = record.accounted_total();
        let gap = (target - accounted).abs();

        if let Some(ratio) = gap.ratio_of(target) {
            if ratio > self.config.global_discrepancy_threshold {
                warn!(target = %target, accounted = %accounted, ratio, "Global discrepancy");
                report.push(Finding::warning(
                    FindingKind::GlobalDiscrepancy,
                    format!(
                        "Accounted total {} differs from target {} by {} ({:.2}%)",
                        accounted,
                        target,
                        gap,
                        ratio * 100.0
                    ),
                ));
            }
        }

        if let Some(ratio) = record.uncategorized.total.ratio_of(target) {
            if ratio > self.config.uncategorized_fraction_threshold {
                warn!(uncategorized = %record.uncategorized.total, ratio, "Large uncategorized pool");
                report.push(Finding::warning(
                    FindingKind::UncategorizedFraction,
                    format!(
                        "Uncategorized costs {} are {:.2}% of target {}",
                        record.uncategorized.total,
                        ratio * 100.0,
                        target
                    ),
                ));
            }
        }
    }

    fn check_pools(&self, record: &CostRecord, report: &mut DiagnosticReport) {
        let pools = [
            ("overhead", &record.overhead),
            ("allowances", &record.allowances),
            ("uncategorized", &record.uncategorized),
        ];

        for (name, pool) in pools {
            if pool.items.is_empty() {
                continue;
            }
            let items_total = pool.items_total();
            if items_total != pool.total {
                debug!(pool = name, total = %pool.total, items = %items_total, "Pool items do not sum to total");
                report.push(Finding::info(
                    FindingKind::PoolItemMismatch,
                    format!("{} items sum to {} but the pool total is {}", name, items_total, pool.total),
                ));
            }
        }
    }
}

impl Default for EntityReconciler {
    fn default() -> Self {
        Self::new()
    }
}
