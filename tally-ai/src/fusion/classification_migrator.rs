//! Classification Migrator
//!
//! Rewrites a record's division map into the current taxonomy.
//!
//! # Passes
//! 1. **Normalization**: codes rewritten to two-digit form, colliding
//!    entries merged, unknown codes moved to the uncategorized pool
//! 2. **Composite split**: the obsolete Mechanical division is divided
//!    between fire suppression, plumbing and HVAC by keyword heuristics
//! 3. **Rename**: obsolete Electrical becomes Division 26
//! 4. **Relink**: subcontractors pointing at obsolete codes are repointed
//!    and their aggregate recomputed from the linked entries
//! 5. **Backfill**: entries without a subcontractor pick up the first one
//!    whose division list contains their code
//!
//! # Split Arithmetic
//! All shares are computed in cents with truncation and the last share is
//! the remainder, so the targets always sum to the original amount:
//! - fire = amount × fire%            (only when fire keywords match)
//! - plumbing = (amount - fire) × plumbing%   (only when plumbing keywords match)
//! - hvac = amount - fire - plumbing

use crate::record::dedup_preserving_order;
use crate::types::{CostRecord, DivisionEntry, Finding, FindingKind, LineItem, Subcontractor};
use std::collections::BTreeMap;
use tally_common::config::MigrationConfig;
use tally_common::taxonomy::{CodeClass, CompositeSplit, ObsoleteDivision};
use tally_common::{Money, Taxonomy};
use tracing::{debug, info, warn};

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    pub findings: Vec<Finding>,
    /// Codes rewritten to two-digit form
    pub codes_normalized: usize,
    /// Entries folded into another entry with the same code
    pub entries_merged: usize,
    /// Entries moved to the uncategorized pool
    pub unknown_moved: usize,
    pub splits: usize,
    pub renames: usize,
    pub subcontractors_relinked: usize,
    pub entries_backfilled: usize,
}

impl MigrationSummary {
    /// True when the record was already in current-taxonomy form
    pub fn is_unchanged(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Classification Migrator
///
/// Stateless between runs; holds only the taxonomy and the split
/// heuristics.
pub struct ClassificationMigrator {
    taxonomy: Taxonomy,
    fire_bps: u32,
    plumbing_bps: u32,
    fire_keywords: Vec<String>,
    plumbing_keywords: Vec<String>,
}

impl ClassificationMigrator {
    /// Create migrator with the current taxonomy and default heuristics
    pub fn new() -> Self {
        Self::with_config(Taxonomy::masterformat_2004(), &MigrationConfig::default())
    }

    /// Create migrator with a custom taxonomy and heuristics
    pub fn with_config(taxonomy: Taxonomy, config: &MigrationConfig) -> Self {
        Self {
            taxonomy,
            fire_bps: config.fire_suppression_bps(),
            plumbing_bps: config.plumbing_bps(),
            fire_keywords: lowercase_all(&config.fire_keywords),
            plumbing_keywords: lowercase_all(&config.plumbing_keywords),
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Migrate `record` in place
    pub fn migrate(&self, record: &mut CostRecord) -> MigrationSummary {
        let mut summary = MigrationSummary::default();

        self.normalize_divisions(record, &mut summary);
        self.normalize_subcontractors(record, &mut summary);

        let mut remap: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let obsolete: Vec<String> = record
            .csi_divisions
            .keys()
            .filter(|code| matches!(self.taxonomy.classify(code), CodeClass::Obsolete(_)))
            .cloned()
            .collect();

        for code in obsolete {
            let Some(entry) = record.csi_divisions.remove(&code) else {
                continue;
            };
            let produced = match self.taxonomy.classify(&code) {
                CodeClass::Obsolete(ObsoleteDivision::Composite { name, split }) => {
                    summary.splits += 1;
                    self.split_composite(record, &code, name, split, entry, &mut summary)
                }
                CodeClass::Obsolete(ObsoleteDivision::Renamed { name, to }) => {
                    summary.renames += 1;
                    self.rename(record, &code, name, to, entry, &mut summary);
                    vec![to.clone()]
                }
                _ => continue,
            };
            remap.insert(code, produced);
        }

        self.relink_subcontractors(record, &remap, &mut summary);
        self.fill_empty_items(record);
        self.backfill_subcontractors(record, &mut summary);

        debug!(
            splits = summary.splits,
            renames = summary.renames,
            normalized = summary.codes_normalized,
            merged = summary.entries_merged,
            unknown = summary.unknown_moved,
            relinked = summary.subcontractors_relinked,
            backfilled = summary.entries_backfilled,
            "Classification migration complete"
        );

        summary
    }

    fn normalize_divisions(&self, record: &mut CostRecord, summary: &mut MigrationSummary) {
        let original = std::mem::take(&mut record.csi_divisions);

        for (raw_code, entry) in original {
            let normalized = Taxonomy::normalize_code(&raw_code)
                .filter(|code| !matches!(self.taxonomy.classify(code), CodeClass::Unknown));

            let Some(code) = normalized else {
                warn!(code = %raw_code, amount = %entry.amount, "Unknown division moved to uncategorized");
                let label = match entry.items.first() {
                    Some(item) => format!("Division {}: {}", raw_code, item),
                    None => format!("Division {}", raw_code),
                };
                summary.findings.push(
                    Finding::warning(
                        FindingKind::UnknownDivision,
                        format!(
                            "Division code '{}' is not in {}; {} moved to uncategorized",
                            raw_code,
                            self.taxonomy.version(),
                            entry.amount
                        ),
                    )
                    .with_code(raw_code.clone()),
                );
                record.uncategorized.add(label, entry.amount);
                summary.unknown_moved += 1;
                continue;
            };

            if code != raw_code {
                summary.codes_normalized += 1;
                summary.findings.push(
                    Finding::info(
                        FindingKind::CodeNormalized,
                        format!("Division code '{}' normalized to '{}'", raw_code, code),
                    )
                    .with_code(code.clone()),
                );
            }

            match record.csi_divisions.get_mut(&code) {
                Some(existing) => {
                    existing.absorb(entry);
                    summary.entries_merged += 1;
                    summary.findings.push(
                        Finding::info(
                            FindingKind::DivisionsMerged,
                            format!("Entries for division {} merged into one", code),
                        )
                        .with_code(code),
                    );
                }
                None => {
                    record.csi_divisions.insert(code, entry);
                }
            }
        }
    }

    fn normalize_subcontractors(&self, record: &mut CostRecord, summary: &mut MigrationSummary) {
        for sub in &mut record.subcontractors {
            let mut kept = Vec::with_capacity(sub.divisions.len());
            for raw in &sub.divisions {
                match Taxonomy::normalize_code(raw)
                    .filter(|code| !matches!(self.taxonomy.classify(code), CodeClass::Unknown))
                {
                    Some(code) => kept.push(code),
                    None => {
                        warn!(subcontractor = %sub.name, code = %raw, "Unknown division dropped from subcontractor");
                        summary.findings.push(
                            Finding::warning(
                                FindingKind::UnknownDivision,
                                format!("Subcontractor '{}' references unknown division '{}'; reference dropped", sub.name, raw),
                            )
                            .with_code(raw.clone()),
                        );
                    }
                }
            }
            dedup_preserving_order(&mut kept);
            sub.divisions = kept;
        }
    }

    /// Divide a composite entry between its split targets
    ///
    /// Returns the target codes that received a share.
    fn split_composite(
        &self,
        record: &mut CostRecord,
        code: &str,
        name: &str,
        split: &CompositeSplit,
        entry: DivisionEntry,
        summary: &mut MigrationSummary,
    ) -> Vec<String> {
        let amount = entry.amount;
        let fire_matched = entry.descriptions().any(|d| self.is_fire(d));
        let plumbing_matched = entry.descriptions().any(|d| self.is_plumbing(d));

        let fire_share = if fire_matched { amount.share_bps(self.fire_bps) } else { Money::ZERO };
        let after_fire = amount - fire_share;
        let plumbing_share = if plumbing_matched {
            after_fire.share_bps(self.plumbing_bps)
        } else {
            Money::ZERO
        };
        let hvac_share = after_fire - plumbing_share;

        // Fire claims first, so an item mentioning both goes to fire suppression
        let mut fire = Bucket::default();
        let mut plumbing = Bucket::default();
        let mut rest = Bucket::default();
        for item in entry.items {
            self.bucket_for(&item, &mut fire, &mut plumbing, &mut rest).items.push(item);
        }
        for line_item in entry.line_items {
            self.bucket_for(&line_item.description, &mut fire, &mut plumbing, &mut rest)
                .line_items
                .push(line_item);
        }

        let note = format!("Split from obsolete Division {} ({})", code, name);
        let mut produced = Vec::new();

        if fire_matched {
            let target = &split.fire_suppression;
            self.place_share(record, target, fire_share, fire, None, &entry.provenance, &note);
            produced.push(target.clone());
        }
        if plumbing_matched {
            let target = &split.plumbing;
            self.place_share(record, target, plumbing_share, plumbing, None, &entry.provenance, &note);
            produced.push(target.clone());
        }
        if !hvac_share.is_zero() || !rest.is_empty() || produced.is_empty() {
            let target = &split.remainder;
            self.place_share(record, target, hvac_share, rest, entry.subcontractor, &entry.provenance, &note);
            produced.push(target.clone());
        }

        info!(
            code = %code,
            amount = %amount,
            fire = %fire_share,
            plumbing = %plumbing_share,
            remainder = %hvac_share,
            "Composite division split"
        );
        summary.findings.push(
            Finding::info(
                FindingKind::DivisionSplit,
                format!(
                    "Obsolete Division {} ({}) {} split: {} → {}, {} → {}, {} → {}",
                    code,
                    name,
                    amount,
                    fire_share,
                    split.fire_suppression,
                    plumbing_share,
                    split.plumbing,
                    hvac_share,
                    split.remainder
                ),
            )
            .with_code(code),
        );

        produced
    }

    #[allow(clippy::too_many_arguments)]
    fn place_share(
        &self,
        record: &mut CostRecord,
        target: &str,
        amount: Money,
        bucket: Bucket,
        subcontractor: Option<String>,
        inherited: &[String],
        note: &str,
    ) {
        let mut provenance = inherited.to_vec();
        provenance.push(note.to_string());

        let share = DivisionEntry {
            amount,
            items: bucket.items,
            subcontractor,
            line_items: bucket.line_items,
            provenance,
        };

        match record.csi_divisions.get_mut(target) {
            Some(existing) => existing.absorb(share),
            None => {
                record.csi_divisions.insert(target.to_string(), share);
            }
        }
    }

    fn rename(
        &self,
        record: &mut CostRecord,
        code: &str,
        name: &str,
        to: &str,
        mut entry: DivisionEntry,
        summary: &mut MigrationSummary,
    ) {
        entry
            .provenance
            .push(format!("Renamed from obsolete Division {} ({})", code, name));

        let merged = match record.csi_divisions.get_mut(to) {
            Some(existing) => {
                existing.absorb(entry);
                true
            }
            None => {
                record.csi_divisions.insert(to.to_string(), entry);
                false
            }
        };

        info!(from = %code, to = %to, merged, "Obsolete division renamed");
        summary.findings.push(
            Finding::info(
                FindingKind::DivisionRenamed,
                format!("Obsolete Division {} ({}) renamed to {}", code, name, to),
            )
            .with_code(code),
        );
    }

    fn relink_subcontractors(
        &self,
        record: &mut CostRecord,
        remap: &BTreeMap<String, Vec<String>>,
        summary: &mut MigrationSummary,
    ) {
        let mut relinked = Vec::new();

        for (index, sub) in record.subcontractors.iter_mut().enumerate() {
            if !sub
                .divisions
                .iter()
                .any(|code| matches!(self.taxonomy.classify(code), CodeClass::Obsolete(_)))
            {
                continue;
            }

            let before = sub.divisions.join(", ");
            let mut divisions = Vec::with_capacity(sub.divisions.len());
            for code in &sub.divisions {
                match self.taxonomy.classify(code) {
                    CodeClass::Obsolete(obsolete) => divisions.extend(self.replacement_codes(sub, code, obsolete, remap)),
                    _ => divisions.push(code.clone()),
                }
            }
            dedup_preserving_order(&mut divisions);
            sub.divisions = divisions;

            debug!(subcontractor = %sub.name, from = %before, to = ?sub.divisions, "Subcontractor relinked");
            relinked.push((index, before));
        }

        for (index, before) in relinked {
            let linked = record.linked_total(&record.subcontractors[index]);
            let sub = &mut record.subcontractors[index];
            let previous = sub.amount;
            if linked.is_positive() {
                sub.amount = linked;
            }

            summary.subcontractors_relinked += 1;
            summary.findings.push(Finding::info(
                FindingKind::SubcontractorRelinked,
                format!(
                    "Subcontractor '{}' divisions [{}] → [{}], amount {} → {}",
                    sub.name,
                    before,
                    sub.divisions.join(", "),
                    previous,
                    sub.amount
                ),
            ));
        }
    }

    /// Current codes replacing an obsolete subcontractor reference
    ///
    /// A composite reference resolves by the subcontractor's own trade when
    /// it names one of the keyword families, otherwise to every target the
    /// split produced (or the remainder target when nothing was split).
    fn replacement_codes(
        &self,
        sub: &Subcontractor,
        code: &str,
        obsolete: &ObsoleteDivision,
        remap: &BTreeMap<String, Vec<String>>,
    ) -> Vec<String> {
        match obsolete {
            ObsoleteDivision::Renamed { to, .. } => vec![to.clone()],
            ObsoleteDivision::Composite { split, .. } => {
                let trade = format!("{} {}", sub.trade, sub.name);
                if self.is_fire(&trade) {
                    vec![split.fire_suppression.clone()]
                } else if self.is_plumbing(&trade) {
                    vec![split.plumbing.clone()]
                } else {
                    remap
                        .get(code)
                        .cloned()
                        .unwrap_or_else(|| vec![split.remainder.clone()])
                }
            }
        }
    }

    fn fill_empty_items(&self, record: &mut CostRecord) {
        for (code, entry) in record.csi_divisions.iter_mut() {
            if entry.items.is_empty() {
                entry.items.push(self.taxonomy.display_name(code));
            }
        }
    }

    fn backfill_subcontractors(&self, record: &mut CostRecord, summary: &mut MigrationSummary) {
        let subcontractors = &record.subcontractors;
        for (code, entry) in record.csi_divisions.iter_mut() {
            if entry.subcontractor.is_some() {
                continue;
            }
            if let Some(sub) = subcontractors.iter().find(|s| s.divisions.iter().any(|c| c == code)) {
                entry.subcontractor = Some(sub.name.clone());
                summary.entries_backfilled += 1;
                summary.findings.push(
                    Finding::info(
                        FindingKind::SubcontractorBackfilled,
                        format!("Division {} attributed to subcontractor '{}'", code, sub.name),
                    )
                    .with_code(code.clone()),
                );
            }
        }
    }

    fn bucket_for<'b>(
        &self,
        description: &str,
        fire: &'b mut Bucket,
        plumbing: &'b mut Bucket,
        rest: &'b mut Bucket,
    ) -> &'b mut Bucket {
        if self.is_fire(description) {
            fire
        } else if self.is_plumbing(description) {
            plumbing
        } else {
            rest
        }
    }

    fn is_fire(&self, text: &str) -> bool {
        contains_any(text, &self.fire_keywords)
    }

    fn is_plumbing(&self, text: &str) -> bool {
        contains_any(text, &self.plumbing_keywords)
    }
}

impl Default for ClassificationMigrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Items claimed by one split target
#[derive(Default)]
struct Bucket {
    items: Vec<String>,
    line_items: Vec<LineItem>,
}

impl Bucket {
    fn is_empty(&self) -> bool {
        self.items.is_empty() && self.line_items.is_empty()
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

fn lowercase_all(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
