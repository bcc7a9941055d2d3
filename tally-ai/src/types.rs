//! Core Types for tally-ai
//!
//! Defines the cost record aggregate and the diagnostic report returned
//! alongside it.
//!
//! # Record
//! - `CostRecord` (aggregate root): target total, division map,
//!   subcontractors, three auxiliary cost pools, derived coverage
//! - `DivisionEntry`: one CSI division bucket with items and line items
//! - `Subcontractor`: trade entity responsible for one or more divisions
//! - `CostPool`: overhead / allowances / uncategorized totals
//!
//! # Diagnostics
//! - `DiagnosticReport`: coverage metrics plus a list of `Finding`s

use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tally_common::Money;

// ============================================================================
// Record
// ============================================================================

/// Validated cost breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Entity the breakdown came from (bidder / general contractor)
    pub contractor_name: String,
    /// Target total every other figure must explain
    pub total_amount: Money,
    /// Division code → entry
    #[serde(default)]
    pub csi_divisions: BTreeMap<String, DivisionEntry>,
    #[serde(default)]
    pub subcontractors: Vec<Subcontractor>,
    #[serde(default)]
    pub overhead: CostPool,
    #[serde(default)]
    pub allowances: CostPool,
    #[serde(default)]
    pub uncategorized: CostPool,
    /// Classification total / target total, percent, clamped to [0, 100]
    #[serde(default)]
    pub coverage_percentage: f64,
}

impl CostRecord {
    /// Sum of all division amounts
    pub fn classification_total(&self) -> Money {
        self.csi_divisions.values().map(|entry| entry.amount).sum()
    }

    /// Overhead + allowances + uncategorized
    pub fn aux_total(&self) -> Money {
        self.overhead.total + self.allowances.total + self.uncategorized.total
    }

    /// Classification total plus auxiliary pools
    pub fn accounted_total(&self) -> Money {
        self.classification_total() + self.aux_total()
    }

    /// Sum of the division entries a subcontractor is linked to
    pub fn linked_total(&self, subcontractor: &Subcontractor) -> Money {
        subcontractor
            .divisions
            .iter()
            .filter_map(|code| self.csi_divisions.get(code))
            .map(|entry| entry.amount)
            .sum()
    }

    /// First subcontractor responsible for `code`
    pub fn subcontractor_for(&self, code: &str) -> Option<&Subcontractor> {
        self.subcontractors
            .iter()
            .find(|sub| sub.divisions.iter().any(|c| c == code))
    }
}

/// One classification bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DivisionRepr")]
pub struct DivisionEntry {
    pub amount: Money,
    /// Short scope descriptions
    pub items: Vec<String>,
    /// Responsible subcontractor name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcontractor: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    /// Migration / synthesis annotations
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<String>,
}

impl DivisionEntry {
    pub fn new(amount: Money, items: Vec<String>) -> Self {
        Self {
            amount,
            items,
            ..Default::default()
        }
    }

    /// Fold another entry for the same division into this one
    pub fn absorb(&mut self, other: DivisionEntry) {
        self.amount += other.amount;
        for item in other.items {
            if !self.items.contains(&item) {
                self.items.push(item);
            }
        }
        if self.subcontractor.is_none() {
            self.subcontractor = other.subcontractor;
        }
        self.line_items.extend(other.line_items);
        self.provenance.extend(other.provenance);
    }

    /// Item and line-item descriptions, for keyword matching and summaries
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .map(String::as_str)
            .chain(self.line_items.iter().map(|li| li.description.as_str()))
    }
}

/// Division entries arrive either as a bare amount or as an object
#[derive(Deserialize)]
#[serde(untagged)]
enum DivisionRepr {
    Amount(Money),
    Detailed(DivisionFields),
}

#[derive(Deserialize)]
struct DivisionFields {
    #[serde(default, alias = "cost", alias = "total")]
    amount: Money,
    #[serde(default, alias = "description", alias = "scope", deserialize_with = "lenient::string_list")]
    items: Vec<String>,
    #[serde(default, alias = "subcontractor_name", deserialize_with = "lenient::opt_string")]
    subcontractor: Option<String>,
    #[serde(default, alias = "sub_items")]
    line_items: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    provenance: Vec<String>,
}

impl From<DivisionRepr> for DivisionEntry {
    fn from(repr: DivisionRepr) -> Self {
        match repr {
            DivisionRepr::Amount(amount) => DivisionEntry::new(amount, Vec::new()),
            DivisionRepr::Detailed(f) => DivisionEntry {
                amount: f.amount,
                items: f.items,
                subcontractor: f.subcontractor,
                line_items: f.line_items.into_iter().map(LineItem::normalized).collect(),
                provenance: f.provenance,
            },
        }
    }
}

/// Sub-item of a division
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, alias = "name", alias = "item", deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, alias = "cost", alias = "total")]
    pub amount: Money,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: String,
    #[serde(default = "lenient::default_quantity", alias = "qty", deserialize_with = "lenient::quantity")]
    pub quantity: f64,
    #[serde(default, alias = "rate", skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Money>,
}

impl LineItem {
    /// Fill a missing amount from unit cost × quantity
    pub fn normalized(mut self) -> Self {
        if self.amount.is_zero() {
            if let Some(unit_cost) = self.unit_cost {
                if let Some(amount) = Money::from_dollars(unit_cost.as_dollars() * self.quantity) {
                    self.amount = amount;
                }
            }
        }
        self
    }
}

/// Trade entity responsible for one or more divisions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subcontractor {
    #[serde(default, alias = "company", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, alias = "scope", deserialize_with = "lenient::string")]
    pub trade: String,
    /// Division codes, ordered, no duplicates
    #[serde(
        default,
        alias = "csi_divisions",
        alias = "division",
        alias = "codes",
        deserialize_with = "lenient::string_list"
    )]
    pub divisions: Vec<String>,
    /// Aggregate contracted amount
    #[serde(default, alias = "total", alias = "cost", alias = "bid_amount")]
    pub amount: Money,
}

/// Auxiliary total not tied to a division
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PoolRepr")]
pub struct CostPool {
    pub total: Money,
    #[serde(default)]
    pub items: Vec<PoolItem>,
}

impl CostPool {
    pub fn add(&mut self, description: impl Into<String>, amount: Money) {
        self.total += amount;
        self.items.push(PoolItem {
            description: description.into(),
            amount,
        });
    }

    pub fn items_total(&self) -> Money {
        self.items.iter().map(|item| item.amount).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolItem {
    #[serde(default, alias = "name", alias = "item", deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, alias = "cost", alias = "total")]
    pub amount: Money,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PoolRepr {
    Amount(Money),
    Detailed {
        #[serde(default, alias = "amount")]
        total: Option<Money>,
        #[serde(default)]
        items: Vec<PoolItem>,
    },
}

impl From<PoolRepr> for CostPool {
    fn from(repr: PoolRepr) -> Self {
        match repr {
            PoolRepr::Amount(total) => CostPool {
                total,
                items: Vec::new(),
            },
            PoolRepr::Detailed { total, items } => {
                let total = total.unwrap_or_else(|| items.iter().map(|i| i.amount).sum());
                CostPool { total, items }
            }
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// JSON needed repair before it parsed
    StructureRepaired,
    /// Division code rewritten to two-digit form
    CodeNormalized,
    /// Two entries collapsed into one code
    DivisionsMerged,
    /// Code outside the taxonomy, value moved to uncategorized
    UnknownDivision,
    /// Obsolete composite division split
    DivisionSplit,
    /// Obsolete division renamed
    DivisionRenamed,
    /// Subcontractor division list or amount updated by migration
    SubcontractorRelinked,
    /// Subcontractor attached to an entry that had none
    SubcontractorBackfilled,
    /// Entry created from a subcontractor aggregate
    EntrySynthesized,
    SubcontractorDiscrepancy,
    GlobalDiscrepancy,
    UncategorizedFraction,
    /// Pool items do not add up to the pool total
    PoolItemMismatch,
    LowTotalCoverage,
    LowClassificationCoverage,
    HighUncategorizedFraction,
    /// Per-division traceability line
    DivisionBreakdown,
}

/// One diagnostic line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    /// Division code the finding concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn info(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Coverage metrics and findings for one record
///
/// A value object: it is returned to the caller and owns nothing of the
/// record it describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Classification total / target, percent, 2 decimals
    pub classification_coverage: f64,
    /// (Classification + auxiliary) / target, percent, clamped, 2 decimals
    pub total_coverage: f64,
    pub findings: Vec<Finding>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Append another report's findings and adopt its coverage figures
    pub fn merge(&mut self, other: DiagnosticReport) {
        self.classification_coverage = other.classification_coverage;
        self.total_coverage = other.total_coverage;
        self.findings.extend(other.findings);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    pub fn has(&self, kind: FindingKind) -> bool {
        self.count(kind) > 0
    }
}

/// Round to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole × 100`, rounded to 2 decimals; 0 when `whole` is not positive
pub fn percent_of(part: Money, whole: Money) -> f64 {
    part.ratio_of(whole).map(|r| round2(r * 100.0)).unwrap_or(0.0)
}
