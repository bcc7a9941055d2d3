//! Configuration loading and resolution
//!
//! Engine thresholds, split percentages and keyword families are business
//! heuristics, so they live in a TOML file rather than in code. Every section
//! and field is optional; missing values fall back to built-in defaults.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `TALLY_CONFIG` environment variable
//! 3. User config file (`~/.config/tally/config.toml` on Linux)
//! 4. Built-in defaults (fallback)

use crate::{Error, Money, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TALLY_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub logging: LoggingConfig,
    pub migration: MigrationConfig,
    pub reconciliation: ReconciliationConfig,
    pub audit: AuditConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Obsolete-division migration heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Share of a composite mechanical amount assigned to fire suppression
    pub fire_suppression_percent: f64,
    /// Share of the remainder (after fire) assigned to plumbing
    pub plumbing_percent: f64,
    /// Case-insensitive substrings marking fire-suppression scope
    pub fire_keywords: Vec<String>,
    /// Case-insensitive substrings marking plumbing scope
    pub plumbing_keywords: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            fire_suppression_percent: 15.0,
            plumbing_percent: 40.0,
            fire_keywords: to_strings(&[
                "fire",
                "sprinkler",
                "suppression",
                "standpipe",
                "deluge",
                "fm-200",
                "fm200",
            ]),
            plumbing_keywords: to_strings(&[
                "plumbing",
                "plumber",
                "water",
                "fixture",
                "sanitary",
                "sewer",
                "drain",
                "lavator",
                "toilet",
                "urinal",
                "faucet",
                "sink",
                "gas piping",
            ]),
        }
    }
}

impl MigrationConfig {
    pub fn fire_suppression_bps(&self) -> u32 {
        percent_to_bps(self.fire_suppression_percent)
    }

    pub fn plumbing_bps(&self) -> u32 {
        percent_to_bps(self.plumbing_percent)
    }
}

/// Cross-entity reconciliation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Divisions representing core trade systems, eligible for gap synthesis
    pub critical_divisions: Vec<String>,
    /// Relative gap (fraction of the subcontractor amount) before flagging
    pub subcontractor_relative_threshold: f64,
    /// Absolute gap in dollars before flagging
    pub subcontractor_absolute_floor: f64,
    /// Fraction of the target total that may go unexplained
    pub global_discrepancy_threshold: f64,
    /// Fraction of the target total that may sit in the uncategorized pool
    pub uncategorized_fraction_threshold: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            critical_divisions: to_strings(&["21", "22", "23", "26", "27", "28"]),
            subcontractor_relative_threshold: 0.20,
            subcontractor_absolute_floor: 5_000.0,
            global_discrepancy_threshold: 0.05,
            uncategorized_fraction_threshold: 0.20,
        }
    }
}

impl ReconciliationConfig {
    pub fn subcontractor_floor(&self) -> Money {
        Money::from_dollars(self.subcontractor_absolute_floor).unwrap_or(Money::ZERO)
    }
}

/// Completeness audit thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Minimum total coverage (percent) before warning
    pub min_total_coverage: f64,
    /// Minimum classification coverage (percent) before warning
    pub min_classification_coverage: f64,
    /// Maximum uncategorized fraction of the target total before warning
    pub max_uncategorized_fraction: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            min_total_coverage: 99.0,
            min_classification_coverage: 85.0,
            max_uncategorized_fraction: 0.25,
        }
    }
}

impl TallyConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TallyConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration following the priority order in the module docs
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the engine cannot use
    pub fn validate(&self) -> Result<()> {
        check_percent("migration.fire_suppression_percent", self.migration.fire_suppression_percent)?;
        check_percent("migration.plumbing_percent", self.migration.plumbing_percent)?;

        let r = &self.reconciliation;
        check_non_negative("reconciliation.subcontractor_relative_threshold", r.subcontractor_relative_threshold)?;
        check_non_negative("reconciliation.subcontractor_absolute_floor", r.subcontractor_absolute_floor)?;
        check_non_negative("reconciliation.global_discrepancy_threshold", r.global_discrepancy_threshold)?;
        check_non_negative("reconciliation.uncategorized_fraction_threshold", r.uncategorized_fraction_threshold)?;
        if Money::from_dollars(r.subcontractor_absolute_floor).is_none() {
            return Err(Error::Config(format!(
                "reconciliation.subcontractor_absolute_floor out of range: {}",
                r.subcontractor_absolute_floor
            )));
        }

        let a = &self.audit;
        check_percent("audit.min_total_coverage", a.min_total_coverage)?;
        check_percent("audit.min_classification_coverage", a.min_classification_coverage)?;
        check_non_negative("audit.max_uncategorized_fraction", a.max_uncategorized_fraction)?;

        Ok(())
    }
}

/// Locate the config file to load, if any
///
/// An explicit CLI or environment path is returned even when it does not
/// exist, so that a typo surfaces as a load error instead of silently
/// falling back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config file
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`<config_dir>/tally/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tally").join("config.toml"))
}

fn percent_to_bps(percent: f64) -> u32 {
    (percent.clamp(0.0, 100.0) * 100.0).round() as u32
}

fn check_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Config(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
