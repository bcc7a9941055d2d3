//! Test Helper Utilities
//!
//! Shared fixtures for tally-ai integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use tally_ai::Pipeline;

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Contents of a file under `tests/fixtures`
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// Wrap a JSON body in the kind of prose generators put around it
pub fn wrap_in_prose(json: &str) -> String {
    format!(
        "Sure! Here is the structured breakdown you asked for:\n\n{}\n\nLet me know if you need changes.",
        json
    )
}

pub fn default_pipeline() -> Pipeline {
    Pipeline::default()
}

/// Target 1,000,000; divisions 700,000; overhead 100,000; allowances
/// 50,000; uncategorized 50,000
pub fn coverage_scenario_json() -> String {
    r#"{
  "contractor_name": "Summit Construction",
  "total_amount": 1000000,
  "csi_divisions": {
    "03": {"amount": 300000, "items": ["Foundations", "Slab on grade"]},
    "05": {"amount": 150000, "items": ["Structural steel"]},
    "09": {"amount": 250000, "items": ["Drywall", "Paint"]}
  },
  "overhead": {"total": 100000, "items": [{"description": "General conditions", "amount": 100000}]},
  "allowances": {"total": 50000, "items": [{"description": "Owner contingency", "amount": 50000}]},
  "uncategorized": 50000
}"#
    .to_string()
}
