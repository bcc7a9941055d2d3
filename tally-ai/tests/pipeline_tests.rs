//! Ingest pipeline integration tests
//!
//! End-to-end runs from raw generator text to record + report, including
//! the migration, synthesis and coverage scenarios.

mod helpers;

use helpers::{coverage_scenario_json, default_pipeline, load_fixture, wrap_in_prose};
use serde_json::json;
use tally_ai::types::round2;
use tally_ai::{FindingKind, IngestError, Pipeline, Severity, ValidationError};
use tally_common::config::TallyConfig;
use tally_common::Money;
use tempfile::TempDir;

// =============================================================================
// Migration
// =============================================================================

#[test]
fn test_composite_division_split_through_pipeline() {
    let raw = json!({
        "contractor_name": "Allied Mechanical",
        "total_amount": 100000,
        "csi_divisions": {
            "15": {"amount": 100000, "items": ["mechanical", "fire sprinkler system", "plumbing fixtures"]}
        }
    })
    .to_string();

    let analysis = default_pipeline().process(&raw).unwrap();
    let divisions = &analysis.record.csi_divisions;

    assert!(!divisions.contains_key("15"));
    assert_eq!(divisions["21"].amount, Money::dollars(15_000));
    assert_eq!(divisions["22"].amount, Money::dollars(34_000));
    assert_eq!(divisions["23"].amount, Money::dollars(51_000));
    assert_eq!(analysis.record.classification_total(), Money::dollars(100_000));
    assert_eq!(analysis.report.count(FindingKind::DivisionSplit), 1);
    assert_eq!(analysis.record.coverage_percentage, 100.0);
}

#[test]
fn test_split_percentages_follow_configuration() {
    let config = TallyConfig::from_toml_str(
        r#"
        [migration]
        fire_suppression_percent = 20.0
        plumbing_percent = 25.0
        "#,
    )
    .unwrap();

    let raw = r#"{"contractor_name": "X", "total_amount": 1000,
                  "csi_divisions": {"15": {"amount": 1000, "items": ["sprinklers", "sanitary piping"]}}}"#;
    let analysis = Pipeline::new(&config).process(raw).unwrap();

    assert_eq!(analysis.record.csi_divisions["21"].amount, Money::dollars(200));
    assert_eq!(analysis.record.csi_divisions["22"].amount, Money::dollars(200));
    assert_eq!(analysis.record.csi_divisions["23"].amount, Money::dollars(600));
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn test_missing_critical_division_synthesized() {
    let raw = json!({
        "contractor_name": "Harbor General",
        "total_amount": 500000,
        "csi_divisions": {"03": {"amount": 450000, "items": ["Concrete"]}},
        "subcontractors": [
            {"name": "Acme Plumbing", "trade": "Plumbing", "divisions": ["22"], "amount": 50000}
        ]
    })
    .to_string();

    let analysis = default_pipeline().process(&raw).unwrap();
    let entry = &analysis.record.csi_divisions["22"];

    assert_eq!(entry.amount, Money::dollars(50_000));
    assert_eq!(entry.subcontractor.as_deref(), Some("Acme Plumbing"));
    assert!(entry.provenance.iter().any(|p| p.contains("Acme Plumbing")));
    assert_eq!(analysis.report.count(FindingKind::EntrySynthesized), 1);
    assert_eq!(analysis.record.coverage_percentage, 100.0);
}

#[test]
fn test_single_critical_reference_synthesizes_full_amount() {
    for (code, dollars) in [("21", 12_345), ("23", 1), ("26", 987_654), ("28", 40_000)] {
        let raw = json!({
            "contractor_name": "GC",
            "total_amount": 1000000,
            "subcontractors": [{"name": "Trade Co", "divisions": [code], "amount": dollars}]
        })
        .to_string();

        let analysis = default_pipeline().process(&raw).unwrap();
        assert_eq!(analysis.record.csi_divisions.len(), 1);
        assert_eq!(analysis.record.csi_divisions[code].amount, Money::dollars(dollars));
    }
}

#[test]
fn test_critical_divisions_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[reconciliation]
critical_divisions = ["14"]
"#,
    )
    .unwrap();
    let pipeline = Pipeline::new(&TallyConfig::load(&path).unwrap());

    let raw = json!({
        "contractor_name": "GC",
        "total_amount": 200000,
        "subcontractors": [
            {"name": "Lift Co", "trade": "Elevators", "divisions": ["14"], "amount": 100000},
            {"name": "Acme Plumbing", "trade": "Plumbing", "divisions": ["22"], "amount": 100000}
        ]
    })
    .to_string();
    let analysis = pipeline.process(&raw).unwrap();

    assert_eq!(analysis.record.csi_divisions["14"].amount, Money::dollars(100_000));
    assert!(!analysis.record.csi_divisions.contains_key("22"));
    assert!(analysis.report.has(FindingKind::SubcontractorDiscrepancy));
}

// =============================================================================
// Coverage
// =============================================================================

#[test]
fn test_low_total_coverage_scenario() {
    let analysis = default_pipeline().process(&coverage_scenario_json()).unwrap();

    assert_eq!(analysis.report.total_coverage, 90.0);
    assert_eq!(analysis.report.classification_coverage, 70.0);
    assert_eq!(analysis.record.coverage_percentage, 70.0);

    let low_total = analysis
        .report
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::LowTotalCoverage)
        .unwrap();
    assert_eq!(low_total.severity, Severity::Warning);
    assert!(low_total.message.contains("90.00%"));
}

#[test]
fn test_total_coverage_matches_formula_regardless_of_order() {
    let orderings = [
        r#"{"contractor_name": "A", "total_amount": 30000,
            "csi_divisions": {"03": 10000, "09": 7777.77, "05": 3333.33},
            "overhead": 1234.56, "allowances": 99.99}"#,
        r#"{"allowances": 99.99, "overhead": 1234.56,
            "csi_divisions": [{"code": "05", "amount": 3333.33}, {"code": "09", "amount": 7777.77}, {"code": "03", "amount": 10000}],
            "total_amount": 30000, "contractor_name": "A"}"#,
        r#"{"total_amount": "$30,000", "contractor_name": "A",
            "csi_divisions": {"09": "7,777.77", "05": {"amount": "3333.33"}, "03": {"cost": 10000}},
            "overhead": {"total": 1234.56}, "allowances": {"items": [{"description": "x", "amount": 99.99}]}}"#,
    ];

    let accounted = 10_000.0 + 7_777.77 + 3_333.33 + 1_234.56 + 99.99;
    let expected = round2(accounted / 30_000.0 * 100.0).clamp(0.0, 100.0);

    for raw in orderings {
        let analysis = default_pipeline().process(raw).unwrap();
        assert_eq!(analysis.report.total_coverage, expected, "input: {}", raw);
    }
}

#[test]
fn test_total_coverage_clamped_when_over_accounted() {
    let raw = r#"{"contractor_name": "A", "total_amount": 100,
                  "csi_divisions": {"03": 90}, "overhead": 50}"#;
    let analysis = default_pipeline().process(raw).unwrap();

    assert_eq!(analysis.report.total_coverage, 100.0);
    assert!(analysis.report.has(FindingKind::GlobalDiscrepancy));
}

// =============================================================================
// Realistic generator output
// =============================================================================

#[test]
fn test_generator_fixture_end_to_end() {
    let analysis = default_pipeline().process(&load_fixture("generator_output.txt")).unwrap();
    let record = &analysis.record;
    let report = &analysis.report;

    assert_eq!(record.contractor_name, "Ridgeline Builders, Inc.");
    assert_eq!(record.total_amount, Money::dollars(2_450_000));

    let codes: Vec<&str> = record.csi_divisions.keys().map(String::as_str).collect();
    assert_eq!(codes, vec!["03", "04", "09", "21", "22", "23", "26", "27", "28"]);

    // Literal braces and commas inside items are preserved
    assert_eq!(record.csi_divisions["03"].items[1], "Slab on grade {level 1}");
    assert_eq!(record.csi_divisions["09"].items[1], "Paint: walls, ceilings");

    // Mechanical split 90,000 / 204,000 / 306,000
    assert_eq!(record.csi_divisions["21"].amount, Money::dollars(90_000));
    assert_eq!(record.csi_divisions["22"].amount, Money::dollars(204_000));
    assert_eq!(record.csi_divisions["23"].amount, Money::dollars(306_000));
    assert_eq!(record.csi_divisions["21"].line_items[0].amount, Money::dollars(25_500));
    assert_eq!(record.csi_divisions["21"].subcontractor.as_deref(), Some("Keystone Fire Protection"));

    // Electrical renamed, subcontractors relinked
    assert_eq!(record.csi_divisions["26"].amount, Money::dollars(380_000));
    assert_eq!(record.subcontractors[0].divisions, vec!["26"]);
    assert_eq!(record.subcontractors[1].divisions, vec!["21"]);
    assert_eq!(record.subcontractors[1].amount, Money::dollars(90_000));

    // Low-voltage scope synthesized from the subcontractor aggregate
    assert_eq!(record.csi_divisions["27"].amount, Money::dollars(60_000));
    assert_eq!(record.csi_divisions["28"].amount, Money::dollars(60_000));

    // Unknown division parked in uncategorized
    assert_eq!(record.uncategorized.total, Money::dollars(15_000));

    assert_eq!(record.coverage_percentage, 82.24);
    assert_eq!(report.total_coverage, 100.0);
    assert!(report.has(FindingKind::StructureRepaired));
    assert!(report.has(FindingKind::UnknownDivision));

    let warning_kinds: Vec<FindingKind> = report.warnings().map(|f| f.kind).collect();
    assert_eq!(
        warning_kinds,
        vec![FindingKind::UnknownDivision, FindingKind::LowClassificationCoverage]
    );
}

#[test]
fn test_reprocessing_output_is_stable() {
    let pipeline = default_pipeline();
    let first = pipeline.process(&load_fixture("generator_output.txt")).unwrap();

    let serialized = serde_json::to_string(&first.record).unwrap();
    let second = pipeline.process(&serialized).unwrap();

    assert_eq!(second.record, first.record);
    assert!(!second.report.has(FindingKind::DivisionSplit));
    assert!(!second.report.has(FindingKind::EntrySynthesized));
}

#[test]
fn test_prose_wrapped_response() {
    let raw = wrap_in_prose(&coverage_scenario_json());
    let analysis = default_pipeline().process(&raw).unwrap();
    assert_eq!(analysis.record.contractor_name, "Summit Construction");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_validation_errors_stop_the_pipeline() {
    let cases = [
        (r#"{"total_amount": 100}"#, ValidationError::MissingField("contractor_name")),
        (r#"{"contractor_name": "A"}"#, ValidationError::MissingField("total_amount")),
    ];
    for (raw, expected) in cases {
        match default_pipeline().process(raw) {
            Err(IngestError::Validation(err)) => assert_eq!(err, expected),
            other => panic!("expected validation error for {}, got {:?}", raw, other),
        }
    }

    let negative = default_pipeline().process(r#"{"contractor_name": "A", "total_amount": "(500)"}"#);
    assert!(matches!(
        negative,
        Err(IngestError::Validation(ValidationError::InvalidField { field: "total_amount", .. }))
    ));
}

#[test]
fn test_unrecoverable_text_is_parse_failure() {
    let raw = format!("Here you go: {{\"contractor_name\": \"A\" :: {} }}", "z".repeat(300));
    match default_pipeline().process(&raw) {
        Err(IngestError::Parse(failure)) => {
            assert!(!failure.message.is_empty());
            assert!(failure.context.chars().count() <= 200);
        }
        other => panic!("expected parse failure, got {:?}", other),
    }
}
