//! Record parsing and mandatory-field validation
//!
//! Builds a `CostRecord` from sanitized JSON. Mandatory fields
//! (`contractor_name`, `total_amount`) are checked here, before any
//! migration or reconciliation runs. Everything else is optional and parsed
//! leniently: common key aliases are accepted, the division map may arrive
//! as an object keyed by code or as an array of objects carrying a `code`.

use crate::error::ValidationError;
use crate::lenient::value_to_text;
use crate::types::{CostPool, CostRecord, DivisionEntry, Subcontractor};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tally_common::Money;
use tracing::debug;

const NAME_KEYS: &[&str] = &["contractor_name", "contractor", "bidder", "bidder_name", "company", "name"];
const TOTAL_KEYS: &[&str] = &["total_amount", "total", "total_bid", "bid_total", "grand_total"];
const DIVISION_KEYS: &[&str] = &["csi_divisions", "divisions", "csi_breakdown", "breakdown"];
const SUBCONTRACTOR_KEYS: &[&str] = &["subcontractors", "subs", "trades"];
const OVERHEAD_KEYS: &[&str] = &["overhead", "overhead_total"];
const ALLOWANCE_KEYS: &[&str] = &["allowances", "allowance"];
const UNCATEGORIZED_KEYS: &[&str] = &["uncategorized", "unclassified", "other_costs"];
const CODE_KEYS: &[&str] = &["code", "division", "csi_code", "division_code"];

/// Build a record from sanitized JSON
pub fn parse_record(value: &Value) -> Result<CostRecord, ValidationError> {
    let map = match value {
        Value::Object(map) => map,
        other => return Err(ValidationError::NotAnObject(json_kind(other))),
    };

    let contractor_name = lookup(map, NAME_KEYS)
        .and_then(value_to_text)
        .filter(|name| !name.is_empty())
        .ok_or(ValidationError::MissingField("contractor_name"))?;

    let total_value = lookup(map, TOTAL_KEYS).ok_or(ValidationError::MissingField("total_amount"))?;
    let total_amount = Money::deserialize(total_value).map_err(|e| ValidationError::InvalidField {
        field: "total_amount",
        reason: e.to_string(),
    })?;
    if !total_amount.is_positive() {
        return Err(ValidationError::InvalidField {
            field: "total_amount",
            reason: format!("must be positive, got {}", total_amount),
        });
    }

    let csi_divisions = match lookup(map, DIVISION_KEYS) {
        Some(divisions) => parse_divisions(divisions)?,
        None => BTreeMap::new(),
    };

    let subcontractors = match lookup(map, SUBCONTRACTOR_KEYS) {
        Some(subs) => parse_subcontractors(subs)?,
        None => Vec::new(),
    };

    let record = CostRecord {
        contractor_name,
        total_amount,
        csi_divisions,
        subcontractors,
        overhead: parse_pool(map, OVERHEAD_KEYS, "overhead")?,
        allowances: parse_pool(map, ALLOWANCE_KEYS, "allowances")?,
        uncategorized: parse_pool(map, UNCATEGORIZED_KEYS, "uncategorized")?,
        coverage_percentage: 0.0,
    };

    debug!(
        contractor = %record.contractor_name,
        total = %record.total_amount,
        divisions = record.csi_divisions.len(),
        subcontractors = record.subcontractors.len(),
        "Record parsed"
    );

    Ok(record)
}

fn parse_divisions(value: &Value) -> Result<BTreeMap<String, DivisionEntry>, ValidationError> {
    let mut divisions = BTreeMap::new();

    match value {
        Value::Object(map) => {
            for (code, entry) in map {
                let parsed = DivisionEntry::deserialize(entry).map_err(|e| invalid("csi_divisions", code, e))?;
                divisions.insert(code.trim().to_string(), parsed);
            }
        }
        Value::Array(entries) => {
            for (index, entry) in entries.iter().enumerate() {
                let code = entry
                    .as_object()
                    .and_then(|obj| lookup(obj, CODE_KEYS))
                    .and_then(value_to_text)
                    .filter(|code| !code.is_empty())
                    .ok_or_else(|| ValidationError::InvalidField {
                        field: "csi_divisions",
                        reason: format!("entry {} has no division code", index),
                    })?;
                let parsed = DivisionEntry::deserialize(entry).map_err(|e| invalid("csi_divisions", &code, e))?;
                match divisions.get_mut(&code) {
                    Some(existing) => DivisionEntry::absorb(existing, parsed),
                    None => {
                        divisions.insert(code, parsed);
                    }
                }
            }
        }
        Value::Null => {}
        other => {
            return Err(ValidationError::InvalidField {
                field: "csi_divisions",
                reason: format!("expected object or array, found {}", json_kind(other)),
            })
        }
    }

    Ok(divisions)
}

fn parse_subcontractors(value: &Value) -> Result<Vec<Subcontractor>, ValidationError> {
    let raw: Vec<Subcontractor> = match value {
        Value::Null => Vec::new(),
        Value::Object(_) => vec![Subcontractor::deserialize(value).map_err(|e| invalid("subcontractors", "0", e))?],
        _ => Vec::<Subcontractor>::deserialize(value).map_err(|e| ValidationError::InvalidField {
            field: "subcontractors",
            reason: e.to_string(),
        })?,
    };

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, mut sub)| {
            if sub.name.is_empty() {
                sub.name = format!("Subcontractor {}", index + 1);
            }
            dedup_preserving_order(&mut sub.divisions);
            sub
        })
        .collect())
}

fn parse_pool(map: &Map<String, Value>, keys: &[&str], field: &'static str) -> Result<CostPool, ValidationError> {
    match lookup(map, keys) {
        Some(value) => CostPool::deserialize(value).map_err(|e| ValidationError::InvalidField {
            field,
            reason: e.to_string(),
        }),
        None => Ok(CostPool::default()),
    }
}

/// First non-null value among `keys`
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

pub(crate) fn dedup_preserving_order(values: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

fn invalid(field: &'static str, key: &str, error: serde_json::Error) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: format!("{}: {}", key, error),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_record() {
        let record = parse_record(&json!({"contractor_name": "Acme", "total_amount": "$1,000"})).unwrap();
        assert_eq!(record.contractor_name, "Acme");
        assert_eq!(record.total_amount, Money::dollars(1_000));
        assert!(record.csi_divisions.is_empty());
        assert_eq!(record.overhead, CostPool::default());
    }

    #[test]
    fn test_missing_mandatory_fields() {
        assert_eq!(
            parse_record(&json!({"total_amount": 10})),
            Err(ValidationError::MissingField("contractor_name"))
        );
        assert_eq!(
            parse_record(&json!({"contractor_name": "  ", "total": 10})),
            Err(ValidationError::MissingField("contractor_name"))
        );
        assert_eq!(
            parse_record(&json!({"contractor_name": "Acme"})),
            Err(ValidationError::MissingField("total_amount"))
        );
        assert_eq!(
            parse_record(&json!({"contractor_name": "Acme", "total_amount": null})),
            Err(ValidationError::MissingField("total_amount"))
        );
    }

    #[test]
    fn test_invalid_total() {
        assert!(matches!(
            parse_record(&json!({"contractor_name": "Acme", "total_amount": 0})),
            Err(ValidationError::InvalidField { field: "total_amount", .. })
        ));
        assert!(matches!(
            parse_record(&json!({"contractor_name": "Acme", "total_amount": "TBD"})),
            Err(ValidationError::InvalidField { field: "total_amount", .. })
        ));
        assert_eq!(parse_record(&json!([1, 2])), Err(ValidationError::NotAnObject("array")));
    }

    #[test]
    fn test_division_array_form_merges_duplicates() {
        let record = parse_record(&json!({
            "bidder": "Acme",
            "total": 100,
            "divisions": [
                {"code": "03", "amount": 10, "items": ["Footings"]},
                {"division": "03", "cost": 5, "items": "Slab"},
                {"code": 9, "amount": 1}
            ]
        }))
        .unwrap();

        assert_eq!(record.csi_divisions.len(), 2);
        assert_eq!(record.csi_divisions["03"].amount, Money::dollars(15));
        assert_eq!(record.csi_divisions["03"].items, vec!["Footings", "Slab"]);
        assert!(record.csi_divisions.contains_key("9"));
    }

    #[test]
    fn test_division_array_requires_code() {
        let err = parse_record(&json!({
            "contractor_name": "Acme",
            "total_amount": 100,
            "csi_divisions": [{"amount": 10}]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "csi_divisions", .. }));
    }

    #[test]
    fn test_subcontractor_normalization() {
        let record = parse_record(&json!({
            "contractor_name": "Acme",
            "total_amount": 100,
            "subcontractors": [
                {"name": "Acme Plumbing", "trade": "Plumbing", "divisions": ["22", "22"], "amount": "50,000"},
                {"trade": "Electrical", "division": 26, "total": 10}
            ]
        }))
        .unwrap();

        assert_eq!(record.subcontractors[0].divisions, vec!["22"]);
        assert_eq!(record.subcontractors[0].amount, Money::dollars(50_000));
        assert_eq!(record.subcontractors[1].name, "Subcontractor 2");
        assert_eq!(record.subcontractors[1].divisions, vec!["26"]);
    }

    #[test]
    fn test_generator_coverage_is_ignored() {
        let record = parse_record(&json!({
            "contractor_name": "Acme",
            "total_amount": 100,
            "coverage_percentage": 250
        }))
        .unwrap();
        assert_eq!(record.coverage_percentage, 0.0);
    }
}
