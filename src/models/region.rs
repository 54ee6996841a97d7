//! States and districts extracted from upstream records.
//!
//! The upstream resource has no dedicated state/district endpoints; both
//! lists are distilled from performance rows, so the same state or
//! district appears once per reporting period. Deduplication keeps the
//! first-seen values in first-seen order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::api::RawRecord;

/// An Indian state as reported by the program data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub code: String,
    pub name: String,
}

/// A district, belonging to exactly one state by `state_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub code: String,
    pub name: String,
    pub state_code: String,
    pub state_name: String,
}

fn text(record: &RawRecord, key: &str) -> Option<String> {
    match record.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl State {
    /// Collect unique states from raw records, keyed by state code,
    /// preserving first-seen field values and encounter order.
    pub fn collect_unique(records: &[RawRecord]) -> Vec<State> {
        let mut seen = HashSet::new();
        let mut states = Vec::new();
        for record in records {
            let (Some(code), Some(name)) = (text(record, "state_code"), text(record, "state_name"))
            else {
                continue;
            };
            if seen.insert(code.clone()) {
                states.push(State { code, name });
            }
        }
        states
    }
}

impl District {
    /// Collect unique districts from raw records, keyed by district code,
    /// preserving first-seen field values and encounter order.
    pub fn collect_unique(records: &[RawRecord]) -> Vec<District> {
        let mut seen = HashSet::new();
        let mut districts = Vec::new();
        for record in records {
            let (Some(code), Some(name)) = (
                text(record, "district_code"),
                text(record, "district_name"),
            ) else {
                continue;
            };
            if seen.insert(code.clone()) {
                districts.push(District {
                    code,
                    name,
                    state_code: text(record, "state_code").unwrap_or_default(),
                    state_name: text(record, "state_name").unwrap_or_default(),
                });
            }
        }
        districts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_states_deduplicated_first_seen_order() {
        let records = vec![
            raw(&[("state_code", "09"), ("state_name", "Uttar Pradesh")]),
            raw(&[("state_code", "10"), ("state_name", "Bihar")]),
            // Repeat of 09 with a different incidental spelling: ignored
            raw(&[("state_code", "09"), ("state_name", "UTTAR PRADESH")]),
        ];

        let states = State::collect_unique(&records);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].code, "09");
        assert_eq!(states[0].name, "Uttar Pradesh");
        assert_eq!(states[1].code, "10");
    }

    #[test]
    fn test_records_missing_identity_fields_skipped() {
        let records = vec![
            raw(&[("state_name", "Bihar")]),
            raw(&[("state_code", "10")]),
            raw(&[("state_code", ""), ("state_name", "Bihar")]),
        ];
        assert!(State::collect_unique(&records).is_empty());
    }

    #[test]
    fn test_districts_keep_first_seen_values() {
        let records = vec![
            raw(&[
                ("district_code", "0911"),
                ("district_name", "Agra"),
                ("state_code", "09"),
                ("state_name", "Uttar Pradesh"),
            ]),
            raw(&[
                ("district_code", "0911"),
                ("district_name", "AGRA"),
                ("state_code", "09"),
                ("state_name", "Uttar Pradesh"),
            ]),
            raw(&[
                ("district_code", "0912"),
                ("district_name", "Aligarh"),
                ("state_code", "09"),
                ("state_name", "Uttar Pradesh"),
            ]),
        ];

        let districts = District::collect_unique(&records);
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[0].name, "Agra");
        assert_eq!(districts[1].name, "Aligarh");
    }

    #[test]
    fn test_numeric_codes_accepted() {
        let mut record = RawRecord::new();
        record.insert("state_code".into(), json!(9));
        record.insert("state_name".into(), json!("Uttar Pradesh"));
        let states = State::collect_unique(&[record]);
        assert_eq!(states[0].code, "9");
    }
}
