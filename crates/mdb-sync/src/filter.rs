//! Per-table record filters.
//!
//! `in_table` rules restrict a table to records whose column value appears in
//! a column of a table synced earlier in the same run. Those value sets are
//! captured after the earlier table's own filters have been applied.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::{FilterRule, TableConfig};
use crate::core::Record;

/// Value sets captured from earlier tables, keyed by `(table, column)`.
#[derive(Debug, Default)]
pub struct CapturedSets {
    sets: HashMap<(String, String), HashSet<String>>,
}

impl CapturedSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the non-empty values of `column` across `records`.
    pub fn capture(&mut self, table: &str, column: &str, records: &[Record]) {
        let values: HashSet<String> = records
            .iter()
            .filter_map(|r| r.text(column))
            .map(str::to_string)
            .collect();
        debug!("{}: captured {} distinct {} values", table, values.len(), column);
        self.sets
            .insert((table.to_string(), column.to_string()), values);
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&HashSet<String>> {
        self.sets.get(&(table.to_string(), column.to_string()))
    }
}

/// `(table, column)` pairs that later tables filter against.
pub fn required_captures(tables: &[TableConfig]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for table in tables {
        for rule in &table.filters {
            if let FilterRule::InTable {
                table: source,
                table_column,
                ..
            } = rule
            {
                let pair = (source.clone(), table_column.clone());
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

/// Apply all rules of a table; a record must satisfy every rule.
///
/// An `in_table` rule whose set was never captured (its table failed or was
/// skipped) matches nothing.
pub fn apply_filters(
    table: &str,
    records: Vec<Record>,
    rules: &[FilterRule],
    captured: &CapturedSets,
) -> Vec<Record> {
    if rules.is_empty() {
        return records;
    }

    for rule in rules {
        if let FilterRule::InTable {
            table: source,
            table_column,
            ..
        } = rule
        {
            if captured.get(source, table_column).is_none() {
                warn!(
                    "{}: no {}.{} values available for filtering; no records will pass",
                    table, source, table_column
                );
            }
        }
    }

    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| rules.iter().all(|rule| matches(r, rule, captured)))
        .collect();
    debug!("{}: filters kept {} of {} records", table, kept.len(), before);
    kept
}

/// Check a single rule. Absent and empty values compare as empty text.
pub fn matches(record: &Record, rule: &FilterRule, captured: &CapturedSets) -> bool {
    match rule {
        FilterRule::Equals { column, value } => record.text(column).unwrap_or("") == value,
        FilterRule::NotEquals { column, value } => record.text(column).unwrap_or("") != value,
        FilterRule::InTable {
            column,
            table,
            table_column,
        } => match (record.text(column), captured.get(table, table_column)) {
            (Some(v), Some(set)) => set.contains(v),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socio(num: &str, baja: &str) -> Record {
        Record::from_pairs([("NUMSOCIO", num), ("BAJA", baja)])
    }

    #[test]
    fn test_equals_and_not_equals() {
        let rules = vec![FilterRule::Equals {
            column: "BAJA".into(),
            value: "0".into(),
        }];
        let kept = apply_filters(
            "Socios",
            vec![socio("1", "0"), socio("2", "1"), socio("3", "")],
            &rules,
            &CapturedSets::new(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text("NUMSOCIO"), Some("1"));

        let rules = vec![FilterRule::NotEquals {
            column: "BAJA".into(),
            value: "1".into(),
        }];
        let kept = apply_filters(
            "Socios",
            vec![socio("1", "0"), socio("2", "1"), socio("3", "")],
            &rules,
            &CapturedSets::new(),
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_in_table_uses_captured_set() {
        let mut captured = CapturedSets::new();
        captured.capture("Socios", "NUMSOCIO", &[socio("A1", "0"), socio("", "0")]);
        assert_eq!(captured.get("Socios", "NUMSOCIO").map(HashSet::len), Some(1));

        let rule = FilterRule::InTable {
            column: "SOCLIQUIDA".into(),
            table: "Socios".into(),
            table_column: "NUMSOCIO".into(),
        };
        let records = vec![
            Record::from_pairs([("SOCLIQUIDA", "A1")]),
            Record::from_pairs([("SOCLIQUIDA", "B2")]),
            Record::from_pairs([("SOCLIQUIDA", "")]),
        ];
        let kept = apply_filters("Liquidaciones", records, &[rule], &captured);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_in_table_without_capture_matches_nothing() {
        let rule = FilterRule::InTable {
            column: "SOCLIQUIDA".into(),
            table: "Socios".into(),
            table_column: "NUMSOCIO".into(),
        };
        let records = vec![Record::from_pairs([("SOCLIQUIDA", "A1")])];
        assert!(apply_filters("Liquidaciones", records, &[rule], &CapturedSets::new()).is_empty());
    }

    #[test]
    fn test_required_captures_are_deduplicated() {
        let rule = FilterRule::InTable {
            column: "SOCLIQUIDA".into(),
            table: "Socios".into(),
            table_column: "NUMSOCIO".into(),
        };
        let tables = vec![
            TableConfig::incremental("Socios", &["NUMSOCIO"]),
            TableConfig::incremental("Liquidaciones", &["CUPLIQUIDA"]).with_filter(rule.clone()),
            TableConfig::incremental("Comentarios", &["IdComment"]).with_filter(rule),
        ];
        assert_eq!(
            required_captures(&tables),
            vec![("Socios".to_string(), "NUMSOCIO".to_string())]
        );
    }
}
