//! Left join of one dataset onto the output table.
//!
//! The steps are kept separate so each precondition is explicit:
//! key extraction → duplicate resolution → column renaming → join.
//! The join itself never adds or removes output rows.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tractrisk_common::{Dataset, DuplicatePolicy, FieldValue};
use tractrisk_ingestion::{normalise_field_name, IdentifierNormaliser};

use crate::table::OutputTable;

/// A dataset row with its canonical identifier.
pub type KeyedRow = (String, Vec<FieldValue>);

/// Rows keyed by canonical identifier, plus how many had a blank key.
#[derive(Debug, Clone)]
pub struct KeyedRows {
    pub rows: Vec<KeyedRow>,
    pub blank_keys: usize,
}

/// Pair every row with its canonical identifier. Identifiers are
/// normalised again here; normalisation is idempotent, so a dataset that
/// already went through the normaliser is unaffected.
pub fn keyed_rows(dataset: &Dataset, key_idx: usize, normaliser: &IdentifierNormaliser) -> KeyedRows {
    let mut blank_keys = 0usize;
    let rows = dataset
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let id = normaliser.normalise(dataset.value(i, key_idx));
            if id.is_empty() {
                blank_keys += 1;
                None
            } else {
                Some((id, row.clone()))
            }
        })
        .collect();
    KeyedRows { rows, blank_keys }
}

/// Identifiers occurring more than once, in order of first appearance.
pub fn duplicate_ids(rows: &[KeyedRow]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (id, _) in rows {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    let mut reported = HashSet::new();
    rows.iter()
        .filter(|(id, _)| counts[id.as_str()] > 1 && reported.insert(id.as_str()))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Make identifiers unique according to `policy`.
/// `None` means the dataset must not be joined (`Reject` with duplicates).
pub fn resolve_duplicates(rows: Vec<KeyedRow>, policy: DuplicatePolicy) -> Option<Vec<KeyedRow>> {
    if duplicate_ids(&rows).is_empty() {
        return Some(rows);
    }
    match policy {
        DuplicatePolicy::Reject => None,
        DuplicatePolicy::KeepFirst => {
            let mut seen = HashSet::new();
            Some(rows.into_iter().filter(|(id, _)| seen.insert(id.clone())).collect())
        }
        DuplicatePolicy::Mean => {
            let mut order: Vec<String> = Vec::new();
            let mut groups: HashMap<String, Vec<Vec<FieldValue>>> = HashMap::new();
            for (id, row) in rows {
                groups
                    .entry(id.clone())
                    .or_insert_with(|| {
                        order.push(id);
                        Vec::new()
                    })
                    .push(row);
            }
            Some(
                order
                    .into_iter()
                    .map(|id| {
                        let merged = mean_row(&groups[&id]);
                        (id, merged)
                    })
                    .collect(),
            )
        }
    }
}

/// Column-wise merge of rows sharing an identifier: numeric columns are
/// averaged over their non-null values, anything else keeps the first
/// non-null value.
fn mean_row(rows: &[Vec<FieldValue>]) -> Vec<FieldValue> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            let cells: Vec<&FieldValue> = rows
                .iter()
                .filter_map(|r| r.get(col))
                .filter(|v| !v.is_null())
                .collect();
            let numbers: Vec<f64> = cells.iter().filter_map(|v| v.as_f64()).collect();
            if !numbers.is_empty() && numbers.len() == cells.len() {
                FieldValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
            } else {
                cells.first().map(|v| (*v).clone()).unwrap_or(FieldValue::Null)
            }
        })
        .collect()
}

/// Output names for the dataset's non-key columns, as `(dataset column, name)`.
///
/// A name already present in the table (or reserved) becomes
/// `<name>_<dataset name>`, with the dataset name normalised like a header;
/// if that is taken too a numeric suffix is added. Deterministic for a
/// given table state and dataset.
pub fn resolve_column_names(table: &OutputTable, dataset: &Dataset, key_idx: usize) -> Vec<(usize, String)> {
    let suffix = normalise_field_name(&dataset.name);
    let mut assigned: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(dataset.columns.len().saturating_sub(1));

    for (i, name) in dataset.columns.iter().enumerate() {
        if i == key_idx {
            continue;
        }
        let free = |candidate: &str| !table.is_taken(candidate) && !assigned.contains(candidate);
        let resolved = if free(name) {
            name.clone()
        } else {
            let base = format!("{name}_{suffix}");
            if free(&base) {
                base
            } else {
                let mut n = 2usize;
                loop {
                    let candidate = format!("{base}_{n}");
                    if free(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };
        assigned.insert(resolved.clone());
        out.push((i, resolved));
    }
    out
}

/// What one join did to the table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinReport {
    /// Output names of the columns added
    pub columns: Vec<String>,
    /// `(original, renamed)` for every column renamed to avoid a collision
    pub renamed: Vec<(String, String)>,
    /// Output rows that found a dataset row
    pub matched: usize,
    /// Dataset rows whose identifier is not in the registry
    pub unmatched: usize,
}

/// Left-join unique-keyed `rows` of `dataset` onto `table`. Output rows
/// without a match keep nulls for the new columns.
pub fn left_join(table: &mut OutputTable, dataset: &Dataset, key_idx: usize, rows: &[KeyedRow]) -> JoinReport {
    let names = resolve_column_names(table, dataset, key_idx);

    let unmatched = {
        let registry_ids: HashSet<&str> = table.rows().iter().map(|r| r.tract_id.as_str()).collect();
        rows.iter().filter(|(id, _)| !registry_ids.contains(id.as_str())).count()
    };

    let mut report = JoinReport {
        unmatched,
        ..JoinReport::default()
    };
    let mut mapping: Vec<(usize, usize)> = Vec::with_capacity(names.len());
    for (ds_idx, name) in names {
        let original = &dataset.columns[ds_idx];
        if *original != name {
            report.renamed.push((original.clone(), name.clone()));
        }
        report.columns.push(name.clone());
        mapping.push((ds_idx, table.push_column(name, &dataset.name)));
    }

    let lookup: HashMap<&str, &Vec<FieldValue>> = rows.iter().map(|(id, row)| (id.as_str(), row)).collect();
    for out_row in table.rows_mut() {
        if let Some(src) = lookup.get(out_row.tract_id.as_str()) {
            for &(ds_idx, out_idx) in &mapping {
                out_row.values[out_idx] = src.get(ds_idx).cloned().unwrap_or(FieldValue::Null);
            }
            report.matched += 1;
        }
    }
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tractrisk_common::GeometryRegistry;

    fn dataset(name: &str, columns: &[&str], rows: Vec<Vec<FieldValue>>) -> Dataset {
        Dataset {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn keyed(ds: &Dataset) -> Vec<KeyedRow> {
        keyed_rows(ds, 0, &IdentifierNormaliser::default()).rows
    }

    #[test]
    fn test_keyed_rows_normalises_and_drops_blank() {
        let ds = dataset(
            "D",
            &["tractid", "x"],
            vec![
                vec!["1400000US A ".into(), FieldValue::Number(1.0)],
                vec![FieldValue::Null, FieldValue::Number(2.0)],
            ],
        );
        let keyed = keyed_rows(&ds, 0, &IdentifierNormaliser::default());
        assert_eq!(keyed.rows.len(), 1);
        assert_eq!(keyed.rows[0].0, "A");
        assert_eq!(keyed.blank_keys, 1);
    }

    #[test]
    fn test_duplicate_ids_in_first_appearance_order() {
        let rows: Vec<KeyedRow> = ["B", "A", "B", "A", "C"]
            .iter()
            .map(|id| (id.to_string(), vec![]))
            .collect();
        assert_eq!(duplicate_ids(&rows), vec!["B", "A"]);
    }

    #[test]
    fn test_resolve_duplicates_policies() {
        let rows = vec![
            ("A".to_string(), vec![FieldValue::from("A"), FieldValue::Number(10.0), "first".into()]),
            ("A".to_string(), vec![FieldValue::from("A"), FieldValue::Number(20.0), "second".into()]),
            ("B".to_string(), vec![FieldValue::from("B"), FieldValue::Null, FieldValue::Null]),
        ];

        assert!(resolve_duplicates(rows.clone(), DuplicatePolicy::Reject).is_none());

        let first = resolve_duplicates(rows.clone(), DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].1[1], FieldValue::Number(10.0));

        let mean = resolve_duplicates(rows, DuplicatePolicy::Mean).unwrap();
        assert_eq!(mean.len(), 2);
        assert_eq!(mean[0].0, "A");
        assert_eq!(mean[0].1[1], FieldValue::Number(15.0));
        assert_eq!(mean[0].1[2], FieldValue::from("first"));
        assert_eq!(mean[1].1[1], FieldValue::Null);
    }

    #[test]
    fn test_unique_rows_pass_reject() {
        let rows = vec![("A".to_string(), vec![]), ("B".to_string(), vec![])];
        assert_eq!(resolve_duplicates(rows, DuplicatePolicy::Reject).map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_left_join_preserves_registry_and_fills_nulls() {
        let mut table = OutputTable::from_registry(&GeometryRegistry::from_ids(["A", "B", "C"]));
        let ds = dataset(
            "Dataset1",
            &["tractid", "x"],
            vec![
                vec!["A".into(), FieldValue::Number(10.0)],
                vec!["B".into(), FieldValue::Number(20.0)],
                vec!["Z".into(), FieldValue::Number(99.0)],
            ],
        );
        let report = left_join(&mut table, &ds, 0, &keyed(&ds));

        assert_eq!(table.len(), 3);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(table.value("A", "x"), Some(&FieldValue::Number(10.0)));
        assert_eq!(table.value("C", "x"), Some(&FieldValue::Null));
        assert!(!table.has_column("tractid"));
    }

    #[test]
    fn test_collisions_are_suffixed_with_dataset_name() {
        let mut table = OutputTable::from_registry(&GeometryRegistry::from_ids(["A"]));
        let d1 = dataset("Dataset1", &["tractid", "count"], vec![vec!["A".into(), FieldValue::Number(1.0)]]);
        let d2 = dataset("Dataset2", &["tractid", "count", "risk_index"], vec![vec!["A".into(), FieldValue::Number(2.0), FieldValue::Number(3.0)]]);

        left_join(&mut table, &d1, 0, &keyed(&d1));
        let report = left_join(&mut table, &d2, 0, &keyed(&d2));

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["count", "count_dataset2", "risk_index_dataset2"]);
        assert_eq!(
            report.renamed,
            vec![
                ("count".to_string(), "count_dataset2".to_string()),
                ("risk_index".to_string(), "risk_index_dataset2".to_string()),
            ]
        );
        assert_eq!(table.value("A", "count"), Some(&FieldValue::Number(1.0)));
        assert_eq!(table.value("A", "count_dataset2"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn test_repeated_collision_gets_numeric_suffix() {
        let mut table = OutputTable::from_registry(&GeometryRegistry::from_ids(["A"]));
        let d = dataset("Survey", &["tractid", "score"], vec![vec!["A".into(), FieldValue::Number(1.0)]]);
        left_join(&mut table, &d, 0, &keyed(&d));
        left_join(&mut table, &d, 0, &keyed(&d));
        left_join(&mut table, &d, 0, &keyed(&d));
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["score", "score_survey", "score_survey_2"]);
    }
}
