//! End-to-end: raw CSV text → normalisation → aggregation → export.

use pretty_assertions::assert_eq;
use tractrisk_common::{DuplicatePolicy, GeometryRegistry, IndexConfig, MissingValuePolicy};
use tractrisk_ingestion::dataset_loader::parse_csv;
use tractrisk_ingestion::IdentifierNormaliser;
use tractrisk_ranker::export::{to_csv_string, RiskSummary};
use tractrisk_ranker::{aggregate, AggregateOptions, Diagnostic, ScoreStatus, WeightMap};

const DEMOGRAPHIC: &str = "\
Tract ID,Pop 65 Plus,Living Alone
1400000US21111000100,12,30
 1400000US21111000200 ,18,50
1400000US21111000300,30,
";

const CLINICAL: &str = "\
tractid,Depression,Living Alone
21111000100,20,31
21111000200,24,49
21111000400,99,99
";

fn registry() -> GeometryRegistry {
    GeometryRegistry::from_ids(["21111000100", "21111000200", "21111000300"])
}

#[test]
fn test_full_run_from_profile() {
    let normaliser = IdentifierNormaliser::default();
    let demographic = normaliser.normalise_table(parse_csv("DemographicFactorData", DEMOGRAPHIC, 0, None).unwrap());
    let clinical = normaliser.normalise_table(parse_csv("ClinicalFactorData", CLINICAL, 0, None).unwrap());

    let profile: IndexConfig = serde_yaml::from_str(
        r#"
name: isolation
weights:
  Living Alone: 1
  livingalone_clinicalfactordata: 1
  depression: 2
scoring:
  missing_values: renormalise
"#,
    )
    .unwrap();

    let options = AggregateOptions::from_profile(&profile, normaliser);
    let weights = WeightMap::from_profile(&profile);
    let outcome = aggregate(&registry(), &[&demographic, &clinical], &weights, &options).unwrap();

    assert_eq!(outcome.table.len(), 3);
    assert_eq!(
        outcome.status,
        ScoreStatus::Computed {
            columns: vec![
                "depression".to_string(),
                "livingalone".to_string(),
                "livingalone_clinicalfactordata".to_string(),
            ]
        }
    );

    // (2*20 + 30 + 31) / 4
    assert_eq!(outcome.table.risk_index("21111000100"), Some(25.25));
    // (2*24 + 50 + 49) / 4
    assert_eq!(outcome.table.risk_index("21111000200"), Some(36.75));
    // no weighted value present at all
    assert_eq!(outcome.table.risk_index("21111000300"), None);

    let summary = RiskSummary::from_table(&outcome.table);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.max, Some(36.75));

    let csv = to_csv_string(&outcome.table, &["depression".to_string(), "livingalone".to_string()]).unwrap();
    assert_eq!(
        csv,
        "tractid_short,depression,livingalone,risk_index\n\
         21111000100,20,30,25.25\n\
         21111000200,24,50,36.75\n\
         21111000300,,,\n"
    );
}

#[test]
fn test_duplicate_rows_never_inflate_output() {
    let normaliser = IdentifierNormaliser::default();
    let dup_csv = "tractid,x\n21111000100,1\n1400000US21111000100,3\n21111000200,5\n";
    let dup = normaliser.normalise_table(parse_csv("Dup", dup_csv, 0, None).unwrap());
    let weights: WeightMap = [("x", 1.0)].into_iter().collect();

    for policy in [DuplicatePolicy::Reject, DuplicatePolicy::KeepFirst, DuplicatePolicy::Mean] {
        let options = AggregateOptions {
            normaliser: normaliser.clone(),
            duplicates: policy,
            missing_values: MissingValuePolicy::ZeroFill,
        };
        let outcome = aggregate(&registry(), &[&dup], &weights, &options).unwrap();
        assert_eq!(outcome.table.len(), 3, "policy {policy:?}");
        let duplicate_reports = outcome
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DuplicateIdentifiers { .. }))
            .count();
        assert_eq!(duplicate_reports, 1, "policy {policy:?}");
    }
}
