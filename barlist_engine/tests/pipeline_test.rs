//! End-to-end pipeline tests: document text in, published JSON artifact out.

use barlist_engine::config::ReconcileConfig;
use barlist_engine::metrics::{FileMetricsSource, MetricsSource};
use barlist_engine::models::discrepancy::DiscrepancyKind;
use barlist_engine::models::verification::{VerificationResult, VerificationStatus};
use barlist_engine::report::ReportWriter;
use barlist_engine::verify_document;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

const DOCUMENT: &str = "\
Client Silver Stock Holdings
C.O.B: 13 February 2026
Total Allocated Bar Count: 3
Total Allocated Gross Weight: 3,052.600
Bar Number Refiner Long Gross Weight Fine Weight Bar Assay Vault Name
4005 KAZZINC 1,060.100 0.000 0.9999 2015 LONDON A
1E 452-11 STATE REFINERIES 992.500 0.000 0.9990 LONDON A
77812 AURUBIS AG 1,000.000 0.000 0.9999 2018 LONDON B
End of Silver
";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()
}

#[test]
fn clean_run_against_matching_metrics_verifies_ok() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileMetricsSource::new(dir.path());
    std::fs::write(
        source.path_for("wisdomtree", date()),
        r#"{"total_oz": "3052.6000", "reported_bar_count": 3}"#,
    )
    .unwrap();
    let metrics = source.get_metrics("wisdomtree", date()).unwrap();

    let run = verify_document(
        "wisdomtree",
        "wisdomtree",
        date(),
        DOCUMENT,
        metrics.as_ref(),
        None,
        &ReconcileConfig::default(),
    )
    .unwrap();

    assert_eq!(run.result.status, VerificationStatus::Ok);
    assert_eq!(run.result.bar_count, 3);
    assert_eq!(run.result.total_weight_oz, dec!(3052.6000));
    assert_eq!(run.records.len(), 3);
    assert_eq!(run.records[1].serial, "1E45211");
}

#[test]
fn missing_bar_between_runs_is_reported_and_persisted() {
    let cfg = ReconcileConfig::default();
    let first = verify_document("wisdomtree", "wisdomtree", date(), DOCUMENT, None, None, &cfg)
        .unwrap();

    // Next day's list no longer carries serial 4005.
    let shrunk: String = DOCUMENT
        .lines()
        .filter(|l| !l.starts_with("4005"))
        .map(|l| format!("{l}\n"))
        .collect();
    let next_date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
    let second = verify_document(
        "wisdomtree",
        "wisdomtree",
        next_date,
        &shrunk,
        None,
        Some(&first.records),
        &cfg,
    )
    .unwrap();

    let missing: Vec<_> = second
        .result
        .discrepancies
        .iter()
        .filter(|d| d.kind == DiscrepancyKind::MissingBar)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].details["serial"], "4005");

    // Shrinking the list also breaks the declared header totals.
    assert!(second
        .result
        .discrepancies
        .iter()
        .any(|d| d.kind == DiscrepancyKind::HeaderMismatch));

    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path());
    let path = writer.write(&second.result).unwrap();
    let read_back: VerificationResult =
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(read_back, second.result);
}

#[test]
fn identical_runs_publish_byte_identical_artifacts() {
    let cfg = ReconcileConfig::default();
    let previous =
        verify_document("wisdomtree", "wisdomtree", date(), DOCUMENT, None, None, &cfg)
            .unwrap()
            .records;

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let mut payloads = Vec::new();
    for dir in [&dir_a, &dir_b] {
        let run = verify_document(
            "wisdomtree",
            "wisdomtree",
            date(),
            DOCUMENT,
            None,
            Some(&previous),
            &cfg,
        )
        .unwrap();
        let path = ReportWriter::new(dir.path()).write(&run.result).unwrap();
        payloads.push(std::fs::read(path).unwrap());
    }
    assert_eq!(payloads[0], payloads[1]);
}

#[test]
fn unparseable_document_surfaces_as_a_parse_error() {
    let err = verify_document(
        "invesco",
        "invesco",
        date(),
        "nothing that looks like a weight list",
        None,
        None,
        &ReconcileConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, barlist_engine::errors::Error::Parse(_)));

    // The caller records the failure as a terminal status, still persisted.
    let result = VerificationResult::fetch_failed("invesco", date(), None);
    let dir = tempfile::tempdir().unwrap();
    let path = ReportWriter::new(dir.path()).write(&result).unwrap();
    let read_back: VerificationResult =
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(read_back.status, VerificationStatus::FetchFailed);
    assert_eq!(read_back.bar_count, 0);
}
