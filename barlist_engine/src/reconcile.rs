//! The reconciliation core: compares the current snapshot against fund
//! metrics and the previous snapshot, classifies discrepancies, and builds
//! the [`VerificationResult`].
//!
//! The reconciler is a pure function of its inputs — cross-run state (the
//! previous snapshot) is passed in by the caller, never read from anywhere
//! else. Discrepancies are emitted in a fixed kind order and sorted within
//! each kind, so the serialized result is deterministic and diffable day
//! over day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::adapters::DocumentHeader;
use crate::aggregate::InventorySummary;
use crate::config::ReconcileConfig;
use crate::metrics::FundMetrics;
use crate::models::bar::BarRecord;
use crate::models::discrepancy::{Discrepancy, DiscrepancyKind};
use crate::models::verification::{VerificationResult, VerificationStatus};
use crate::normalize::{canonicalize_serial, NormalizationError};

/// Everything one reconciliation pass consumes.
pub struct ReconcileInputs<'a> {
    /// Fund the snapshot belongs to.
    pub fund_id: &'a str,
    /// Custodian that published the bar list.
    pub provider: &'a str,
    /// The run's snapshot date.
    pub snapshot_date: NaiveDate,
    /// Current snapshot, as normalized (duplicates included).
    pub current: &'a [BarRecord],
    /// Aggregates recomputed from `current`.
    pub summary: &'a InventorySummary,
    /// Rows that failed normalization this run.
    pub failures: &'a [NormalizationError],
    /// Fund self-reported totals; `None` skips the fund-level comparisons.
    pub metrics: Option<&'a FundMetrics>,
    /// The previous run's record set; `None` on the first run.
    pub previous: Option<&'a [BarRecord]>,
    /// The document's self-declared totals.
    pub header: &'a DocumentHeader,
}

/// Runs every check in the fixed detection order and assembles the result.
pub fn reconcile(inputs: &ReconcileInputs<'_>, cfg: &ReconcileConfig) -> VerificationResult {
    let mut findings = Vec::new();

    detect_duplicate_serials(inputs, &mut findings);
    collect_parse_failures(inputs, &mut findings);
    detect_weight_mismatch(inputs, cfg, &mut findings);
    detect_count_mismatch(inputs, &mut findings);
    detect_missing_bars(inputs, &mut findings);
    detect_vault_anomalies(inputs, cfg, &mut findings);
    detect_header_mismatch(inputs, cfg, &mut findings);

    // All findings surface; there is no silent-pass threshold.
    let status = if findings.is_empty() {
        VerificationStatus::Ok
    } else {
        VerificationStatus::DiscrepancyFound
    };

    VerificationResult {
        fund_id: inputs.fund_id.to_string(),
        snapshot_date: inputs.snapshot_date,
        bar_count: inputs.summary.total.bar_count,
        total_weight_oz: inputs.summary.total.total_weight_oz,
        fund_reported_oz: inputs.metrics.map(|m| m.total_oz),
        discrepancies: findings,
        status,
    }
}

fn finding(
    inputs: &ReconcileInputs<'_>,
    kind: DiscrepancyKind,
    details: BTreeMap<String, String>,
) -> Discrepancy {
    Discrepancy::new(kind, inputs.snapshot_date, details)
}

/// Same `(serial, provider)` listed more than once in one snapshot.
fn detect_duplicate_serials(inputs: &ReconcileInputs<'_>, out: &mut Vec<Discrepancy>) {
    let mut by_serial: BTreeMap<&str, Vec<&BarRecord>> = BTreeMap::new();
    for record in inputs.current {
        by_serial.entry(record.serial.as_str()).or_default().push(record);
    }

    for (serial, group) in by_serial {
        if group.len() < 2 {
            continue;
        }
        let weights = group
            .iter()
            .map(|r| r.weight_oz.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let details = BTreeMap::from([
            ("serial".to_string(), serial.to_string()),
            ("occurrences".to_string(), group.len().to_string()),
            ("weights_oz".to_string(), weights),
        ]);
        out.push(finding(inputs, DiscrepancyKind::DuplicateSerial, details));
    }
}

/// One `parse_failure` finding per row that failed normalization.
fn collect_parse_failures(inputs: &ReconcileInputs<'_>, out: &mut Vec<Discrepancy>) {
    let mut failures: Vec<&NormalizationError> = inputs.failures.iter().collect();
    failures.sort_by_key(|f| (f.serial().to_string(), f.to_string()));

    for failure in failures {
        let details = BTreeMap::from([
            ("serial".to_string(), failure.serial().to_string()),
            ("error".to_string(), failure.to_string()),
        ]);
        out.push(finding(inputs, DiscrepancyKind::ParseFailure, details));
    }
}

/// Bar-list total vs fund-reported ounces, relative to tolerance.
fn detect_weight_mismatch(
    inputs: &ReconcileInputs<'_>,
    cfg: &ReconcileConfig,
    out: &mut Vec<Discrepancy>,
) {
    let Some(metrics) = inputs.metrics else {
        return; // comparison skipped, not failed
    };
    if metrics.total_oz <= Decimal::ZERO {
        return;
    }

    let total = inputs.summary.total.total_weight_oz;
    let difference = (total - metrics.total_oz).abs();
    let deviation = difference / metrics.total_oz;
    if deviation <= cfg.weight_tolerance {
        return;
    }

    let details = BTreeMap::from([
        ("fund_reported_oz".to_string(), metrics.total_oz.to_string()),
        ("barlist_total_oz".to_string(), total.to_string()),
        ("difference_oz".to_string(), difference.to_string()),
        (
            "relative_deviation".to_string(),
            deviation
                .round_dp_with_strategy(6, RoundingStrategy::MidpointNearestEven)
                .to_string(),
        ),
        ("tolerance".to_string(), cfg.weight_tolerance.to_string()),
    ]);
    out.push(finding(inputs, DiscrepancyKind::WeightMismatch, details));
}

/// Parsed bar count vs fund-published bar count.
fn detect_count_mismatch(inputs: &ReconcileInputs<'_>, out: &mut Vec<Discrepancy>) {
    let Some(reported) = inputs.metrics.and_then(|m| m.reported_bar_count) else {
        return;
    };
    let parsed = inputs.summary.total.bar_count;
    if parsed == reported {
        return;
    }

    let details = BTreeMap::from([
        ("reported_bar_count".to_string(), reported.to_string()),
        ("parsed_bar_count".to_string(), parsed.to_string()),
    ]);
    out.push(finding(inputs, DiscrepancyKind::CountMismatch, details));
}

/// Serials present last run, absent now, with no disclosed removal.
fn detect_missing_bars(inputs: &ReconcileInputs<'_>, out: &mut Vec<Discrepancy>) {
    let Some(previous) = inputs.previous else {
        return; // first run, nothing to compare against
    };

    let current: BTreeSet<&str> = inputs.current.iter().map(|r| r.serial.as_str()).collect();
    let disclosed: BTreeSet<String> = inputs
        .metrics
        .and_then(|m| m.disclosed_removals.as_ref())
        .map(|serials| serials.iter().map(|s| canonicalize_serial(s)).collect())
        .unwrap_or_default();

    let mut prev_by_serial: BTreeMap<&str, &BarRecord> = BTreeMap::new();
    for record in previous {
        if record.source_provider == inputs.provider {
            prev_by_serial.entry(record.serial.as_str()).or_insert(record);
        }
    }

    for (serial, record) in prev_by_serial {
        if current.contains(serial) || disclosed.contains(serial) {
            continue;
        }
        let details = BTreeMap::from([
            ("serial".to_string(), serial.to_string()),
            ("brand".to_string(), record.brand.clone()),
            ("vault".to_string(), record.vault.clone()),
            ("last_weight_oz".to_string(), record.weight_oz.to_string()),
        ]);
        out.push(finding(inputs, DiscrepancyKind::MissingBar, details));
    }
}

/// Vault or brand changed between snapshots for a surviving serial.
fn detect_vault_anomalies(
    inputs: &ReconcileInputs<'_>,
    cfg: &ReconcileConfig,
    out: &mut Vec<Discrepancy>,
) {
    if !cfg.flag_transfers {
        return;
    }
    let Some(previous) = inputs.previous else {
        return;
    };

    let mut current_by_serial: BTreeMap<&str, &BarRecord> = BTreeMap::new();
    for record in inputs.current {
        current_by_serial.entry(record.serial.as_str()).or_insert(record);
    }

    let mut prev_by_serial: BTreeMap<&str, &BarRecord> = BTreeMap::new();
    for record in previous {
        if record.source_provider == inputs.provider {
            prev_by_serial.entry(record.serial.as_str()).or_insert(record);
        }
    }

    for (serial, prev) in prev_by_serial {
        let Some(cur) = current_by_serial.get(serial) else {
            continue;
        };

        let mut details = BTreeMap::new();
        if prev.vault != cur.vault {
            details.insert("previous_vault".to_string(), prev.vault.clone());
            details.insert("current_vault".to_string(), cur.vault.clone());
        }
        if prev.brand != cur.brand {
            details.insert("previous_brand".to_string(), prev.brand.clone());
            details.insert("current_brand".to_string(), cur.brand.clone());
        }
        if details.is_empty() {
            continue;
        }
        details.insert("serial".to_string(), serial.to_string());
        out.push(finding(inputs, DiscrepancyKind::VaultAnomaly, details));
    }
}

/// The document's own declared totals vs what its rows add up to.
fn detect_header_mismatch(
    inputs: &ReconcileInputs<'_>,
    cfg: &ReconcileConfig,
    out: &mut Vec<Discrepancy>,
) {
    if let Some(declared) = inputs.header.declared_bar_count {
        let parsed = inputs.summary.total.bar_count;
        if declared != parsed {
            let details = BTreeMap::from([
                ("declared_bar_count".to_string(), declared.to_string()),
                ("parsed_bar_count".to_string(), parsed.to_string()),
            ]);
            out.push(finding(inputs, DiscrepancyKind::HeaderMismatch, details));
        }
    }

    if let Some(declared) = inputs.header.declared_total_oz {
        let parsed = inputs.summary.total.total_weight_oz;
        let difference = (parsed - declared).abs();
        if difference > cfg.header_weight_tolerance_oz {
            let details = BTreeMap::from([
                ("declared_total_oz".to_string(), declared.to_string()),
                ("parsed_total_oz".to_string(), parsed.to_string()),
                ("difference_oz".to_string(), difference.to_string()),
            ]);
            out.push(finding(inputs, DiscrepancyKind::HeaderMismatch, details));
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::aggregate::aggregate;
    use crate::models::discrepancy::Severity;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()
    }

    fn bar(serial: &str, vault: &str, weight: Decimal) -> BarRecord {
        BarRecord {
            serial: serial.to_string(),
            weight_oz: weight,
            brand: "KAZZINC".to_string(),
            vault: vault.to_string(),
            source_provider: "wisdomtree".to_string(),
            snapshot_date: date(),
        }
    }

    fn metrics(total_oz: Decimal, bar_count: Option<u64>) -> FundMetrics {
        FundMetrics {
            fund_id: "wisdomtree".to_string(),
            snapshot_date: date(),
            total_oz,
            reported_bar_count: bar_count,
            disclosed_removals: None,
        }
    }

    fn run(
        current: &[BarRecord],
        failures: &[NormalizationError],
        m: Option<&FundMetrics>,
        previous: Option<&[BarRecord]>,
        header: &DocumentHeader,
        cfg: &ReconcileConfig,
    ) -> VerificationResult {
        let summary = aggregate(current);
        reconcile(
            &ReconcileInputs {
                fund_id: "wisdomtree",
                provider: "wisdomtree",
                snapshot_date: date(),
                current,
                summary: &summary,
                failures,
                metrics: m,
                previous,
                header,
            },
            cfg,
        )
    }

    #[test]
    fn clean_snapshot_is_ok() {
        let current = vec![bar("A1", "LONDON A", dec!(1000)), bar("B2", "LONDON B", dec!(999))];
        let m = metrics(dec!(1999), Some(2));
        let result = run(&current, &[], Some(&m), None, &DocumentHeader::default(), &ReconcileConfig::default());

        assert_eq!(result.status, VerificationStatus::Ok);
        assert!(result.discrepancies.is_empty());
        assert_eq!(result.bar_count, 2);
        assert_eq!(result.fund_reported_oz, Some(dec!(1999)));
    }

    #[test]
    fn duplicate_serial_is_one_finding_referencing_both_weights() {
        let current = vec![
            bar("A1", "LONDON A", dec!(962.2)),
            bar("A1", "LONDON A", dec!(950.0)),
        ];
        let result = run(&current, &[], None, None, &DocumentHeader::default(), &ReconcileConfig::default());

        let dups: Vec<_> = result
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::DuplicateSerial)
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Critical);
        assert_eq!(dups[0].details["serial"], "A1");
        assert_eq!(dups[0].details["occurrences"], "2");
        assert_eq!(dups[0].details["weights_oz"], "962.2; 950.0");
        assert_eq!(result.status, VerificationStatus::DiscrepancyFound);
    }

    #[test]
    fn parse_failures_surface_as_warnings() {
        let current = vec![bar("A1", "LONDON A", dec!(1000))];
        let failures = vec![NormalizationError::UnparseableWeight {
            serial: "B7".to_string(),
            raw: "--".to_string(),
        }];
        let result = run(&current, &failures, None, None, &DocumentHeader::default(), &ReconcileConfig::default());

        let finding = &result.discrepancies[0];
        assert_eq!(finding.kind, DiscrepancyKind::ParseFailure);
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.details["serial"], "B7");
        assert_eq!(result.status, VerificationStatus::DiscrepancyFound);
    }

    #[test]
    fn weight_inside_tolerance_passes() {
        // 999 / 1,000,000 = 0.0999% <= 0.1%
        let current = vec![bar("A1", "LONDON A", dec!(1000999))];
        let m = metrics(dec!(1000000), None);
        let result = run(&current, &[], Some(&m), None, &DocumentHeader::default(), &ReconcileConfig::default());
        assert_eq!(result.status, VerificationStatus::Ok);
    }

    #[test]
    fn weight_beyond_tolerance_is_critical() {
        // 1001 / 1,000,000 = 0.1001% > 0.1%
        let current = vec![bar("A1", "LONDON A", dec!(1001001))];
        let m = metrics(dec!(1000000), None);
        let result = run(&current, &[], Some(&m), None, &DocumentHeader::default(), &ReconcileConfig::default());

        let finding = &result.discrepancies[0];
        assert_eq!(finding.kind, DiscrepancyKind::WeightMismatch);
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.details["difference_oz"], "1001");
        assert_eq!(finding.details["relative_deviation"], "0.001001");
    }

    #[test]
    fn count_mismatch_is_a_warning() {
        let current = vec![bar("A1", "LONDON A", dec!(1000))];
        let m = metrics(dec!(1000), Some(2));
        let result = run(&current, &[], Some(&m), None, &DocumentHeader::default(), &ReconcileConfig::default());

        let finding = &result.discrepancies[0];
        assert_eq!(finding.kind, DiscrepancyKind::CountMismatch);
        assert_eq!(finding.details["reported_bar_count"], "2");
        assert_eq!(finding.details["parsed_bar_count"], "1");
    }

    #[test]
    fn missing_bar_is_detected_against_previous_snapshot() {
        let previous = vec![bar("ABC123", "LONDON A", dec!(1000)), bar("D4", "LONDON A", dec!(999))];
        let current = vec![bar("D4", "LONDON A", dec!(999))];
        let result = run(&current, &[], None, Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        let missing: Vec<_> = result
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::MissingBar)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].details["serial"], "ABC123");
        assert_eq!(missing[0].severity, Severity::Critical);
    }

    #[test]
    fn disclosed_removal_suppresses_missing_bar() {
        let previous = vec![bar("ABC123", "LONDON A", dec!(1000))];
        let current: Vec<BarRecord> = vec![bar("D4", "LONDON A", dec!(999))];
        let mut m = metrics(dec!(999), None);
        m.disclosed_removals = Some(vec!["abc 123".to_string()]);
        let result = run(&current, &[], Some(&m), Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        assert!(result
            .discrepancies
            .iter()
            .all(|d| d.kind != DiscrepancyKind::MissingBar));
    }

    #[test]
    fn vault_transfer_is_informational() {
        let previous = vec![bar("A1", "LONDON A", dec!(1000))];
        let current = vec![bar("A1", "LONDON B", dec!(1000))];
        let m = metrics(dec!(1000), Some(1));
        let result = run(&current, &[], Some(&m), Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        let finding = &result.discrepancies[0];
        assert_eq!(finding.kind, DiscrepancyKind::VaultAnomaly);
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.details["previous_vault"], "LONDON A");
        assert_eq!(finding.details["current_vault"], "LONDON B");
        assert_eq!(result.status, VerificationStatus::DiscrepancyFound);
    }

    #[test]
    fn vault_transfers_can_be_muted() {
        let previous = vec![bar("A1", "LONDON A", dec!(1000))];
        let current = vec![bar("A1", "LONDON B", dec!(1000))];
        let cfg = ReconcileConfig {
            flag_transfers: false,
            ..ReconcileConfig::default()
        };
        let result = run(&current, &[], None, Some(&previous), &DocumentHeader::default(), &cfg);
        assert_eq!(result.status, VerificationStatus::Ok);
    }

    #[test]
    fn header_totals_are_cross_checked() {
        let current = vec![bar("A1", "LONDON A", dec!(1000))];
        let header = DocumentHeader {
            as_of: None,
            declared_bar_count: Some(2),
            declared_total_oz: Some(dec!(1900)),
        };
        let result = run(&current, &[], None, None, &header, &ReconcileConfig::default());

        let headers: Vec<_> = result
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::HeaderMismatch)
            .collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].details["declared_bar_count"], "2");
        assert_eq!(headers[1].details["difference_oz"], "900");
    }

    #[test]
    fn no_metrics_skips_fund_level_checks_only() {
        let previous = vec![bar("GONE1", "LONDON A", dec!(1000)), bar("A1", "LONDON A", dec!(1000))];
        let current = vec![
            bar("A1", "LONDON A", dec!(1000)),
            bar("A1", "LONDON A", dec!(1000)),
        ];
        let failures = vec![NormalizationError::EmptySerial { raw: "-".to_string() }];
        let result = run(&current, &failures, None, Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        let kinds: Vec<_> = result.discrepancies.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiscrepancyKind::DuplicateSerial));
        assert!(kinds.contains(&DiscrepancyKind::ParseFailure));
        assert!(kinds.contains(&DiscrepancyKind::MissingBar));
        assert!(!kinds.contains(&DiscrepancyKind::WeightMismatch));
        assert!(!kinds.contains(&DiscrepancyKind::CountMismatch));
        assert_eq!(result.status, VerificationStatus::DiscrepancyFound);
    }

    #[test]
    fn findings_are_emitted_in_fixed_kind_order_and_sorted_within_kind() {
        let previous = vec![
            bar("ZZ9", "LONDON A", dec!(1)),
            bar("AA1", "LONDON A", dec!(1)),
        ];
        let current = vec![
            bar("M5", "LONDON A", dec!(1)),
            bar("C3", "LONDON A", dec!(1)),
            bar("C3", "LONDON A", dec!(1)),
            bar("B2", "LONDON A", dec!(1)),
            bar("B2", "LONDON A", dec!(1)),
        ];
        let result = run(&current, &[], None, Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        let kinds: Vec<_> = result.discrepancies.iter().map(|d| d.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);

        let dup_serials: Vec<_> = result
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::DuplicateSerial)
            .map(|d| d.details["serial"].clone())
            .collect();
        assert_eq!(dup_serials, vec!["B2", "C3"]);

        let missing_serials: Vec<_> = result
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::MissingBar)
            .map(|d| d.details["serial"].clone())
            .collect();
        assert_eq!(missing_serials, vec!["AA1", "ZZ9"]);
    }

    #[test]
    fn identical_inputs_reconcile_identically() {
        let previous = vec![bar("GONE1", "LONDON A", dec!(1000))];
        let current = vec![bar("A1", "LONDON B", dec!(999.9999))];
        let m = metrics(dec!(1100), Some(2));

        let a = run(&current, &[], Some(&m), Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());
        let b = run(&current, &[], Some(&m), Some(&previous), &DocumentHeader::default(), &ReconcileConfig::default());

        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
