//! Anomaly findings emitted by the reconciler.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The class of inconsistency a [`Discrepancy`] reports.
///
/// Variant order is the reconciler's detection and emission order; the
/// derived `Ord` keeps serialized output diffable day over day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Same `(serial, provider)` appears more than once in one snapshot.
    DuplicateSerial,
    /// A raw row failed normalization and was excluded from the record set.
    ParseFailure,
    /// Bar-list total weight deviates from the fund's reported ounces
    /// beyond the configured tolerance.
    WeightMismatch,
    /// Parsed bar count differs from the fund's published bar count.
    CountMismatch,
    /// A previously listed serial vanished with no disclosed removal.
    MissingBar,
    /// A bar's vault or brand changed between snapshots.
    VaultAnomaly,
    /// The document's own declared totals disagree with its parsed rows.
    HeaderMismatch,
}

impl DiscrepancyKind {
    /// The fixed severity assigned to this kind of finding.
    pub fn severity(self) -> Severity {
        match self {
            DiscrepancyKind::DuplicateSerial => Severity::Critical,
            DiscrepancyKind::ParseFailure => Severity::Warning,
            DiscrepancyKind::WeightMismatch => Severity::Critical,
            DiscrepancyKind::CountMismatch => Severity::Warning,
            DiscrepancyKind::MissingBar => Severity::Critical,
            DiscrepancyKind::VaultAnomaly => Severity::Info,
            DiscrepancyKind::HeaderMismatch => Severity::Warning,
        }
    }
}

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One anomaly finding with its free-form evidence fields.
///
/// Evidence lives in an ordered map so two runs over identical inputs
/// serialize byte-identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub details: BTreeMap<String, String>,
    pub snapshot_date: NaiveDate,
}

impl Discrepancy {
    /// Builds a finding of `kind` with its fixed severity.
    pub fn new(
        kind: DiscrepancyKind,
        snapshot_date: NaiveDate,
        details: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            details,
            snapshot_date,
        }
    }
}
