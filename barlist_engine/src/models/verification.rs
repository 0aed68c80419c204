//! The persisted outcome of one fund/date verification run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::discrepancy::{Discrepancy, Severity};

/// Terminal status of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The discrepancy list is empty.
    Ok,
    /// At least one discrepancy of any severity was found.
    DiscrepancyFound,
    /// No document could be obtained or parsed for this fund/date;
    /// reconciliation did not run.
    FetchFailed,
}

/// Top-level persisted artifact for one fund/date.
///
/// Field declaration order is the serialization order, and the struct carries
/// no timestamps or other runtime metadata: two runs over identical inputs
/// must produce byte-identical JSON. Downstream time-series builders read
/// `bar_count`, `total_weight_oz`, `fund_reported_oz` and `status`, so those
/// names and types are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub fund_id: String,
    pub snapshot_date: NaiveDate,
    pub bar_count: u64,
    pub total_weight_oz: Decimal,
    pub fund_reported_oz: Option<Decimal>,
    pub discrepancies: Vec<Discrepancy>,
    pub status: VerificationStatus,
}

impl VerificationResult {
    /// Result for a fund/date where no document was available or parseable.
    ///
    /// Reconciliation is skipped entirely; the artifact is still persisted so
    /// the failure is visible in the time series.
    pub fn fetch_failed(
        fund_id: impl Into<String>,
        snapshot_date: NaiveDate,
        fund_reported_oz: Option<Decimal>,
    ) -> Self {
        Self {
            fund_id: fund_id.into(),
            snapshot_date,
            bar_count: 0,
            total_weight_oz: Decimal::ZERO,
            fund_reported_oz,
            discrepancies: Vec::new(),
            status: VerificationStatus::FetchFailed,
        }
    }

    /// The highest severity among the findings, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.discrepancies.iter().map(|d| d.severity).max()
    }
}
