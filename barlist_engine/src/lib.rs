//! Bar-list verification engine for physical silver ETC funds.
//!
//! Reconciles two independently sourced views of the same inventory: the
//! bar-level lists custodians publish and the fund-level totals the issuers
//! report. The pipeline is document adapter → normalizer → aggregator →
//! reconciler → report writer; each stage is its own module and the whole
//! chain is composed by [`verify_document`].

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod report;

use chrono::NaiveDate;

use crate::aggregate::InventorySummary;
use crate::config::ReconcileConfig;
use crate::metrics::FundMetrics;
use crate::models::bar::BarRecord;
use crate::models::verification::VerificationResult;
use crate::reconcile::ReconcileInputs;

/// The outcome of verifying one document: the persisted result plus the
/// normalized record set, which the caller retains as the next run's
/// previous snapshot, and the per-vault/brand breakdown for display.
#[derive(Debug, Clone)]
pub struct VerificationRun {
    pub result: VerificationResult,
    pub records: Vec<BarRecord>,
    pub summary: InventorySummary,
}

/// Runs the full verification chain over one already-acquired document.
///
/// `previous` is the prior run's record set (`None` on the first run) and is
/// only consumed, never stored — cross-run state stays with the caller.
/// Fails with [`errors::Error::Parse`] when the document cannot be parsed;
/// the caller records that as a `fetch_failed` result.
pub fn verify_document(
    provider: &str,
    fund_id: &str,
    snapshot_date: NaiveDate,
    text: &str,
    metrics: Option<&FundMetrics>,
    previous: Option<&[BarRecord]>,
    cfg: &ReconcileConfig,
) -> Result<VerificationRun, errors::Error> {
    let adapter = adapters::adapter_for(provider)?;
    let document = adapter.parse(text)?;
    let batch = normalize::normalize_rows(&document, provider, snapshot_date);
    let summary = aggregate::aggregate(&batch.records);

    let result = reconcile::reconcile(
        &ReconcileInputs {
            fund_id,
            provider,
            snapshot_date,
            current: &batch.records,
            summary: &summary,
            failures: &batch.failures,
            metrics,
            previous,
            header: &document.header,
        },
        cfg,
    );

    Ok(VerificationRun {
        result,
        records: batch.records,
        summary,
    })
}
