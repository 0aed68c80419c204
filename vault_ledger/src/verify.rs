//! One fund/date verification run, end to end.
//!
//! Read the already-acquired document text, run the engine chain, publish
//! the result artifact, then merge the snapshot into the ledger. An absent
//! or unparseable document is a valid, expected condition: it becomes a
//! persisted `fetch_failed` artifact, not an error of the run, so one
//! fund's failure never blocks others. Only a failure to publish aborts.

use std::path::{Path, PathBuf};

use anyhow::Context;
use barlist_engine::aggregate::InventorySummary;
use barlist_engine::config::ReconcileConfig;
use barlist_engine::metrics::{FileMetricsSource, MetricsSource};
use barlist_engine::models::verification::VerificationResult;
use barlist_engine::report::ReportWriter;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::delta::SnapshotDelta;
use crate::registry::FundRegistry;
use crate::{db, history};

/// Everything one verification run needs.
pub struct VerifyRequest<'a> {
    /// Fund id, resolved against the registry.
    pub fund: &'a str,
    /// Path to the already-acquired bar-list document text.
    pub document: &'a Path,
    /// Snapshot date of the run.
    pub date: NaiveDate,
    /// Directory holding per-fund metrics JSON files.
    pub metrics_dir: &'a Path,
    /// SQLite database path for the bar-history ledger.
    pub db_path: &'a str,
    /// Output directory for verification report artifacts.
    pub out_dir: &'a Path,
    /// Reconciler tunables.
    pub config: ReconcileConfig,
    /// Normalized fund registry.
    pub registry: &'a FundRegistry,
}

/// What a verification run produced.
#[derive(Debug)]
pub struct VerifyOutcome {
    /// The persisted verification result.
    pub result: VerificationResult,
    /// Where the artifact was published.
    pub report_path: PathBuf,
    /// Snapshot delta, when the document parsed and the ledger was updated.
    pub delta: Option<SnapshotDelta>,
    /// Per-vault/brand breakdown, when the document parsed.
    pub summary: Option<InventorySummary>,
}

/// Runs the full chain for one fund/date.
pub fn run_verification(req: &VerifyRequest<'_>) -> anyhow::Result<VerifyOutcome> {
    let fund_cfg = req
        .registry
        .funds
        .get(req.fund)
        .with_context(|| format!("unknown fund: {}", req.fund))?;

    db::migrate::run_sqlite(req.db_path)?;
    let mut conn = db::connection::connect_sqlite(req.db_path)?;

    let metrics = FileMetricsSource::new(req.metrics_dir).get_metrics(req.fund, req.date)?;
    if metrics.is_none() {
        info!(fund = req.fund, "no same-day fund metrics; fund-level checks skipped");
    }

    let writer = ReportWriter::new(req.out_dir);

    let text = match std::fs::read_to_string(req.document) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                fund = req.fund,
                document = %req.document.display(),
                %err,
                "bar list document unavailable"
            );
            let result = VerificationResult::fetch_failed(
                req.fund,
                req.date,
                metrics.as_ref().map(|m| m.total_oz),
            );
            let report_path = writer.write(&result)?;
            return Ok(VerifyOutcome {
                result,
                report_path,
                delta: None,
                summary: None,
            });
        }
    };

    let previous = history::load_previous(&mut conn, req.fund, &fund_cfg.provider)?;

    let run = match barlist_engine::verify_document(
        &fund_cfg.provider,
        req.fund,
        req.date,
        &text,
        metrics.as_ref(),
        previous.as_deref(),
        &req.config,
    ) {
        Ok(run) => run,
        Err(barlist_engine::errors::Error::Parse(err)) => {
            warn!(fund = req.fund, %err, "bar list did not parse");
            let result = VerificationResult::fetch_failed(
                req.fund,
                req.date,
                metrics.as_ref().map(|m| m.total_oz),
            );
            let report_path = writer.write(&result)?;
            return Ok(VerifyOutcome {
                result,
                report_path,
                delta: None,
                summary: None,
            });
        }
        Err(err) => return Err(err.into()),
    };

    let report_path = writer.write(&run.result)?;
    let delta = history::record_snapshot(&mut conn, req.fund, req.date, &run.records)?;

    info!(
        fund = req.fund,
        bars = run.result.bar_count,
        findings = run.result.discrepancies.len(),
        status = ?run.result.status,
        "verification run complete"
    );

    Ok(VerifyOutcome {
        result: run.result,
        report_path,
        delta: Some(delta),
        summary: Some(run.summary),
    })
}
