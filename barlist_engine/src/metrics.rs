//! Fund-level metrics: the self-reported totals the bar list is reconciled
//! against.
//!
//! This module defines the [`MetricsSource`] trait, the seam between the
//! engine and whatever supplies fund metrics (the fetch layer, a test
//! double). Metrics are ground truth to reconcile *against*, not to trust
//! unconditionally; an unavailable snapshot is a normal condition
//! (`Ok(None)`), in which case the reconciler skips the fund-level
//! comparisons and only runs the bar-list-internal checks.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One fund's self-reported totals for a snapshot date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundMetrics {
    pub fund_id: String,
    pub snapshot_date: NaiveDate,
    /// Total silver the fund reports backing its shares, in troy ounces.
    pub total_oz: Decimal,
    /// Bar count the fund publishes, when it publishes one.
    pub reported_bar_count: Option<u64>,
    /// Serials the fund has disclosed as removed since the prior list.
    /// A bar vanishing without an entry here is a `missing_bar` finding.
    pub disclosed_removals: Option<Vec<String>>,
}

/// Errors reading or decoding a metrics file.
///
/// A *missing* file is not an error — see [`MetricsSource::get_metrics`].
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to read metrics file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("metrics file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Supplies fund metrics per fund/date.
pub trait MetricsSource {
    /// `Ok(None)` means "no metrics for this fund/date" — the comparison is
    /// skipped, not failed.
    fn get_metrics(
        &self,
        fund_id: &str,
        date: NaiveDate,
    ) -> Result<Option<FundMetrics>, MetricsError>;
}

// On-disk payload; fund id and date come from the filename convention.
#[derive(Debug, Deserialize)]
struct MetricsFile {
    total_oz: Decimal,
    #[serde(default)]
    reported_bar_count: Option<u64>,
    #[serde(default)]
    disclosed_removals: Option<Vec<String>>,
}

/// Reads per-fund metrics JSON files placed by the fetch layer.
///
/// Layout: `<dir>/etc_fund_metrics_<fund>_<YYYYMMDD>.json`, one file per
/// fund and data date. Only a same-day file matches; a date with no file is
/// `Ok(None)`.
pub struct FileMetricsSource {
    dir: PathBuf,
}

impl FileMetricsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The file a given fund/date would be read from.
    pub fn path_for(&self, fund_id: &str, date: NaiveDate) -> PathBuf {
        self.dir.join(format!(
            "etc_fund_metrics_{}_{}.json",
            fund_id,
            date.format("%Y%m%d")
        ))
    }
}

impl MetricsSource for FileMetricsSource {
    fn get_metrics(
        &self,
        fund_id: &str,
        date: NaiveDate,
    ) -> Result<Option<FundMetrics>, MetricsError> {
        let path = self.path_for(fund_id, date);
        if !Path::new(&path).exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| MetricsError::Io {
            path: path.clone(),
            source,
        })?;
        let file: MetricsFile =
            serde_json::from_str(&raw).map_err(|source| MetricsError::Malformed {
                path: path.clone(),
                source,
            })?;

        Ok(Some(FundMetrics {
            fund_id: fund_id.to_string(),
            snapshot_date: date,
            total_oz: file.total_oz,
            reported_bar_count: file.reported_bar_count,
            disclosed_removals: file.disclosed_removals,
        }))
    }
}
