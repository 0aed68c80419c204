//! Verification report persistence.
//!
//! One JSON document per fund/date, named with the embedded date. The write
//! is all-or-nothing: the payload is staged to a `.tmp` sibling, fsynced,
//! then atomically renamed into place, so a partially written result is
//! never visible under the final path. A rerun for the same date replaces
//! only that date's file; past dates are never touched.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use snafu::{Backtrace, ResultExt, Snafu};

use crate::models::verification::VerificationResult;

/// Errors publishing a verification report.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReportError {
    /// The result could not be serialized to JSON.
    #[snafu(display("failed to serialize verification result: {source}"))]
    Serialize {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// Staging the payload (directory creation, temp write, fsync) failed.
    #[snafu(display("failed to stage report at {}: {source}", path.display()))]
    Stage {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The atomic rename onto the final path failed.
    #[snafu(display("failed to publish report at {}: {source}", path.display()))]
    Publish {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

/// Writes [`VerificationResult`]s beneath one output directory.
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// The final path for a fund/date artifact.
    pub fn path_for(&self, fund_id: &str, date: NaiveDate) -> PathBuf {
        self.out_dir.join(format!(
            "verification_{}_{}.json",
            fund_id,
            date.format("%Y%m%d")
        ))
    }

    /// Serializes and atomically publishes `result`, returning the final
    /// path.
    pub fn write(&self, result: &VerificationResult) -> Result<PathBuf, ReportError> {
        let payload = serde_json::to_vec_pretty(result).context(SerializeSnafu)?;

        let final_path = self.path_for(&result.fund_id, result.snapshot_date);
        let tmp_path = final_path.with_extension("json.tmp");

        std::fs::create_dir_all(&self.out_dir).context(StageSnafu {
            path: self.out_dir.clone(),
        })?;
        write_and_sync(&tmp_path, &payload).context(StageSnafu {
            path: tmp_path.clone(),
        })?;
        std::fs::rename(&tmp_path, &final_path).context(PublishSnafu {
            path: final_path.clone(),
        })?;

        Ok(final_path)
    }
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
