//! Reconciler configuration: parsing and defaults.
//!
//! The source material pins neither the weight-mismatch tolerance nor the
//! vault-transfer policy, so both are explicit configuration instead of
//! hard-coded constants. A missing file or missing field falls back to the
//! defaults below.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReconcileConfig {
    /// Maximum relative deviation between the bar-list total and the fund's
    /// reported ounces before a `weight_mismatch` is raised. Fractional:
    /// 0.001 is 0.1%. The comparison is strict (`> tolerance`).
    pub weight_tolerance: Decimal,

    /// Absolute tolerance (troy ounces) when cross-checking a document's own
    /// declared total weight against its parsed rows.
    pub header_weight_tolerance_oz: Decimal,

    /// Whether vault/brand changes between snapshots are reported as
    /// `vault_anomaly` findings.
    pub flag_transfers: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            weight_tolerance: dec!(0.001),
            header_weight_tolerance_oz: dec!(0.01),
            flag_transfers: true,
        }
    }
}

/// Errors loading a [`ReconcileConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses a reconciler config from a TOML string.
pub fn load_config_str(toml_str: &str) -> Result<ReconcileConfig, ConfigError> {
    Ok(toml::from_str(toml_str)?)
}

/// Reads and parses a reconciler config TOML file.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<ReconcileConfig, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    load_config_str(&text)
}
