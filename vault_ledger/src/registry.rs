//! Fund registry: which ETC funds we verify and how.
//!
//! A TOML-backed registry describing each fund: display name, ISIN, ticker,
//! and which bar-list provider family publishes its inventory.
//!
//! Key behaviors:
//! - Normalization enforces lowercase fund ids and provider codes, trims
//!   whitespace, uppercases ISINs, and rejects duplicate ids after
//!   normalization.
//! - [`FundRegistry::builtin`] carries the two funds the pipeline has always
//!   tracked, so the CLI works with no registry file at all.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_registry_str`]
//! - Parse + normalize from a file path: [`load_registry_path`]

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::from_str;

/// Top-level registry mapping fund ids to their configuration.
///
/// Keys are normalized to lowercase during normalization (e.g. "InVeScO" ->
/// "invesco").
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FundRegistry {
    /// Map of fund id -> configuration.
    pub funds: IndexMap<String, FundCfg>,
}

/// Configuration payload for one fund id.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FundCfg {
    /// Human-readable fund name (e.g., "Invesco Physical Silver ETC").
    pub name: String,
    /// The fund's ISIN, normalized to uppercase.
    pub isin: String,
    /// Exchange ticker (e.g., "SSLV.L").
    pub ticker: String,
    /// Bar-list provider family that publishes this fund's inventory;
    /// must match a registered document adapter.
    pub provider: String,
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default)]
pub struct RegistryReport {
    /// Number of fund ids that changed when lowercasing/trimming.
    pub funds_renamed: usize,
}

impl FundRegistry {
    /// The funds tracked by default when no registry file is supplied.
    pub fn builtin() -> Self {
        let mut funds = IndexMap::new();
        funds.insert(
            "invesco".to_string(),
            FundCfg {
                name: "Invesco Physical Silver ETC".to_string(),
                isin: "IE00B43VDT70".to_string(),
                ticker: "SSLV.L".to_string(),
                provider: "invesco".to_string(),
            },
        );
        funds.insert(
            "wisdomtree".to_string(),
            FundCfg {
                name: "WisdomTree Physical Silver ETC".to_string(),
                isin: "JE00B1VS3333".to_string(),
                ticker: "PHAG.L".to_string(),
                provider: "wisdomtree".to_string(),
            },
        );
        Self { funds }
    }
}

/// Normalize a registry in-place.
///
/// What normalization does:
/// - Lowercase + trim fund ids; reject duplicates after normalization
/// - Trim names/tickers, uppercase ISINs, lowercase provider codes
///
/// Errors:
/// - Empty or duplicate fund ids after normalization
/// - Empty name/isin/ticker/provider after trimming
pub fn normalize_registry(reg: &mut FundRegistry) -> anyhow::Result<RegistryReport> {
    let mut report = RegistryReport::default();

    let mut rebuilt: IndexMap<String, FundCfg> = IndexMap::new();
    let old = std::mem::take(&mut reg.funds);

    for (raw_id, mut cfg) in old {
        let id = raw_id.trim().to_lowercase();
        if id.is_empty() {
            bail!("fund id cannot be empty after trimming");
        }
        if id != raw_id {
            report.funds_renamed += 1;
        }
        if rebuilt.contains_key(&id) {
            bail!("duplicate fund id after normalization: {id}");
        }

        cfg.name = cfg.name.trim().to_string();
        if cfg.name.is_empty() {
            bail!("fund name cannot be empty after trimming");
        }
        cfg.isin = cfg.isin.trim().to_uppercase();
        if cfg.isin.is_empty() {
            bail!("fund isin cannot be empty after trimming");
        }
        cfg.ticker = cfg.ticker.trim().to_string();
        if cfg.ticker.is_empty() {
            bail!("fund ticker cannot be empty after trimming");
        }
        cfg.provider = cfg.provider.trim().to_lowercase();
        if cfg.provider.is_empty() {
            bail!("fund provider cannot be empty after trimming");
        }

        rebuilt.insert(id, cfg);
    }

    reg.funds = rebuilt;
    Ok(report)
}

/// Parse and normalize a registry from a TOML string.
pub fn load_registry_str(toml_str: &str) -> anyhow::Result<FundRegistry> {
    let mut reg: FundRegistry = from_str(toml_str).context("failed to parse registry TOML")?;
    let _report = normalize_registry(&mut reg).context("normalize_registry failed")?;
    Ok(reg)
}

/// Read a registry TOML file from disk, parse, and normalize it.
pub fn load_registry_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<FundRegistry> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read registry file {}", path.as_ref().display()))?;
    load_registry_str(&text)
}
