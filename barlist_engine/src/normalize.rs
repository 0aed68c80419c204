//! Raw field tuples → canonical [`BarRecord`]s.
//!
//! Normalization rules are deterministic and affect identity matching, so
//! they are fixed here:
//! - serial canonicalization: uppercase, strip all whitespace/punctuation;
//! - weight conversion: the provider-declared unit converted to fine troy
//!   ounces with a fixed-point constant, rounded half-to-even at 4 decimal
//!   places;
//! - brand/vault: trimmed, empty normalized to the `"UNKNOWN"` sentinel so
//!   grouping keys are always comparable.
//!
//! A batch never aborts on a bad row: each failure is collected next to the
//! successfully normalized records and later surfaced as a `parse_failure`
//! discrepancy.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::adapters::{ParsedDocument, RawBarRow};
use crate::models::bar::BarRecord;

/// The weight unit a provider publishes bar weights in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    /// Troy ounces (no conversion).
    TroyOunce,
    /// Kilograms.
    Kilogram,
    /// Grams.
    Gram,
}

/// One troy ounce is exactly 31.1034768 grams.
const GRAMS_PER_TROY_OUNCE: Decimal = dec!(31.1034768);

const GRAMS_PER_KILOGRAM: Decimal = dec!(1000);

/// Decimal places kept on normalized weights.
pub const WEIGHT_SCALE: u32 = 4;

/// Sentinel for absent brand/vault text, kept non-empty so grouping keys
/// always compare.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// A single raw row that could not be turned into a [`BarRecord`].
///
/// Non-fatal: the reconciler reports each one as a `parse_failure`
/// discrepancy while the run proceeds with the valid subset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Nothing is left of the serial after stripping separators.
    #[error("serial {raw:?} is empty after canonicalization")]
    EmptySerial {
        /// The serial text as printed.
        raw: String,
    },

    /// The weight text is not a parseable number.
    #[error("weight {raw:?} for serial {serial} is not a number")]
    UnparseableWeight {
        /// Canonical serial of the affected row.
        serial: String,
        /// The weight text as printed.
        raw: String,
    },

    /// The weight parsed but is zero or negative.
    #[error("weight {raw:?} for serial {serial} is not positive")]
    NonPositiveWeight {
        /// Canonical serial of the affected row.
        serial: String,
        /// The weight text as printed.
        raw: String,
    },
}

impl NormalizationError {
    /// Sort key used when these failures become discrepancies.
    pub fn serial(&self) -> &str {
        match self {
            NormalizationError::EmptySerial { .. } => "",
            NormalizationError::UnparseableWeight { serial, .. }
            | NormalizationError::NonPositiveWeight { serial, .. } => serial,
        }
    }
}

/// The outcome of normalizing one adapter pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Records that normalized cleanly, in document order.
    pub records: Vec<BarRecord>,
    /// Per-row failures, in document order.
    pub failures: Vec<NormalizationError>,
}

/// Canonical serial form: uppercase, alphanumerics only.
pub fn canonicalize_serial(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Trimmed label, or [`UNKNOWN_LABEL`] when nothing is left.
pub fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Converts a weight in `unit` to fine troy ounces at [`WEIGHT_SCALE`].
pub fn to_troy_ounces(value: Decimal, unit: WeightUnit) -> Decimal {
    let ounces = match unit {
        WeightUnit::TroyOunce => value,
        WeightUnit::Kilogram => value * GRAMS_PER_KILOGRAM / GRAMS_PER_TROY_OUNCE,
        WeightUnit::Gram => value / GRAMS_PER_TROY_OUNCE,
    };
    ounces.round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Normalizes one raw row into a [`BarRecord`].
pub fn normalize_row(
    row: &RawBarRow,
    unit: WeightUnit,
    provider: &str,
    snapshot_date: NaiveDate,
) -> Result<BarRecord, NormalizationError> {
    let serial = canonicalize_serial(&row.serial_text);
    if serial.is_empty() {
        return Err(NormalizationError::EmptySerial {
            raw: row.serial_text.clone(),
        });
    }

    let weight = row
        .weight_text
        .replace(',', "")
        .trim()
        .parse::<Decimal>()
        .map_err(|_| NormalizationError::UnparseableWeight {
            serial: serial.clone(),
            raw: row.weight_text.clone(),
        })?;
    if weight <= Decimal::ZERO {
        return Err(NormalizationError::NonPositiveWeight {
            serial,
            raw: row.weight_text.clone(),
        });
    }

    Ok(BarRecord {
        serial,
        weight_oz: to_troy_ounces(weight, unit),
        brand: normalize_label(&row.brand_text),
        vault: normalize_label(&row.vault_text),
        source_provider: provider.to_string(),
        snapshot_date,
    })
}

/// Normalizes every row of an adapter pass, collecting failures instead of
/// aborting.
pub fn normalize_rows(
    doc: &ParsedDocument,
    provider: &str,
    snapshot_date: NaiveDate,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for row in &doc.rows {
        match normalize_row(row, doc.unit, provider, snapshot_date) {
            Ok(record) => batch.records.push(record),
            Err(failure) => batch.failures.push(failure),
        }
    }
    batch
}
