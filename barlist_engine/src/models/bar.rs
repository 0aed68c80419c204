//! Canonical in-memory representation of a single physical silver bar.
//!
//! This struct is the standard output of every
//! [`DocumentAdapter`](crate::adapters::DocumentAdapter) + normalizer pair,
//! regardless of which custodian published the bar list.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One physical bar from a custodian bar list, after normalization.
///
/// `(serial, source_provider)` identifies a bar within a snapshot. A repeated
/// key inside the same snapshot is a reportable anomaly, never silently
/// deduplicated — records are therefore kept as-is and the reconciler does
/// the duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarRecord {
    /// Canonical serial number: uppercase, no whitespace or punctuation.
    pub serial: String,

    /// Fine weight in troy ounces. Always positive.
    pub weight_oz: Decimal,

    /// Refiner/producer mark. `"UNKNOWN"` when the list does not carry one.
    pub brand: String,

    /// Custodian vault/location code. `"UNKNOWN"` when not carried.
    pub vault: String,

    /// Which custodian published this bar.
    pub source_provider: String,

    /// The as-of date of the bar list this record came from.
    pub snapshot_date: NaiveDate,
}
