//! Document adapters for custodian bar-list documents.
//!
//! This module defines the [`DocumentAdapter`] trait, the unified interface
//! for turning one provider family's raw bar-list text into a sequence of
//! raw field tuples plus the document's own header summary.
//!
//! Each custodian publishes a different table layout, so there is one
//! adapter per provider family ([`wisdomtree`], [`invesco`]); all adapters
//! expose the same output contract and are selected at runtime by provider
//! identifier via [`adapter_for`]. Adding a provider means adding an
//! adapter, never branching inside shared logic.
//!
//! Adapters are pure readers: one finite pass over the supplied text,
//! restartable by calling [`DocumentAdapter::parse`] again, no side effects.

pub mod errors;
pub mod invesco;
pub mod wisdomtree;

pub use errors::ParseError;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::normalize::WeightUnit;

/// One raw data row, before normalization.
///
/// Field contents are provider-shaped text; the normalizer owns cleanup and
/// unit conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBarRow {
    /// Serial number text as printed, possibly multi-token.
    pub serial_text: String,
    /// Weight text as printed (may contain thousands separators).
    pub weight_text: String,
    /// Refiner/brand text; empty when the row does not carry one.
    pub brand_text: String,
    /// Vault/location text; empty when the row does not carry one.
    pub vault_text: String,
}

/// Metadata the document declares about itself, extracted from its preamble.
///
/// Used to derive the snapshot date and to cross-check declared totals
/// against the parsed rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHeader {
    /// The as-of date printed on the document, when present.
    pub as_of: Option<NaiveDate>,
    /// Bar count the document claims to contain.
    pub declared_bar_count: Option<u64>,
    /// Total weight (troy ounces) the document claims to contain.
    pub declared_total_oz: Option<Decimal>,
}

/// The full output of one adapter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Self-declared document metadata.
    pub header: DocumentHeader,
    /// The weight unit this provider publishes in.
    pub unit: WeightUnit,
    /// Raw field tuples, in document order.
    pub rows: Vec<RawBarRow>,
}

/// Converts one provider family's bar-list text into raw field tuples.
pub trait DocumentAdapter: std::fmt::Debug {
    /// Provider identifier this adapter handles (lowercase).
    fn provider(&self) -> &'static str;

    /// Parses the document text in one pass.
    ///
    /// Fails with [`ParseError`] when the text is empty or its structural
    /// markers are absent; the error must be surfaced, not swallowed.
    fn parse(&self, text: &str) -> Result<ParsedDocument, ParseError>;
}

/// Selects the adapter for `provider` at runtime.
pub fn adapter_for(provider: &str) -> Result<Box<dyn DocumentAdapter>, ParseError> {
    match provider {
        wisdomtree::PROVIDER => Ok(Box::new(wisdomtree::WisdomTreeAdapter)),
        invesco::PROVIDER => Ok(Box::new(invesco::InvescoAdapter)),
        other => Err(ParseError::UnknownProvider(other.to_string())),
    }
}
