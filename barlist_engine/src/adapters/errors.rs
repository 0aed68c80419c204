use thiserror::Error;

/// Errors raised while turning a raw bar-list document into field tuples.
///
/// A failed parse is fatal for that provider/date: the caller records the
/// run as `fetch_failed` instead of reconciling. An empty or structurally
/// unrecognizable document must never look like "zero bars, no discrepancy".
#[derive(Debug, Error)]
pub enum ParseError {
    /// No adapter is registered for this provider identifier.
    #[error("no bar-list adapter registered for provider {0:?}")]
    UnknownProvider(String),

    /// The supplied document is empty.
    #[error("{provider} bar list document is empty")]
    EmptyDocument {
        /// Provider whose adapter rejected the document.
        provider: &'static str,
    },

    /// The document lacks the structural markers this provider family
    /// always carries (table headers, anchor columns), or no data row
    /// matched the family's row grammar.
    #[error("{provider} bar list is missing expected structure: {reason}")]
    MissingMarkers {
        /// Provider whose adapter rejected the document.
        provider: &'static str,
        /// What was expected but not found.
        reason: &'static str,
    },
}
