//! WisdomTree bar-list adapter.
//!
//! Row format (space-delimited text extracted from the custodian PDF):
//!
//! ```text
//! BAR_NUMBER REFINER_NAME... GROSS_WEIGHT FINE_WEIGHT ASSAY [YEAR] VAULT_NAME...
//! ```
//!
//! The weight cluster is the unique anchor — three consecutive numeric
//! tokens: gross and fine weight with exactly three decimals (the fine
//! column is published as `0.000` in this fund, so the gross weight stands
//! in for it), and a `0.NNNN` assay. Everything left of the cluster splits
//! into serial number and refiner; everything right of it is an optional
//! year/reference number followed by the vault name.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapters::{
    DocumentAdapter, DocumentHeader, ParseError, ParsedDocument, RawBarRow,
};
use crate::normalize::WeightUnit;

/// Provider identifier handled by this adapter.
pub const PROVIDER: &str = "wisdomtree";

static WEIGHT_CLUSTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{1,3}(?:,\d{3})*\.\d{3})\s+(\d{1,3}(?:,\d{3})*\.\d{3})\s+(\d\.\d{4})",
    )
    .expect("weight cluster regex")
});

// Header / footer / metadata lines, never data rows.
static SKIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)bar\s+number|refiner\s+long|gross\s+weight|fine\s+weight|bar\s+assay|vault\s+name|client\s+silver|stock\s+holdings|allocated\s+a/c|total\s+allocated|end\s+of\s+silver|c\.o\.b|page\s+\d",
    )
    .expect("skip regex")
});

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)client\s+silver\s+stock\s+holdings").expect("marker regex"));

static COB_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"C\.O\.B[:\s]+(\d{1,2}\s+\w+\s+\d{4})").expect("c.o.b regex"));

static TOTAL_BAR_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total\s+Allocated\s+Bar\s+Count[:\s]+(\d[\d,]*)").expect("bar count regex")
});

static TOTAL_GROSS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total\s+Allocated\s+Gross\s+Weight[:\s]+([\d,]+\.\d+)").expect("gross regex")
});

static SUFFIX_NUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(.+)$").expect("suffix regex"));

/// Adapter for WisdomTree Physical Silver bar lists.
#[derive(Debug)]
pub struct WisdomTreeAdapter;

impl DocumentAdapter for WisdomTreeAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn parse(&self, text: &str) -> Result<ParsedDocument, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyDocument { provider: PROVIDER });
        }
        if !MARKER_RE.is_match(text) {
            return Err(ParseError::MissingMarkers {
                provider: PROVIDER,
                reason: "holdings title block not found",
            });
        }

        let header = parse_header(text);

        let mut rows = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(row) = parse_line(line) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(ParseError::MissingMarkers {
                provider: PROVIDER,
                reason: "no data rows matched the weight-cluster grammar",
            });
        }

        Ok(ParsedDocument {
            header,
            unit: WeightUnit::TroyOunce,
            rows,
        })
    }
}

fn parse_header(text: &str) -> DocumentHeader {
    let mut header = DocumentHeader::default();

    if let Some(c) = COB_DATE_RE.captures(text) {
        header.as_of = chrono::NaiveDate::parse_from_str(&c[1], "%d %B %Y").ok();
    }
    if let Some(c) = TOTAL_BAR_COUNT_RE.captures(text) {
        header.declared_bar_count = c[1].replace(',', "").parse().ok();
    }
    if let Some(c) = TOTAL_GROSS_RE.captures(text) {
        header.declared_total_oz = c[1].replace(',', "").parse().ok();
    }

    header
}

fn parse_line(line: &str) -> Option<RawBarRow> {
    if SKIP_RE.is_match(line) {
        return None;
    }

    let caps = WEIGHT_CLUSTER_RE.captures(line)?;
    let cluster = caps.get(0).expect("whole match");

    let prefix = line[..cluster.start()].trim();
    if prefix.is_empty() {
        return None;
    }
    let (serial, refiner) = split_serial_refiner(prefix);
    if serial.is_empty() {
        return None;
    }

    // The fine column is 0.000 across this fund; fall back to gross.
    let gross = &caps[1];
    let fine = &caps[2];
    let weight_text = if is_positive_number(fine) { fine } else { gross };

    // Suffix: optional year or reference number, then the vault name.
    let suffix = line[cluster.end()..].trim();
    let vault = match SUFFIX_NUM_RE.captures(suffix) {
        Some(c) => c[2].trim().to_string(),
        None => suffix.to_string(),
    };

    Some(RawBarRow {
        serial_text: serial,
        weight_text: weight_text.to_string(),
        brand_text: refiner,
        vault_text: vault,
    })
}

/// Splits the text before the weight cluster into (serial number, refiner).
///
/// Walking from the right, consecutive tokens without digits form the
/// refiner name; everything to their left is the serial number. This keeps
/// multi-part serials like `1E 452-11` intact ahead of `STATE REFINERIES`.
fn split_serial_refiner(prefix: &str) -> (String, String) {
    let tokens: Vec<&str> = prefix.split_whitespace().collect();
    match tokens.len() {
        0 => return (String::new(), String::new()),
        1 => return (tokens[0].to_string(), String::new()),
        _ => {}
    }

    let mut refiner_start = tokens.len();
    for i in (0..tokens.len()).rev() {
        if tokens[i].chars().any(|c| c.is_ascii_digit()) {
            break;
        }
        refiner_start = i;
    }

    if refiner_start == 0 {
        // Every token is digit-free; take the first as the serial.
        return (tokens[0].to_string(), tokens[1..].join(" "));
    }

    (
        tokens[..refiner_start].join(" "),
        tokens[refiner_start..].join(" "),
    )
}

fn is_positive_number(raw: &str) -> bool {
    raw.replace(',', "")
        .parse::<rust_decimal::Decimal>()
        .map(|d| d > rust_decimal::Decimal::ZERO)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    const SAMPLE: &str = "\
Client Silver Stock Holdings
Allocated A/C
C.O.B: 13 February 2026
Total Allocated Bar Count: 3
Total Allocated Gross Weight: 3,052.600
Bar Number Refiner Long Gross Weight Fine Weight Bar Assay Vault Name
4005 KAZZINC 1,060.100 0.000 0.9999 2015 LONDON A
1E 452-11 STATE REFINERIES 992.500 0.000 0.9990 LONDON A
77812 AURUBIS AG 1,000.000 0.000 0.9999 2018 LONDON B
End of Silver
";

    #[test]
    fn parses_header_and_rows() {
        let doc = WisdomTreeAdapter.parse(SAMPLE).unwrap();

        assert_eq!(
            doc.header.as_of,
            Some(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
        );
        assert_eq!(doc.header.declared_bar_count, Some(3));
        assert_eq!(doc.header.declared_total_oz, Some(dec!(3052.600)));
        assert_eq!(doc.unit, WeightUnit::TroyOunce);
        assert_eq!(doc.rows.len(), 3);
    }

    #[test]
    fn fine_zero_falls_back_to_gross_weight() {
        let doc = WisdomTreeAdapter.parse(SAMPLE).unwrap();
        assert_eq!(doc.rows[0].weight_text, "1,060.100");
    }

    #[test]
    fn multi_part_serial_splits_before_refiner() {
        let doc = WisdomTreeAdapter.parse(SAMPLE).unwrap();
        let row = &doc.rows[1];
        assert_eq!(row.serial_text, "1E 452-11");
        assert_eq!(row.brand_text, "STATE REFINERIES");
        assert_eq!(row.vault_text, "LONDON A");
    }

    #[test]
    fn leading_year_is_stripped_from_vault() {
        let doc = WisdomTreeAdapter.parse(SAMPLE).unwrap();
        assert_eq!(doc.rows[0].vault_text, "LONDON A");
        assert_eq!(doc.rows[2].vault_text, "LONDON B");
    }

    #[test]
    fn document_without_title_block_is_rejected() {
        let err = WisdomTreeAdapter
            .parse("4005 KAZZINC 1,060.100 0.000 0.9999 LONDON A\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingMarkers { .. }));
    }

    #[test]
    fn title_without_rows_is_rejected() {
        let err = WisdomTreeAdapter
            .parse("Client Silver Stock Holdings\nC.O.B: 13 February 2026\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingMarkers { .. }));
    }

    #[test]
    fn reparsing_the_same_text_is_identical() {
        let a = WisdomTreeAdapter.parse(SAMPLE).unwrap();
        let b = WisdomTreeAdapter.parse(SAMPLE).unwrap();
        assert_eq!(a, b);
    }
}
