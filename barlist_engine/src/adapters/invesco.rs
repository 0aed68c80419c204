//! Invesco bar-list adapter.
//!
//! Row format (text extracted from the custodian weight list):
//!
//! ```text
//! BRAND  BAR_NO  1000 oz  ASSAY  GROSS_OZ  FINE_OZ  VAULT
//! ```
//!
//! The `1000 oz` shape field is the unique anchor separating the
//! brand/serial prefix from the numeric fields. The row grammar is specific
//! enough to reject header/footer/metadata lines on its own, so no separate
//! skip filter is needed.
//!
//! Examples:
//!
//! ```text
//! Henan Yuguang Gold and Lead Company 20090117K7 1000 oz 9990 962.200 962.200 JPM London B (VLTB)
//! Russian State Refineries 11752 1000 oz 9999 942.100 942.100 JPM London B (VLTB)
//! Norddeutsche Affinerie AG N 60131 A 1000 oz 9990 862.600 862.600 JPM London B (VLTB)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapters::{
    DocumentAdapter, DocumentHeader, ParseError, ParsedDocument, RawBarRow,
};
use crate::normalize::WeightUnit;

/// Provider identifier handled by this adapter.
pub const PROVIDER: &str = "invesco";

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(.+?)\s+1000\s+oz\s+(\d{3,4})\s+(\d{1,3}(?:,\d{3})*\.\d{3})\s+(\d{1,3}(?:,\d{3})*\.\d{3})\s+(.+)$",
    )
    .expect("invesco line regex")
});

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)invesco|jpmorgan|bullion\s+weightlist").expect("marker regex"));

static TOTAL_BARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total\s+Bars\s*:?\s*([\d,]+)").expect("total bars regex"));

static TOTAL_FTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total\s+FTO\s*:?\s*([\d,.]+)").expect("total fto regex"));

static VALUE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)value\s+date\s+(\d{4}-\d{2}-\d{2})").expect("value date regex"));

/// Adapter for Invesco Physical Silver ETC weight lists.
#[derive(Debug)]
pub struct InvescoAdapter;

impl DocumentAdapter for InvescoAdapter {
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
                reason: "issuer/custodian letterhead not found",
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
                reason: "no data rows matched the 1000 oz anchor grammar",
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

    if let Some(c) = VALUE_DATE_RE.captures(text) {
        header.as_of = chrono::NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok();
    }
    if let Some(c) = TOTAL_BARS_RE.captures(text) {
        header.declared_bar_count = c[1].replace(',', "").parse().ok();
    }
    if let Some(c) = TOTAL_FTO_RE.captures(text) {
        header.declared_total_oz = c[1].replace(',', "").parse().ok();
    }

    header
}

fn parse_line(line: &str) -> Option<RawBarRow> {
    let caps = LINE_RE.captures(line)?;

    let prefix = caps[1].trim().to_string();
    if prefix.is_empty() {
        return None;
    }
    let (brand, serial) = split_brand_serial(&prefix);
    if serial.is_empty() {
        return None;
    }

    let gross = &caps[3];
    let fine = &caps[4];
    let weight_text = if is_positive_number(fine) { fine } else { gross };

    Some(RawBarRow {
        serial_text: serial,
        weight_text: weight_text.to_string(),
        brand_text: brand,
        vault_text: caps[5].trim().to_string(),
    })
}

/// Splits the text before `1000 oz` into (brand, serial number).
///
/// The brand is the multi-word company name on the left; the serial starts
/// at the rightmost digit-containing region, extended over adjacent
/// single-character tokens so serials like `N 60131 A` stay whole.
fn split_brand_serial(prefix: &str) -> (String, String) {
    let tokens: Vec<&str> = prefix.split_whitespace().collect();
    match tokens.len() {
        0 => return (String::new(), String::new()),
        1 => return (String::new(), tokens[0].to_string()),
        _ => {}
    }

    let mut serial_start = tokens.len();
    for i in (0..tokens.len()).rev() {
        if tokens[i].chars().any(|c| c.is_ascii_digit()) {
            serial_start = i;
        } else if tokens[i].chars().count() <= 1 {
            // Single character adjacent to a digit token is part of the
            // serial (e.g. "N 60131 A", "KPR 3841 .").
            if serial_start == i + 1 {
                serial_start = i;
            } else {
                break;
            }
        } else {
            break;
        }
    }

    if serial_start == 0 {
        // Could not separate; treat the first token as the brand.
        return (tokens[0].to_string(), tokens[1..].join(" "));
    }

    (
        tokens[..serial_start].join(" "),
        tokens[serial_start..].join(" "),
    )
}

fn is_positive_number(raw: &str) -> bool {
    raw.replace(',', "")
        .parse::<rust_decimal::Decimal>()
        .map(|d| d > rust_decimal::Decimal::ZERO)
        .unwrap_or(false)
}
