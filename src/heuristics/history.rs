// src/heuristics/history.rs
//
// Recovers the month -> kWh table printed under "HISTÓRICO DE CONSUMO".
// Invoice templates disagree on layout, so there are two strategies:
// a columnar block read at fixed offsets, and an inline scan of the whole
// text used only when the block yields nothing.

use super::{ConsumptionHistory, InvoiceText};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub const HISTORY_MARKER: &str = "HISTORICO DE CONSUMO";

/// Month abbreviations as printed on the invoices.
const MONTHS: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

// Columnar block layout, as offsets into the lines that follow the marker:
//
//   [0, 2)    column headers
//   [2, 15)   month labels
//   [15, 17)  separator between the two columns
//   [17, 30)  kWh values, same order as the labels
const HEADER_LINES: usize = 2;
const MONTH_ROWS: usize = 13;
const SEPARATOR_LINES: usize = 2;
const MONTHS_START: usize = HEADER_LINES;
const MONTHS_END: usize = MONTHS_START + MONTH_ROWS;
const VALUES_START: usize = MONTHS_END + SEPARATOR_LINES;
const VALUES_END: usize = VALUES_START + MONTH_ROWS;

/// Number of bare numeric tokens the positional fallback needs.
const FALLBACK_TOKENS: usize = MONTH_ROWS;

/// Most recent month printed in the history table, as `YYYY-MM`.
///
/// Only the positional fallback uses it, to label bare numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceMonth {
    year: i32,
    month: u32,
}

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Labels for this month and the `count - 1` months before it,
    /// most recent first: `MAI25, ABR25, ..., MAI24`.
    pub fn trailing_labels(&self, count: usize) -> Vec<String> {
        let mut year = self.year;
        let mut month = self.month;
        let mut labels = Vec::with_capacity(count);
        for _ in 0..count {
            labels.push(format!(
                "{}{:02}",
                MONTHS[(month - 1) as usize],
                year.rem_euclid(100)
            ));
            if month == 1 {
                month = 12;
                year -= 1;
            } else {
                month -= 1;
            }
        }
        labels
    }
}

impl Default for ReferenceMonth {
    fn default() -> Self {
        Self {
            year: 2025,
            month: 5,
        }
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for ReferenceMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (year, month) = value
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {value:?}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in {value:?}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in {value:?}"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in {value:?}"))
    }
}

impl From<ReferenceMonth> for String {
    fn from(value: ReferenceMonth) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub reference_month: ReferenceMonth,
}

/// Outcome of reading one (label, value) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Parsed(String, u32),
    Skipped { label: String, raw: String },
}

impl Entry {
    fn read(label: &str, raw: &str) -> Self {
        match parse_kwh(raw) {
            Some(kwh) => Entry::Parsed(label.to_string(), kwh),
            None => Entry::Skipped {
                label: label.to_string(),
                raw: raw.to_string(),
            },
        }
    }
}

fn fold(entries: Vec<Entry>) -> ConsumptionHistory {
    let mut history = ConsumptionHistory::new();
    for entry in entries {
        match entry {
            Entry::Parsed(label, kwh) => {
                history.insert(label, kwh);
            }
            Entry::Skipped { label, raw } => {
                debug!(label = %label, raw = %raw, "Skipping unreadable history value");
            }
        }
    }
    history
}

/// Keep only the digits: `"1.234 kWh"` -> 1234. Fractions are not possible.
fn parse_kwh(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn extract_history(text: &InvoiceText, cfg: &HistoryConfig) -> ConsumptionHistory {
    let columnar = fold(columnar_entries(text));
    if !columnar.is_empty() {
        info!(entries = columnar.len(), "History read from columnar block");
        return columnar;
    }

    let inline = fold(inline_entries(text));
    if !inline.is_empty() {
        info!(entries = inline.len(), "History read from inline month/value pairs");
        return inline;
    }

    let positional = fold(positional_entries(text, &cfg.reference_month));
    if positional.is_empty() {
        info!("No consumption history found");
    } else {
        info!(
            entries = positional.len(),
            reference = %cfg.reference_month,
            "History read positionally from bare numbers"
        );
    }
    positional
}

// ---------------------------------------------------------------------------
// Strategy A: columnar block
// ---------------------------------------------------------------------------

fn columnar_entries(text: &InvoiceText) -> Vec<Entry> {
    let Some(marker) = text.find_line(HISTORY_MARKER) else {
        return Vec::new();
    };
    let block = text.block_after(marker);
    debug!(lines = block.len(), "History block located");
    slice_block(&block)
}

fn slice_block(block: &[&str]) -> Vec<Entry> {
    let months = block.get(MONTHS_START..MONTHS_END.min(block.len())).unwrap_or_default();
    let values = block.get(VALUES_START..VALUES_END.min(block.len())).unwrap_or_default();

    months
        .iter()
        .zip(values)
        .map(|(label, raw)| Entry::read(label, raw))
        .collect()
}

// ---------------------------------------------------------------------------
// Strategy B: inline scan
// ---------------------------------------------------------------------------

/// "MAI25 1234" / "MAI/25 1234" pairs anywhere in the text.
fn inline_entries(text: &InvoiceText) -> Vec<Entry> {
    let pattern = format!(
        r"\b({})\s?/?\s?(\d{{2}})\s+(\d{{3,6}})\b",
        MONTHS.join("|")
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    re.captures_iter(text.normalized())
        .map(|c| Entry::read(&format!("{}{}", &c[1], &c[2]), &c[3]))
        .collect()
}

/// Last resort: the first thirteen bare 3-5 digit numbers, labelled by
/// position from the reference month backwards. Order dependent and lossy.
fn positional_entries(text: &InvoiceText, reference: &ReferenceMonth) -> Vec<Entry> {
    let Ok(re) = Regex::new(r"\b(\d{3,5})\b") else {
        return Vec::new();
    };

    let tokens: Vec<&str> = re
        .captures_iter(text.raw())
        .take(FALLBACK_TOKENS)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if tokens.len() < FALLBACK_TOKENS {
        debug!(found = tokens.len(), "Too few numeric tokens for positional history");
        return Vec::new();
    }

    reference
        .trailing_labels(FALLBACK_TOKENS)
        .iter()
        .zip(tokens)
        .map(|(label, raw)| Entry::read(label, raw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 13] = [
        "JAN25", "FEV25", "MAR25", "ABR25", "MAI25", "JUN25", "JUL25", "AGO25", "SET25",
        "OUT25", "NOV25", "DEZ25", "JAN26",
    ];

    fn block(values: &[&str]) -> String {
        let mut lines = vec!["HISTÓRICO DE CONSUMO", "MES/ANO", "CONSUMO KWH"];
        lines.extend(LABELS);
        lines.extend(["--", "kWh"]);
        lines.extend(values);
        format!("{}\n\nRodape 99999 88888", lines.join("\n"))
    }

    fn history(raw: &str) -> ConsumptionHistory {
        extract_history(&InvoiceText::new(raw), &HistoryConfig::default())
    }

    #[test]
    fn test_columnar_pairs_labels_with_values() {
        let values = [
            "500", "600", "700", "800", "900", "1.000", "1100", "1200", "1300", "1400", "1500",
            "1600", "1700",
        ];
        let h = history(&block(&values));

        assert_eq!(h.len(), 13);
        assert_eq!(h.get("JAN25"), Some(&500));
        assert_eq!(h.get("JUN25"), Some(&1000));
        assert_eq!(h.get("JAN26"), Some(&1700));
        assert_eq!(h.keys().next().map(String::as_str), Some("JAN25"));
    }

    #[test]
    fn test_columnar_skips_non_numeric_value() {
        let values = [
            "500", "600", "N/A", "800", "900", "1000", "1100", "1200", "1300", "1400", "1500",
            "1600", "1700",
        ];
        let h = history(&block(&values));

        assert_eq!(h.len(), 12);
        assert_eq!(h.get("MAR25"), None);
        assert_eq!(h.get("ABR25"), Some(&800));
    }

    #[test]
    fn test_columnar_truncates_to_shorter_column() {
        let values = [
            "500", "600", "700", "800", "900", "1000", "1100", "1200", "1300", "1400",
        ];
        let h = history(&block(&values));

        assert_eq!(h.len(), 10);
        let labels: Vec<&str> = h.keys().map(String::as_str).collect();
        assert_eq!(labels, LABELS[..10].to_vec());
        assert_eq!(h.get("OUT25"), Some(&1400));
    }

    #[test]
    fn test_slice_block_short_block_is_empty() {
        assert!(slice_block(&["a", "b", "JAN25"]).is_empty());
        assert!(slice_block(&[]).is_empty());
    }

    #[test]
    fn test_inline_pairs_used_when_no_block() {
        let h = history("Consumo: mai25 1.234? no; MAI25 1500 ABR/25 1400\nMAR 25 1300");

        assert_eq!(h.len(), 3);
        assert_eq!(h.get("MAI25"), Some(&1500));
        assert_eq!(h.get("ABR25"), Some(&1400));
        assert_eq!(h.get("MAR25"), Some(&1300));
    }

    #[test]
    fn test_inline_duplicate_label_last_write_wins() {
        let h = history("JAN25 1000 FEV25 1100 JAN25 1200");

        assert_eq!(h.len(), 2);
        assert_eq!(h.get("JAN25"), Some(&1200));
        assert_eq!(h.keys().next().map(String::as_str), Some("JAN25"));
    }

    #[test]
    fn test_inline_used_when_block_is_empty() {
        let h = history("HISTORICO DE CONSUMO\n\nDEZ24 2100 NOV24 2000");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("DEZ24"), Some(&2100));
    }

    #[test]
    fn test_positional_fallback_labels_from_reference_month() {
        let numbers: Vec<String> = (0..13).map(|i| (1000 + i * 10).to_string()).collect();
        let h = history(&numbers.join(" "));

        assert_eq!(h.len(), 13);
        assert_eq!(h.keys().next().map(String::as_str), Some("MAI25"));
        assert_eq!(h.get("MAI25"), Some(&1000));
        assert_eq!(h.get("ABR25"), Some(&1010));
        assert_eq!(h.get("MAI24"), Some(&1120));
    }

    #[test]
    fn test_positional_fallback_needs_thirteen_numbers() {
        let h = history("100 200 300 400");
        assert!(h.is_empty());
    }

    #[test]
    fn test_parse_kwh() {
        assert_eq!(parse_kwh("1.234"), Some(1234));
        assert_eq!(parse_kwh(" 987 kWh"), Some(987));
        assert_eq!(parse_kwh("N/A"), None);
        assert_eq!(parse_kwh(""), None);
        assert_eq!(parse_kwh("99999999999999"), None);
    }

    #[test]
    fn test_reference_month_labels_cross_year() {
        let labels = ReferenceMonth::new(2025, 2).unwrap().trailing_labels(4);
        assert_eq!(labels, vec!["FEV25", "JAN25", "DEZ24", "NOV24"]);
    }

    #[test]
    fn test_reference_month_parse() {
        let m = ReferenceMonth::try_from("2024-11".to_string()).unwrap();
        assert_eq!(m, ReferenceMonth::new(2024, 11).unwrap());
        assert_eq!(m.to_string(), "2024-11");
        assert!(ReferenceMonth::try_from("2024-13".to_string()).is_err());
        assert!(ReferenceMonth::try_from("nov/2024".to_string()).is_err());
    }
}
