// src/heuristics/mod.rs

mod fields;
mod history;
mod text;

pub use fields::parse_locale_amount;
pub use history::HistoryConfig;
pub use text::{InvoiceText, normalize};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Utility billing classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TariffGroup {
    /// High-voltage, demand-billed.
    GroupA,
    /// Low-voltage, energy-billed.
    GroupB,
    Unidentified,
}

impl fmt::Display for TariffGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TariffGroup::GroupA => f.write_str("Group A"),
            TariffGroup::GroupB => f.write_str("Group B"),
            TariffGroup::Unidentified => f.write_str("Unidentified"),
        }
    }
}

pub const DEFAULT_CITY: &str = "Toledo";
pub const DEFAULT_STATE: &str = "PR";

/// Installation site as printed on the invoice.
///
/// `state` is always a two-letter uppercase code; a partially parsed
/// location is never built, the whole default pair is used instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            state: DEFAULT_STATE.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.city, self.state)
    }
}

/// Month label -> kWh, in the order the labels were recovered.
///
/// Inserting a label that is already present replaces its value and keeps
/// its original position.
pub type ConsumptionHistory = IndexMap<String, u32>;

/// Everything we can recover from one invoice's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub tariff_group: TariffGroup,
    /// Billing total exactly as printed, e.g. `"1.234,56"`.
    pub total_value: Option<String>,
    pub location: Location,
    pub history: ConsumptionHistory,
}

impl InvoiceRecord {
    /// Billing total as a number, when the printed token can be read as one.
    pub fn total_amount(&self) -> Option<f64> {
        self.total_value.as_deref().and_then(parse_locale_amount)
    }

    /// How many fields carry extracted (non-default) data, out of four.
    pub fn coverage(&self) -> (usize, usize) {
        let filled = [
            self.tariff_group != TariffGroup::Unidentified,
            self.total_value.is_some(),
            self.location != Location::default(),
            !self.history.is_empty(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, 4)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Long-form phrase that marks a Group B invoice. Checked first.
    pub group_b_phrase: String,
    pub group_a_phrase: String,
    /// Regex for the billing period range that precedes the invoice total.
    pub billing_period_pattern: String,
    /// Marker printed before monetary amounts.
    pub currency_marker: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            group_b_phrase: "Modalidade Tarifaria: B".to_string(),
            group_a_phrase: "Grupo A".to_string(),
            billing_period_pattern: r"\d{2}/\d{4}\s*(?:a|A|ATE|até|-)?\s*\d{2}/\d{4}".to_string(),
            currency_marker: "R$".to_string(),
        }
    }
}

/// Extract the structured invoice record from raw document text.
pub fn extract_invoice(
    text: &str,
    extraction: &ExtractionConfig,
    history: &HistoryConfig,
) -> InvoiceRecord {
    let text = InvoiceText::new(text);
    InvoiceRecord {
        tariff_group: fields::extract_tariff_group(&text, extraction),
        total_value: fields::extract_total_value(&text, extraction),
        location: fields::extract_location(&text),
        history: history::extract_history(&text, history),
    }
}
