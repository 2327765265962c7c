use super::{ExtractionConfig, InvoiceText, Location, TariffGroup};
use regex::Regex;
use tracing::{debug, warn};

/// Amount token: starts and ends with a digit, `.`/`,` allowed in between.
const AMOUNT: &str = r"(\d(?:[\d.,]*\d)?)";

/// How far past the billing period the total may appear.
const PERIOD_WINDOW: usize = 120;

// ---------------------------------------------------------------------------
// Tariff group
// ---------------------------------------------------------------------------

pub fn extract_tariff_group(text: &InvoiceText, cfg: &ExtractionConfig) -> TariffGroup {
    // The Group B long form can sit next to a generic "Grupo A" mention
    // (e.g. in a tariff legend), so it wins.
    if text.contains_phrase(&cfg.group_b_phrase) {
        TariffGroup::GroupB
    } else if text.contains_phrase(&cfg.group_a_phrase) {
        TariffGroup::GroupA
    } else {
        TariffGroup::Unidentified
    }
}

// ---------------------------------------------------------------------------
// Total value
// ---------------------------------------------------------------------------

pub fn extract_total_value(text: &InvoiceText, cfg: &ExtractionConfig) -> Option<String> {
    let currency = regex::escape(&cfg.currency_marker);
    period_anchored_total(text.raw(), &cfg.billing_period_pattern, &currency)
        .or_else(|| first_currency_amount(text.raw(), &currency))
}

/// "<billing period> ... R$ <amount>": avoids picking up unrelated amounts
/// (taxes, previous balances) printed earlier in the document.
fn period_anchored_total(text: &str, period: &str, currency: &str) -> Option<String> {
    if period.trim().is_empty() {
        return None;
    }
    let pattern = format!(r"(?:{period})[\s\S]{{0,{PERIOD_WINDOW}}}?{currency}\s*{AMOUNT}");
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "Invalid billing period pattern — skipping anchored total");
            return None;
        }
    };
    let found = re.captures(text).map(|c| c[1].to_string());
    debug!(found = ?found, "Period-anchored total");
    found
}

fn first_currency_amount(text: &str, currency: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{currency}\s*{AMOUNT}")).ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

/// Read a locale-formatted amount (`1.234,56`, `1,234.56`, `245,67`, `1234`).
///
/// The right-most separator is the decimal mark when both kinds appear.
/// A lone separator followed by exactly three digits is read as a
/// thousands separator.
pub fn parse_locale_amount(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');
    let decimal = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) => single_kind_decimal(token, '.'),
        (None, Some(_)) => single_kind_decimal(token, ','),
        (None, None) => None,
    };

    let canonical: String = token
        .chars()
        .filter_map(|c| match c {
            d if d.is_ascii_digit() => Some(d),
            c if Some(c) == decimal => Some('.'),
            _ => None,
        })
        .collect();
    canonical.parse().ok()
}

fn single_kind_decimal(token: &str, sep: char) -> Option<char> {
    let mut parts = token.split(sep);
    let count = token.matches(sep).count();
    let tail = parts.next_back().unwrap_or_default();
    if count == 1 && tail.len() != 3 {
        Some(sep)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

pub fn extract_location(text: &InvoiceText) -> Location {
    let Ok(re) = Regex::new(
        r"(?i:cidade)\s*:\s*([^\n]*?)\s*-\s*(?i:estado)\s*:\s*([A-Z]{2})\b",
    ) else {
        return Location::default();
    };

    re.captures(text.raw())
        .and_then(|c| {
            let city = c[1].trim();
            (!city.is_empty()).then(|| Location {
                city: city.to_string(),
                state: c[2].to_string(),
            })
        })
        .unwrap_or_default()
}
