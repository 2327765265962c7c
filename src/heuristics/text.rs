// src/heuristics/text.rs

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold text for phrase matching: decompose, drop combining accents, upper-case.
///
/// `"Histórico de Consumo"` and `"HISTORICO DE CONSUMO"` fold to the same string.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// Raw invoice text plus its folded form, computed once per document.
///
/// Byte offsets are only meaningful within the form they were taken from;
/// folding changes lengths.
#[derive(Debug, Clone)]
pub struct InvoiceText<'a> {
    raw: &'a str,
    normalized: String,
}

impl<'a> InvoiceText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            normalized: normalize(raw),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Case- and accent-insensitive phrase check.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let phrase = normalize(phrase);
        !phrase.is_empty() && self.normalized.contains(&phrase)
    }

    /// Index of the first raw line whose folded form contains `marker`.
    pub fn find_line(&self, marker: &str) -> Option<usize> {
        let marker = normalize(marker);
        self.raw
            .lines()
            .position(|line| normalize(line).contains(&marker))
    }

    /// Raw lines following line `index`, trimmed, up to (not including)
    /// the first blank line.
    pub fn block_after(&self, index: usize) -> Vec<&'a str> {
        self.raw
            .lines()
            .skip(index + 1)
            .map(str::trim)
            .take_while(|line| !line.is_empty())
            .collect()
    }
}
