// src/analysis.rs

use crate::advisory::advise;
use crate::config::Config;
use crate::heuristics::{InvoiceRecord, extract_invoice};
use crate::simulation::{SimulationResult, simulate};
use crate::stats::{StatsSummary, summarize};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

/// One document's full pass: record, statistics, simulation, advice.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Caller-supplied name, usually the file path.
    pub source: String,
    /// SHA-256 of the analysed text.
    pub digest: String,
    pub record: InvoiceRecord,
    pub stats: Option<StatsSummary>,
    pub simulation: Option<SimulationResult>,
    pub advisories: Vec<String>,
}

/// Stable fingerprint of the input text; identical text, identical digest.
pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn analyze(source: &str, text: &str, cfg: &Config) -> Analysis {
    let span = tracing::info_span!("analyze", source = %source);
    let _guard = span.enter();

    let record = extract_invoice(text, &cfg.extraction, &cfg.history);
    let (filled, total) = record.coverage();
    info!(
        filled,
        total,
        group = %record.tariff_group,
        total_value = ?record.total_value,
        total_amount = ?record.total_amount(),
        location = %record.location,
        months = record.history.len(),
        "Extraction result"
    );

    let stats = summarize(&record.history);
    let simulation = stats.map(|s| simulate(s.mean, &record.location, &cfg.simulation));
    let advisories = advise(record.tariff_group, stats.as_ref(), &cfg.advisory);

    match (&stats, &simulation) {
        (Some(s), Some(sim)) => info!(
            mean = s.mean,
            peak = s.peak,
            min = s.min,
            seasonality = s.seasonality,
            kwp = sim.capacity_kwp,
            savings = sim.monthly_savings,
            payback = ?sim.payback_years,
            "Simulation"
        ),
        _ => info!("No consumption history — statistics undefined"),
    }

    Analysis {
        source: source.to_string(),
        digest: text_digest(text),
        record,
        stats,
        simulation,
        advisories,
    }
}

/// Documents are analysed one after another; nothing carries over between them.
pub fn analyze_batch<'a, I>(documents: I, cfg: &Config) -> Vec<Analysis>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    documents
        .into_iter()
        .map(|(source, text)| analyze(source, text, cfg))
        .collect()
}
