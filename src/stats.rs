// src/stats.rs

use crate::heuristics::ConsumptionHistory;
use serde::Serialize;

/// Summary of a consumption history. Only exists for a non-empty history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub mean: f64,
    pub peak: u32,
    pub min: u32,
    /// `peak - min`.
    pub seasonality: u32,
}

impl StatsSummary {
    /// Peak over mean; 0 when the mean is 0.
    pub fn peak_ratio(&self) -> f64 {
        if self.mean > 0.0 {
            self.peak as f64 / self.mean
        } else {
            0.0
        }
    }
}

/// `None` for an empty history: callers must not compute on defaults.
pub fn summarize(history: &ConsumptionHistory) -> Option<StatsSummary> {
    let peak = history.values().max().copied()?;
    let min = history.values().min().copied()?;
    let sum: u64 = history.values().map(|&kwh| u64::from(kwh)).sum();
    let mean = sum as f64 / history.len() as f64;

    Some(StatsSummary {
        mean,
        peak,
        min,
        seasonality: peak - min,
    })
}
