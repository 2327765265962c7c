// src/advisory.rs

use crate::heuristics::TariffGroup;
use crate::stats::StatsSummary;
use serde::{Deserialize, Serialize};

pub const INSUFFICIENT_DATA: &str = "insufficient data";

pub const LOW_CONSUMPTION: &str =
    "Low consumption: payback tends to be long, review the investment carefully";
pub const INTERMEDIATE_CONSUMPTION: &str =
    "Intermediate consumption: evaluate how much of the load runs during daylight";
pub const STRONG_FIT: &str = "High consumption: strong profile for solar generation";
pub const GROUP_B_ZERO_GRID: &str =
    "Group B: a zero-grid system pays off under the current compensation rules";
pub const GROUP_B_ANTI_BACKFEED: &str =
    "Peaks well above the mean: install an anti-backfeed (export limiting) device";
pub const GROUP_A_DEMAND: &str = "Group A: watch contracted demand and peak-hour charges";
pub const GROUP_A_BESS: &str =
    "Group A with high variability: consider a BESS to shave demand peaks";
pub const HIGH_SEASONALITY: &str = "High seasonality: consider battery storage (BESS)";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Mean kWh below which consumption counts as low.
    pub low_below: f64,
    /// Mean kWh above which the profile is a strong fit.
    pub strong_above: f64,
    /// Group B: mean kWh above which peaks are checked for backfeed risk.
    pub backfeed_mean_above: f64,
    /// Group B: peak/mean ratio above which an anti-backfeed device is advised.
    pub backfeed_peak_ratio: f64,
    /// Seasonality (kWh) above which battery storage is advised.
    pub seasonality_above: u32,
    /// Group A: peak above `mean * this` suggests a BESS.
    pub group_a_peak_multiple: f64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            low_below: 1500.0,
            strong_above: 4000.0,
            backfeed_mean_above: 2000.0,
            backfeed_peak_ratio: 1.4,
            seasonality_above: 4000,
            group_a_peak_multiple: 2.0,
        }
    }
}

/// Ordered recommendations: consumption tier, tariff group, seasonality.
///
/// Rules are independent; the group-specific BESS note and the general
/// seasonality note may both appear.
pub fn advise(
    group: TariffGroup,
    stats: Option<&StatsSummary>,
    cfg: &AdvisoryConfig,
) -> Vec<String> {
    let Some(stats) = stats else {
        return vec![INSUFFICIENT_DATA.to_string()];
    };
    let mut out = Vec::new();

    if stats.mean < cfg.low_below {
        out.push(LOW_CONSUMPTION);
    } else if stats.mean <= cfg.strong_above {
        out.push(INTERMEDIATE_CONSUMPTION);
    } else {
        out.push(STRONG_FIT);
    }

    let peak = stats.peak as f64;
    match group {
        TariffGroup::GroupB => {
            out.push(GROUP_B_ZERO_GRID);
            if stats.mean > cfg.backfeed_mean_above && stats.peak_ratio() > cfg.backfeed_peak_ratio
            {
                out.push(GROUP_B_ANTI_BACKFEED);
            }
        }
        TariffGroup::GroupA => {
            out.push(GROUP_A_DEMAND);
            if stats.seasonality > cfg.seasonality_above
                || peak > stats.mean * cfg.group_a_peak_multiple
            {
                out.push(GROUP_A_BESS);
            }
        }
        TariffGroup::Unidentified => {}
    }

    if stats.seasonality > cfg.seasonality_above {
        out.push(HIGH_SEASONALITY);
    }

    out.into_iter().map(String::from).collect()
}
