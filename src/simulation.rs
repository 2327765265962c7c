// src/simulation.rs

use crate::heuristics::{Location, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Estimated photovoltaic system for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationResult {
    pub capacity_kwp: f64,
    /// Currency units per month.
    pub monthly_savings: f64,
    /// `None` when there are no savings to pay the system back.
    pub payback_years: Option<f64>,
}

/// Turns mean monthly consumption into installed capacity for a site.
pub trait SizingModel {
    fn capacity_kwp(&self, mean_kwh: f64, location: &Location) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingModelKind {
    /// Monthly yield per kWp looked up by "City - UF".
    #[default]
    LocationTable,
    /// Daily sun hours looked up by state and region.
    InsolationTable,
}

// ---------------------------------------------------------------------------
// Model 1: empirical monthly yield per site
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationTable {
    /// kWh per kWp per month for sites not listed.
    pub fallback: f64,
    /// `"City - UF"` -> kWh per kWp per month.
    pub sites: BTreeMap<String, f64>,
}

impl Default for LocationTable {
    fn default() -> Self {
        let sites = [
            ("Toledo - PR", 140.0),
            ("Curitiba - PR", 115.0),
            ("Campo Grande - MS", 150.0),
        ]
        .into_iter()
        .map(|(site, yield_)| (site.to_string(), yield_))
        .collect();
        Self {
            fallback: 120.0,
            sites,
        }
    }
}

impl LocationTable {
    pub fn monthly_yield(&self, location: &Location) -> f64 {
        let key = normalize(&location.to_string());
        self.sites
            .iter()
            .find(|(site, _)| normalize(site) == key)
            .map(|(_, yield_)| *yield_)
            .unwrap_or(self.fallback)
    }
}

impl SizingModel for LocationTable {
    fn capacity_kwp(&self, mean_kwh: f64, location: &Location) -> f64 {
        let yield_ = self.monthly_yield(location);
        debug!(site = %location, yield_, "Monthly yield per kWp");
        if yield_ <= 0.0 {
            warn!(site = %location, "Non-positive yield configured — capacity set to 0");
            return 0.0;
        }
        round_to(mean_kwh / yield_, 1)
    }
}

// ---------------------------------------------------------------------------
// Model 2: sun hours by state and region
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    /// Average daily peak sun hours.
    pub hours: f64,
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateInsolation {
    /// Used for cities of this state that no region lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_hours: Option<f64>,
    pub regions: BTreeMap<String, Region>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsolationTable {
    pub fallback_hours: f64,
    /// Margin applied on top of mean consumption (1.2 = 20%).
    pub oversizing: f64,
    /// System efficiency after losses.
    pub derate: f64,
    pub days_per_month: f64,
    /// Keyed by two-letter state code.
    pub states: BTreeMap<String, StateInsolation>,
}

fn state(default_hours: f64, regions: Vec<(&str, f64, Vec<&str>)>) -> StateInsolation {
    StateInsolation {
        default_hours: Some(default_hours),
        regions: regions
            .into_iter()
            .map(|(name, hours, cities)| {
                let cities = cities.into_iter().map(String::from).collect();
                (name.to_string(), Region { hours, cities })
            })
            .collect(),
    }
}

impl Default for InsolationTable {
    fn default() -> Self {
        let states = [
            (
                "PR",
                state(
                    4.5,
                    vec![
                        ("oeste", 5.0, vec!["Toledo", "Cascavel", "Foz do Iguaçu"]),
                        ("norte", 4.75, vec!["Londrina", "Maringá", "Apucarana"]),
                        ("leste", 4.0, vec!["Curitiba", "Paranaguá", "Ponta Grossa"]),
                    ],
                ),
            ),
            (
                "MS",
                state(
                    5.0,
                    vec![
                        ("centro", 5.25, vec!["Campo Grande"]),
                        ("sul", 5.0, vec!["Dourados", "Ponta Porã"]),
                    ],
                ),
            ),
            (
                "SC",
                state(
                    4.25,
                    vec![
                        ("oeste", 4.5, vec!["Chapecó", "São Miguel do Oeste"]),
                        ("litoral", 4.0, vec!["Florianópolis", "Joinville", "Itajaí"]),
                    ],
                ),
            ),
            (
                "RS",
                state(
                    4.25,
                    vec![
                        ("serra", 3.75, vec!["Caxias do Sul", "Bento Gonçalves"]),
                        ("noroeste", 4.5, vec!["Santa Rosa", "Ijuí"]),
                    ],
                ),
            ),
            ("SP", state(4.75, Vec::new())),
        ]
        .into_iter()
        .map(|(uf, s)| (uf.to_string(), s))
        .collect();

        Self {
            fallback_hours: 4.5,
            oversizing: 1.2,
            derate: 0.8,
            days_per_month: 30.0,
            states,
        }
    }
}

impl InsolationTable {
    /// City within its state, then the state's default, then the fallback.
    pub fn sun_hours(&self, location: &Location) -> f64 {
        let Some(state) = self.states.get(&location.state) else {
            return self.fallback_hours;
        };
        let city = normalize(location.city.trim());
        state
            .regions
            .values()
            .find(|r| r.cities.iter().any(|c| normalize(c.trim()) == city))
            .map(|r| r.hours)
            .or(state.default_hours)
            .unwrap_or(self.fallback_hours)
    }
}

impl SizingModel for InsolationTable {
    fn capacity_kwp(&self, mean_kwh: f64, location: &Location) -> f64 {
        let hours = self.sun_hours(location);
        let monthly_yield = hours * self.days_per_month * self.derate;
        debug!(site = %location, hours, monthly_yield, "Insolation lookup");
        if monthly_yield <= 0.0 {
            warn!(site = %location, "Non-positive insolation yield — capacity set to 0");
            return 0.0;
        }
        round_to(mean_kwh * self.oversizing / monthly_yield, 1)
    }
}

// ---------------------------------------------------------------------------
// Economics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub sizing_model: SizingModelKind,
    /// Share of the consumption value offset by the system, as a flat
    /// tariff proxy.
    pub offset_ratio: f64,
    /// Installed cost per kWp.
    pub cost_per_kwp: f64,
    pub location_table: LocationTable,
    pub insolation_table: InsolationTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sizing_model: SizingModelKind::default(),
            offset_ratio: 0.85,
            cost_per_kwp: 1300.0,
            location_table: LocationTable::default(),
            insolation_table: InsolationTable::default(),
        }
    }
}

impl SimulationConfig {
    pub fn model(&self) -> &dyn SizingModel {
        match self.sizing_model {
            SizingModelKind::LocationTable => &self.location_table,
            SizingModelKind::InsolationTable => &self.insolation_table,
        }
    }
}

pub fn simulate(mean_kwh: f64, location: &Location, cfg: &SimulationConfig) -> SimulationResult {
    let capacity_kwp = cfg.model().capacity_kwp(mean_kwh, location);
    let monthly_savings = round_to(mean_kwh * cfg.offset_ratio, 2);
    let payback_years = (monthly_savings > 0.0)
        .then(|| round_to(capacity_kwp * cfg.cost_per_kwp / monthly_savings, 1));

    SimulationResult {
        capacity_kwp,
        monthly_savings,
        payback_years,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(city: &str, state: &str) -> Location {
        Location {
            city: city.to_string(),
            state: state.to_string(),
        }
    }

    fn insolation_cfg() -> SimulationConfig {
        SimulationConfig {
            sizing_model: SizingModelKind::InsolationTable,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_location_table_known_site() {
        let r = simulate(1400.0, &site("Toledo", "PR"), &SimulationConfig::default());
        assert_eq!(r.capacity_kwp, 10.0);
        assert_eq!(r.monthly_savings, 1190.0);
        assert_eq!(r.payback_years, Some(10.9));
    }

    #[test]
    fn test_location_table_fallback_and_accents() {
        let table = LocationTable::default();
        assert_eq!(table.monthly_yield(&site("Manaus", "AM")), 120.0);
        assert_eq!(table.monthly_yield(&site("CURITIBA", "PR")), 115.0);
        assert_eq!(table.monthly_yield(&site("Campo Grande", "MS")), 150.0);
    }

    #[test]
    fn test_insolation_region_lookup() {
        let table = InsolationTable::default();
        assert_eq!(table.sun_hours(&site("Foz do Iguacu", "PR")), 5.0);
        assert_eq!(table.sun_hours(&site("Curitiba", "PR")), 4.0);
        assert_eq!(table.sun_hours(&site("Aquidauana", "MS")), 5.0);
        assert_eq!(table.sun_hours(&site("Manaus", "AM")), 4.5);
    }

    #[test]
    fn test_insolation_capacity() {
        let cfg = insolation_cfg();
        // 1000 * 1.2 / (5.0 * 30 * 0.8)
        assert_eq!(simulate(1000.0, &site("Toledo", "PR"), &cfg).capacity_kwp, 10.0);
        // 1000 * 1.2 / (4.5 * 30 * 0.8)
        assert_eq!(simulate(1000.0, &site("Manaus", "AM"), &cfg).capacity_kwp, 11.1);
    }

    #[test]
    fn test_zero_mean_has_no_payback() {
        let r = simulate(0.0, &Location::default(), &SimulationConfig::default());
        assert_eq!(r.capacity_kwp, 0.0);
        assert_eq!(r.monthly_savings, 0.0);
        assert_eq!(r.payback_years, None);
    }

    #[test]
    fn test_constants_are_overridable() {
        let cfg = SimulationConfig {
            offset_ratio: 0.5,
            cost_per_kwp: 2000.0,
            ..SimulationConfig::default()
        };
        let r = simulate(1200.0, &Location::default(), &cfg);
        assert_eq!(r.capacity_kwp, 8.6);
        assert_eq!(r.monthly_savings, 600.0);
        assert_eq!(r.payback_years, Some(28.7));
    }

    #[test]
    fn test_zero_yield_does_not_divide() {
        let cfg = SimulationConfig {
            location_table: LocationTable {
                fallback: 0.0,
                sites: BTreeMap::new(),
            },
            ..SimulationConfig::default()
        };
        let r = simulate(1000.0, &Location::default(), &cfg);
        assert_eq!(r.capacity_kwp, 0.0);
        assert_eq!(r.payback_years, Some(0.0));
    }
}
