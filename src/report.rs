// src/report.rs
//
// Presentation-side outputs: fixed-layout report lines, chart series and
// JSON. Rendering to images or PDF happens outside this crate.

use crate::analysis::Analysis;
use crate::heuristics::ConsumptionHistory;
use serde::Serialize;

/// Bar chart input: labels in history order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

pub fn chart_series(history: &ConsumptionHistory) -> Option<ChartSeries> {
    if history.is_empty() {
        return None;
    }
    Some(ChartSeries {
        title: "Consumption history (kWh)".to_string(),
        labels: history.keys().cloned().collect(),
        values: history.values().copied().collect(),
    })
}

/// Report body, one line per block. Statistics and simulation lines are
/// left out when there is no history.
pub fn report_lines(analysis: &Analysis, currency: &str) -> Vec<String> {
    let record = &analysis.record;
    let mut lines = vec![
        format!(
            "Group: {}  |  Location: {}",
            record.tariff_group, record.location
        ),
        match &record.total_value {
            Some(total) => format!("Total: {currency} {total}"),
            None => "Total: not found".to_string(),
        },
    ];

    if let Some(s) = &analysis.stats {
        lines.push(format!(
            "Mean {:.1} kWh  |  Peak {} kWh  |  Min {} kWh  |  Seasonality {} kWh",
            s.mean, s.peak, s.min, s.seasonality
        ));
    }

    if let Some(sim) = &analysis.simulation {
        let payback = match sim.payback_years {
            Some(years) => format!("{years} years"),
            None => "n/a".to_string(),
        };
        lines.push(format!(
            "System ~{} kWp  |  Savings ~{currency} {:.2}/month  |  Payback {payback}",
            sim.capacity_kwp, sim.monthly_savings
        ));
    }

    lines.push("Suggestions:".to_string());
    lines.extend(analysis.advisories.iter().map(|a| format!("- {a}")));
    lines
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    #[serde(flatten)]
    analysis: &'a Analysis,
    chart: Option<ChartSeries>,
}

/// Everything a renderer needs, as pretty JSON.
pub fn to_json(analyses: &[Analysis]) -> serde_json::Result<String> {
    let docs: Vec<ReportDocument<'_>> = analyses
        .iter()
        .map(|analysis| ReportDocument {
            analysis,
            chart: chart_series(&analysis.record.history),
        })
        .collect();
    serde_json::to_string_pretty(&docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::Config;

    const INVOICE: &str = "Grupo A - Subgrupo A4\n\
        Referente 05/2025 a 06/2025 Total R$ 8.765,43\n\
        Cidade: Curitiba - Estado: PR\n\
        MAI25 2300 ABR25 2200 MAR25 2500 FEV25 2400\n";

    #[test]
    fn test_report_lines_for_full_record() {
        let a = analyze("fatura.txt", INVOICE, &Config::default());
        let lines = report_lines(&a, "R$");

        assert_eq!(lines[0], "Group: Group A  |  Location: Curitiba - PR");
        assert_eq!(lines[1], "Total: R$ 8.765,43");
        assert_eq!(
            lines[2],
            "Mean 2350.0 kWh  |  Peak 2500 kWh  |  Min 2200 kWh  |  Seasonality 300 kWh"
        );
        // 2350 / 115 -> 20.4 kWp; 2350 * 0.85 = 1997.50; 20.4 * 1300 / 1997.5 -> 13.3
        assert_eq!(
            lines[3],
            "System ~20.4 kWp  |  Savings ~R$ 1997.50/month  |  Payback 13.3 years"
        );
        assert_eq!(lines[4], "Suggestions:");
        assert_eq!(lines.len(), 5 + a.advisories.len());
        assert!(lines[5..].iter().all(|l| l.starts_with("- ")));
    }

    #[test]
    fn test_report_lines_without_history() {
        let a = analyze("vazio.txt", "", &Config::default());
        let lines = report_lines(&a, "R$");

        assert_eq!(
            lines,
            vec![
                "Group: Unidentified  |  Location: Toledo - PR",
                "Total: not found",
                "Suggestions:",
                "- insufficient data",
            ]
        );
    }

    #[test]
    fn test_chart_series_keeps_order() {
        let a = analyze("fatura.txt", INVOICE, &Config::default());
        let chart = chart_series(&a.record.history).unwrap();
        assert_eq!(chart.labels, vec!["MAI25", "ABR25", "MAR25", "FEV25"]);
        assert_eq!(chart.values, vec![2300, 2200, 2500, 2400]);
        assert!(chart_series(&ConsumptionHistory::new()).is_none());
    }

    #[test]
    fn test_json_contains_record_and_chart() {
        let a = analyze("fatura.txt", INVOICE, &Config::default());
        let json = to_json(&[a]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["record"]["tariff_group"], "GroupA");
        assert_eq!(value[0]["record"]["total_value"], "8.765,43");
        assert_eq!(value[0]["record"]["history"]["MAI25"], 2300);
        assert_eq!(value[0]["chart"]["values"][2], 2500);
        assert_eq!(value[0]["simulation"]["payback_years"], 13.3);
    }
}
