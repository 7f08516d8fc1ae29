use std::fmt::Write;

use chrono::{DateTime, Local};
use comfy_table::Table;

use crate::dashboard::SnapshotSurface;
use crate::models::{AdminStats, CredentialRecord, CredentialStatus};
use crate::render::ChartConfig;
use crate::selector::{SelectorOptions, SelectorState};

pub fn build_report(
    selectors: &SelectorState,
    options: &SelectorOptions,
    snapshot: &SnapshotSurface,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Disease Surveillance Dashboard");
    let years = options
        .years
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        output,
        "Region: {} | years available: {}",
        selectors.region.name().unwrap_or("All Regions"),
        if years.is_empty() { "none" } else { years.as_str() }
    );
    let _ = writeln!(output);

    match &snapshot.indicators {
        Some(panel) => {
            let _ = writeln!(output, "## {}", panel.title);
            let _ = writeln!(output, "- Total cases: {}", panel.total_cases);
            let _ = writeln!(output, "- Total deaths: {}", panel.total_deaths);
            let _ = writeln!(output, "- Top city: {}", panel.top_city);
        }
        None => {
            let _ = writeln!(output, "## Key Indicators");
            let _ = writeln!(output, "No surveillance data loaded.");
        }
    }

    write_chart(&mut output, "Disease Trends", snapshot.trend_chart.as_ref());
    write_chart(&mut output, "Top Districts", snapshot.regional_chart.as_ref());

    let _ = writeln!(output);
    match &snapshot.map {
        Some(layer) => {
            let _ = writeln!(output, "## District Map {}", layer.year);
            let mut hotspots: Vec<_> = layer.features.iter().filter(|f| f.cases > 0).collect();
            hotspots.sort_by(|a, b| b.cases.cmp(&a.cases));
            if hotspots.is_empty() {
                let _ = writeln!(output, "No district reported cases.");
            }
            for feature in hotspots {
                let _ = writeln!(
                    output,
                    "- {}: {} cases (marker radius {:.1}, fill {})",
                    feature.district, feature.cases, feature.marker.radius, feature.area.fill_color
                );
            }
        }
        None => {
            let _ = writeln!(output, "## District Map");
            let _ = writeln!(output, "Map data unavailable.");
        }
    }

    output
}

fn write_chart(output: &mut String, heading: &str, chart: Option<&ChartConfig>) {
    let _ = writeln!(output);
    let Some(chart) = chart else {
        let _ = writeln!(output, "## {heading}");
        let _ = writeln!(output, "Chart unavailable.");
        return;
    };

    let _ = writeln!(output, "## {}", chart.title);
    if chart.datasets.is_empty() {
        let _ = writeln!(output, "No data for this year.");
        return;
    }

    let _ = writeln!(output, "| Series | {} |", chart.labels.join(" | "));
    let _ = writeln!(output, "|---{}|", "|---".repeat(chart.labels.len()));
    for dataset in &chart.datasets {
        let values = dataset
            .data
            .iter()
            .map(|v| chart.format_tick(*v))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(output, "| {} | {values} |", dataset.label);
    }
}

pub fn doctor_table<'a>(doctors: impl IntoIterator<Item = &'a CredentialRecord>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Email", "License", "Specialization", "Status"]);

    for doctor in doctors {
        table.add_row(vec![
            doctor.id.to_string(),
            doctor.name.clone(),
            doctor.email.clone(),
            doctor.license.clone(),
            doctor.specialization.clone(),
            doctor.status.to_string(),
        ]);
    }

    table
}

pub fn doctor_stats(stats: &AdminStats, now: DateTime<Local>) -> String {
    format!(
        "{}: {} | approved in {}: {} | rejected in {}: {}",
        CredentialStatus::Pending,
        stats.pending,
        now.format("%B %Y"),
        stats.approved_this_month,
        now.format("%B %Y"),
        stats.rejected_this_month
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::IndicatorPanel;

    #[test]
    fn report_handles_empty_dashboard() {
        let report = build_report(
            &SelectorState::default(),
            &SelectorOptions::default(),
            &SnapshotSurface::default(),
        );
        assert!(report.contains("No surveillance data loaded."));
        assert!(report.contains("years available: none"));
        assert!(report.contains("Map data unavailable."));
    }

    #[test]
    fn report_lists_indicators() {
        let snapshot = SnapshotSurface {
            indicators: Some(IndicatorPanel {
                title: "Key Indicators 2024".to_string(),
                total_cases: "1.2K".to_string(),
                total_deaths: "8".to_string(),
                top_city: "Pune (900)".to_string(),
            }),
            ..SnapshotSurface::default()
        };
        let options = SelectorOptions {
            years: vec![2024, 2023],
            ..SelectorOptions::default()
        };
        let report = build_report(&SelectorState::default(), &options, &snapshot);
        assert!(report.contains("## Key Indicators 2024"));
        assert!(report.contains("- Top city: Pune (900)"));
        assert!(report.contains("years available: 2024, 2023"));
    }
}
