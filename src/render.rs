//! Chart, indicator and map presentation for the derived views.

use serde::Serialize;

use crate::aggregate::MONTHS;
use crate::models::{
    DiseaseTrends, KeyIndicators, Leader, MapFeatureSummary, MapSummary, RegionalRanking,
};

const BAR_FILL: &str = "rgba(52, 152, 219, 0.8)";
const BAR_BORDER: &str = "rgba(52, 152, 219, 1)";
const NO_LEADER: &str = "–";

/// Compact count: 1.2M, 3.4K, or the grouped integer below a thousand.
pub fn format_number(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        group_thousands(value)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorPanel {
    pub title: String,
    pub total_cases: String,
    pub total_deaths: String,
    pub top_city: String,
}

impl From<&KeyIndicators> for IndicatorPanel {
    fn from(indicators: &KeyIndicators) -> Self {
        let week = indicators
            .week
            .map(|w| format!(" - Week {w}"))
            .unwrap_or_default();
        let region = indicators
            .region
            .as_deref()
            .map(|r| format!(" - {r}"))
            .unwrap_or_default();
        let top_city = match &indicators.leader {
            Leader::Area { name, cases } => format!("{name} ({})", format_number(*cases)),
            Leader::None => NO_LEADER.to_string(),
        };

        Self {
            title: format!("Key Indicators {}{week}{region}", indicators.year),
            total_cases: format_number(indicators.total_cases),
            total_deaths: format_number(indicators.total_deaths),
            top_city,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

/// Formatter applied to the y axis ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickFormat {
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<u64>,
    pub border_color: String,
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub legend_top: bool,
    pub begin_at_zero: bool,
    pub tick_format: Option<TickFormat>,
}

impl ChartConfig {
    fn empty(kind: ChartKind, year: i32) -> Self {
        Self {
            kind,
            title: format!("No data for {year}"),
            labels: Vec::new(),
            datasets: Vec::new(),
            legend_top: false,
            begin_at_zero: false,
            tick_format: None,
        }
    }

    pub fn format_tick(&self, value: u64) -> String {
        match self.tick_format {
            Some(TickFormat::Compact) => format_number(value),
            None => value.to_string(),
        }
    }
}

pub fn trend_chart(trends: &DiseaseTrends) -> ChartConfig {
    if !trends.has_data {
        return ChartConfig::empty(ChartKind::Line, trends.year);
    }

    let datasets = trends
        .series
        .iter()
        .enumerate()
        .map(|(index, series)| {
            let hue = index * 72;
            Dataset {
                label: series.disease.clone(),
                data: series.monthly_cases.to_vec(),
                border_color: format!("hsl({hue}, 60%, 40%)"),
                background_color: format!("hsla({hue}, 70%, 50%, 0.1)"),
                tension: Some(0.0),
                fill: Some(false),
                border_width: None,
            }
        })
        .collect();

    ChartConfig {
        kind: ChartKind::Line,
        title: format!("Disease Trends {}", trends.year),
        labels: MONTHS.iter().map(|m| m.to_string()).collect(),
        datasets,
        legend_top: true,
        begin_at_zero: true,
        tick_format: Some(TickFormat::Compact),
    }
}

pub fn regional_chart(ranking: &RegionalRanking) -> ChartConfig {
    if !ranking.has_data {
        return ChartConfig::empty(ChartKind::Bar, ranking.year);
    }

    ChartConfig {
        kind: ChartKind::Bar,
        title: format!("Top 5 Districts by Cases {}", ranking.year),
        labels: ranking.labels.clone(),
        datasets: vec![Dataset {
            label: "Total Cases".to_string(),
            data: ranking.values.clone(),
            border_color: BAR_BORDER.to_string(),
            background_color: BAR_FILL.to_string(),
            tension: None,
            fill: None,
            border_width: Some(1),
        }],
        legend_top: false,
        begin_at_zero: true,
        tick_format: Some(TickFormat::Compact),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: String,
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f64,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStyle {
    pub fill_color: String,
    pub weight: u32,
    pub opacity: f64,
    pub color: &'static str,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureLayer {
    pub district: String,
    pub cases: u64,
    pub marker: MarkerStyle,
    pub area: AreaStyle,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub year: i32,
    pub features: Vec<FeatureLayer>,
}

pub fn map_layer(summary: &MapSummary) -> MapLayer {
    MapLayer {
        year: summary.year,
        features: summary
            .features
            .iter()
            .map(|feature| feature_layer(feature, summary.year))
            .collect(),
    }
}

fn feature_layer(feature: &MapFeatureSummary, year: i32) -> FeatureLayer {
    FeatureLayer {
        district: feature.district.clone(),
        cases: feature.cases,
        marker: MarkerStyle {
            radius: feature.radius,
            fill_color: feature.marker_color.clone(),
            color: "white",
            weight: 1,
            opacity: 1.0,
            fill_opacity: 0.8,
        },
        area: AreaStyle {
            fill_color: feature.fill_color.clone(),
            weight: 2,
            opacity: 1.0,
            color: "white",
            fill_opacity: 0.7,
        },
        popup: format!(
            "<strong>{}</strong><br>Cases: {}<br>Year: {year}",
            feature.district,
            group_thousands(feature.cases)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::style_feature;
    use crate::models::DiseaseSeries;

    #[test]
    fn formats_compact_numbers() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1.0K");
        assert_eq!(format_number(15_260), "15.3K");
        assert_eq!(format_number(2_500_000), "2.5M");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn indicator_title_reflects_filters() {
        let indicators = KeyIndicators {
            year: 2024,
            week: Some(3),
            region: Some("Pune".to_string()),
            total_cases: 1_500,
            total_deaths: 12,
            leader: Leader::Area {
                name: "Pune".to_string(),
                cases: 1_500,
            },
        };
        let panel = IndicatorPanel::from(&indicators);
        assert_eq!(panel.title, "Key Indicators 2024 - Week 3 - Pune");
        assert_eq!(panel.total_cases, "1.5K");
        assert_eq!(panel.top_city, "Pune (1.5K)");

        let none = IndicatorPanel::from(&KeyIndicators {
            leader: Leader::None,
            week: None,
            region: None,
            ..indicators
        });
        assert_eq!(none.title, "Key Indicators 2024");
        assert_eq!(none.top_city, "–");
    }

    #[test]
    fn trend_chart_colours_each_series() {
        let trends = DiseaseTrends {
            year: 2024,
            has_data: true,
            series: vec![
                DiseaseSeries {
                    disease: "Dengue".to_string(),
                    monthly_cases: [1; 12],
                },
                DiseaseSeries {
                    disease: "Malaria".to_string(),
                    monthly_cases: [0; 12],
                },
            ],
        };
        let chart = trend_chart(&trends);
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.labels.len(), 12);
        assert_eq!(chart.datasets[1].border_color, "hsl(72, 60%, 40%)");
        assert_eq!(chart.datasets[1].background_color, "hsla(72, 70%, 50%, 0.1)");
        assert_eq!(chart.format_tick(12_000), "12.0K");
    }

    #[test]
    fn empty_years_render_placeholder_charts() {
        let chart = regional_chart(&RegionalRanking {
            year: 2020,
            has_data: false,
            labels: Vec::new(),
            values: Vec::new(),
        });
        assert_eq!(chart.title, "No data for 2020");
        assert!(chart.datasets.is_empty());
    }

    #[test]
    fn map_popup_lists_cases_and_year() {
        let summary = MapSummary {
            year: 2023,
            max_cases: 1_200,
            features: vec![style_feature("Pune".to_string(), 1_200, 1_200)],
        };
        let layer = map_layer(&summary);
        let feature = &layer.features[0];
        assert_eq!(
            feature.popup,
            "<strong>Pune</strong><br>Cases: 1,200<br>Year: 2023"
        );
        assert_eq!(feature.area.fill_color, "hsl(0, 70%, 50%)");
        assert_eq!(feature.marker.radius, 12.0);
    }
}
