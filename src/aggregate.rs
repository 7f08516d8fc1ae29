//! Derived dashboard views.
//!
//! Every function recomputes from the full record set; nothing is cached
//! between calls. Rankings break ties by first appearance in the record set,
//! so the result depends on record order whenever two totals are equal.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{
    DiseaseSeries, DiseaseTrends, KeyIndicators, Leader, MapFeatureSummary, MapSummary,
    RegionalRanking, SurveillanceRecord, UNKNOWN,
};
use crate::normalize::parse_count;
use crate::selector::Region;

pub const TOP_N: usize = 5;
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
pub const NEUTRAL_COLOR: &str = "#cccccc";
pub const MARKER_COLOR: &str = "red";
const MIN_RADIUS: f64 = 5.0;
const MAX_RADIUS: f64 = 20.0;

pub fn key_indicators(
    records: &[SurveillanceRecord],
    year: i32,
    week: Option<i32>,
    region: &Region,
) -> KeyIndicators {
    let filtered: Vec<&SurveillanceRecord> = records
        .iter()
        .filter(|r| r.year == Some(year))
        .filter(|r| week.is_none() || r.week == week)
        .filter(|r| region.matches(&r.area))
        .collect();

    let total_cases = filtered.iter().map(|r| r.cases).fold(0, u64::saturating_add);
    let total_deaths = filtered.iter().map(|r| r.deaths).fold(0, u64::saturating_add);

    let mut leader = Leader::None;
    let mut top_cases = 0;
    for (area, cases) in totals_by(filtered.iter().copied(), |r| &r.area) {
        if cases > top_cases {
            top_cases = cases;
            leader = Leader::Area { name: area, cases };
        }
    }

    KeyIndicators {
        year,
        week,
        region: region.name().map(str::to_string),
        total_cases,
        total_deaths,
        leader,
    }
}

/// Month bucket for a week number: four weeks per month, everything past
/// week 48 lands in December.
pub fn month_bucket(week: i32) -> usize {
    let index = week.saturating_sub(1).div_euclid(4).max(0);
    (index as usize).min(11)
}

pub fn disease_trends(records: &[SurveillanceRecord], year: i32) -> DiseaseTrends {
    let year_records: Vec<&SurveillanceRecord> =
        records.iter().filter(|r| r.year == Some(year)).collect();

    let top = top_n(totals_by(year_records.iter().copied(), |r| &r.disease));
    let mut series: Vec<DiseaseSeries> = top
        .into_iter()
        .map(|(disease, _)| DiseaseSeries {
            disease,
            monthly_cases: [0; 12],
        })
        .collect();

    for record in &year_records {
        let Some(week) = record.week else { continue };
        if let Some(entry) = series.iter_mut().find(|s| s.disease == record.disease) {
            let bucket = &mut entry.monthly_cases[month_bucket(week)];
            *bucket = bucket.saturating_add(record.cases);
        }
    }

    DiseaseTrends {
        year,
        has_data: !year_records.is_empty(),
        series,
    }
}

pub fn regional_ranking(records: &[SurveillanceRecord], year: i32) -> RegionalRanking {
    let year_records: Vec<&SurveillanceRecord> =
        records.iter().filter(|r| r.year == Some(year)).collect();

    let (labels, values) = top_n(totals_by(year_records.iter().copied(), |r| &r.area))
        .into_iter()
        .unzip();

    RegionalRanking {
        year,
        has_data: !year_records.is_empty(),
        labels,
        values,
    }
}

/// Styles each feature of a per-year district collection by its case count.
pub fn map_summary(year: i32, collection: &Value) -> MapSummary {
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let counted: Vec<(String, u64)> = features
        .iter()
        .map(|feature| {
            let props = feature.get("properties");
            let district = props
                .and_then(|p| p.get("district_display"))
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string();
            let cases = parse_count(props.and_then(|p| p.get("cases")));
            (district, cases)
        })
        .collect();

    let max_cases = counted.iter().map(|(_, c)| *c).max().unwrap_or(0);

    MapSummary {
        year,
        max_cases,
        features: counted
            .into_iter()
            .map(|(district, cases)| style_feature(district, cases, max_cases))
            .collect(),
    }
}

pub fn style_feature(district: String, cases: u64, max_cases: u64) -> MapFeatureSummary {
    let intensity = if max_cases > 0 {
        cases as f64 / max_cases as f64
    } else {
        0.0
    };
    let hue = 120.0 - 120.0 * intensity;
    let (marker_color, fill_color) = if cases > 0 {
        (MARKER_COLOR.to_string(), format!("hsl({hue}, 70%, 50%)"))
    } else {
        (NEUTRAL_COLOR.to_string(), NEUTRAL_COLOR.to_string())
    };

    MapFeatureSummary {
        district,
        cases,
        radius: (cases as f64 / 100.0).clamp(MIN_RADIUS, MAX_RADIUS),
        marker_color,
        intensity,
        hue,
        fill_color,
    }
}

/// Case totals keyed by label, in first-seen order. The "Unknown"
/// placeholder never takes part in a ranking.
fn totals_by<'a, I, F>(records: I, key: F) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a SurveillanceRecord>,
    F: Fn(&'a SurveillanceRecord) -> &'a String,
{
    let mut order: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let label = key(record);
        if label.is_empty() || label == UNKNOWN {
            continue;
        }
        match index.get(label.as_str()) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(record.cases),
            None => {
                index.insert(label.as_str(), order.len());
                order.push((label.clone(), record.cases));
            }
        }
    }

    order
}

fn top_n(mut totals: Vec<(String, u64)>) -> Vec<(String, u64)> {
    // sort_by is stable, so equal totals keep first-seen order
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.truncate(TOP_N);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(year: i32, week: i32, area: &str, disease: &str, cases: u64) -> SurveillanceRecord {
        SurveillanceRecord {
            year: Some(year),
            week: Some(week),
            area: area.to_string(),
            disease: disease.to_string(),
            cases,
            deaths: cases / 10,
            unique_id: String::new(),
            state: "Maharashtra".to_string(),
            date_start: String::new(),
            date_reporting: String::new(),
        }
    }

    fn sample() -> Vec<SurveillanceRecord> {
        vec![
            record(2024, 1, "Pune", "Dengue", 40),
            record(2024, 5, "Nagpur", "Malaria", 70),
            record(2024, 5, "Pune", "Malaria", 20),
            record(2023, 2, "Pune", "Dengue", 500),
            record(2024, 49, "Mumbai", "Cholera", 10),
            record(2024, 53, "Unknown", "Dengue", 5),
        ]
    }

    #[test]
    fn key_indicator_totals_for_year() {
        let records = sample();
        let result = key_indicators(&records, 2024, None, &Region::All);
        assert_eq!(result.total_cases, 145);
        assert_eq!(result.total_deaths, 4 + 7 + 2 + 1);
        assert_eq!(
            result.leader,
            Leader::Area {
                name: "Nagpur".to_string(),
                cases: 70
            }
        );
    }

    #[test]
    fn key_indicator_totals_ignore_record_order() {
        let mut records = sample();
        let forward = key_indicators(&records, 2024, None, &Region::All);
        records.reverse();
        let backward = key_indicators(&records, 2024, None, &Region::All);
        assert_eq!(forward.total_cases, backward.total_cases);
        assert_eq!(forward.total_deaths, backward.total_deaths);
    }

    #[test]
    fn oversized_counts_saturate_instead_of_overflowing() {
        let huge = i64::MAX as u64;
        let records = vec![
            record(2024, 1, "Pune", "Dengue", huge),
            record(2024, 1, "Pune", "Dengue", huge),
            record(2024, 2, "Pune", "Dengue", huge),
        ];

        let indicators = key_indicators(&records, 2024, None, &Region::All);
        assert_eq!(indicators.total_cases, u64::MAX);
        assert_eq!(
            indicators.leader,
            Leader::Area {
                name: "Pune".to_string(),
                cases: u64::MAX
            }
        );

        let trends = disease_trends(&records, 2024);
        assert_eq!(trends.series[0].monthly_cases[0], u64::MAX);

        let ranking = regional_ranking(&records, 2024);
        assert_eq!(ranking.values, vec![u64::MAX]);
    }

    #[test]
    fn key_indicators_filter_week_and_region() {
        let records = sample();
        let result = key_indicators(&records, 2024, Some(5), &Region::parse("Pune"));
        assert_eq!(result.total_cases, 20);
        assert_eq!(result.region.as_deref(), Some("Pune"));
    }

    #[test]
    fn leader_tie_depends_on_record_order() {
        let mut records = vec![
            record(2024, 1, "Akola", "Dengue", 30),
            record(2024, 1, "Beed", "Dengue", 30),
        ];
        let first = key_indicators(&records, 2024, None, &Region::All);
        assert!(matches!(first.leader, Leader::Area { ref name, .. } if name == "Akola"));

        records.reverse();
        let second = key_indicators(&records, 2024, None, &Region::All);
        assert!(matches!(second.leader, Leader::Area { ref name, .. } if name == "Beed"));
    }

    #[test]
    fn no_positive_cases_means_no_leader() {
        let records = vec![record(2024, 1, "Akola", "Dengue", 0)];
        let result = key_indicators(&records, 2024, None, &Region::All);
        assert_eq!(result.leader, Leader::None);

        let empty = key_indicators(&[], 2024, None, &Region::All);
        assert_eq!(empty.total_cases, 0);
        assert_eq!(empty.leader, Leader::None);
    }

    #[test]
    fn weeks_map_to_four_week_buckets() {
        assert_eq!(month_bucket(1), 0);
        assert_eq!(month_bucket(4), 0);
        assert_eq!(month_bucket(5), 1);
        assert_eq!(month_bucket(49), 11);
        assert_eq!(month_bucket(53), 11);
        assert_eq!(month_bucket(0), 0);
    }

    #[test]
    fn disease_trends_bucket_top_diseases() {
        let records = sample();
        let trends = disease_trends(&records, 2024);
        assert!(trends.has_data);

        let names: Vec<&str> = trends.series.iter().map(|s| s.disease.as_str()).collect();
        assert_eq!(names, vec!["Malaria", "Dengue", "Cholera"]);

        let malaria = &trends.series[0];
        assert_eq!(malaria.monthly_cases[1], 90);
        assert_eq!(malaria.monthly_cases.iter().sum::<u64>(), 90);

        let dengue = &trends.series[1];
        assert_eq!(dengue.monthly_cases[0], 40);
        assert_eq!(dengue.monthly_cases[11], 5);

        let cholera = &trends.series[2];
        assert_eq!(cholera.monthly_cases[11], 10);
    }

    #[test]
    fn top_n_is_bounded_and_descending() {
        let records: Vec<SurveillanceRecord> = (0..8)
            .map(|i| record(2024, 1, &format!("Area{i}"), &format!("D{i}"), 10 * (i as u64 % 4)))
            .chain((0..8).map(|i| record(2024, 2, &format!("Area{i}"), &format!("D{i}"), 1)))
            .collect();

        let ranking = regional_ranking(&records, 2024);
        assert_eq!(ranking.labels.len(), 5);
        assert!(ranking.values.windows(2).all(|w| w[0] >= w[1]));
        let mut unique = ranking.labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ranking.labels.len());

        let trends = disease_trends(&records, 2024);
        assert_eq!(trends.series.len(), 5);
    }

    #[test]
    fn regional_ranking_ties_keep_first_seen_order() {
        let records = vec![
            record(2024, 1, "Wardha", "Dengue", 10),
            record(2024, 1, "Akola", "Dengue", 10),
            record(2024, 1, "Pune", "Dengue", 12),
        ];
        let ranking = regional_ranking(&records, 2024);
        assert_eq!(ranking.labels, vec!["Pune", "Wardha", "Akola"]);
        assert_eq!(ranking.values, vec![12, 10, 10]);
    }

    #[test]
    fn missing_year_yields_empty_views() {
        let records = sample();
        let trends = disease_trends(&records, 1999);
        assert!(!trends.has_data);
        assert!(trends.series.is_empty());

        let ranking = regional_ranking(&records, 1999);
        assert!(!ranking.has_data);
        assert!(ranking.labels.is_empty());
    }

    #[test]
    fn map_styles_by_share_of_max() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"district_display": "Pune", "cases": 4000}},
                {"properties": {"district_display": "Akola", "cases": 0}},
                {"properties": {"district_display": "Beed", "cases": 1000}},
                {"properties": {}},
            ]
        });
        let summary = map_summary(2024, &collection);
        assert_eq!(summary.max_cases, 4000);

        let pune = &summary.features[0];
        assert_eq!(pune.hue, 0.0);
        assert_eq!(pune.radius, 20.0);
        assert_eq!(pune.marker_color, "red");

        let akola = &summary.features[1];
        assert_eq!(akola.fill_color, NEUTRAL_COLOR);
        assert_eq!(akola.marker_color, NEUTRAL_COLOR);
        assert_eq!(akola.radius, 5.0);

        let beed = &summary.features[2];
        assert_eq!(beed.hue, 90.0);
        assert_eq!(beed.radius, 10.0);

        assert_eq!(summary.features[3].district, "Unknown");
    }

    #[test]
    fn map_without_cases_stays_neutral() {
        let collection = json!({
            "features": [{"properties": {"district_display": "Pune", "cases": 0}}]
        });
        let summary = map_summary(2024, &collection);
        assert_eq!(summary.max_cases, 0);
        assert_eq!(summary.features[0].intensity, 0.0);
        assert_eq!(summary.features[0].fill_color, NEUTRAL_COLOR);
        assert!(summary.features[0].hue.is_finite());

        assert!(map_summary(2024, &json!({})).features.is_empty());
    }
}
