//! Keyword-driven answers for the chat endpoint.
//!
//! A question is reduced to an intent (year, metric, diseases, areas), the
//! cached rows are filtered by it, and the reply is a short structured
//! summary of what matched.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SurveillanceRecord;

const DISEASES: [&str; 6] = [
    "malaria",
    "dengue",
    "chikungunya",
    "fever",
    "diarrheal",
    "poisoning",
];
const AREAS: [&str; 5] = ["mumbai", "pune", "nagpur", "nashik", "aurangabad"];
const DEATH_WORDS: [&str; 3] = ["death", "fatalities", "mortality"];
const CASE_WORDS: [&str; 3] = ["case", "outbreak", "incident"];

pub const EMPTY_QUESTION: &str = "Please enter a question.";
pub const NO_MATCH: &str = "No matching data found.";

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(20\d{2})").expect("year pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Deaths,
    Cases,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub year: Option<i32>,
    pub metric: Metric,
    pub diseases: Vec<&'static str>,
    pub areas: Vec<&'static str>,
}

pub fn parse_intent(query: &str) -> Intent {
    let lower = query.to_lowercase();

    let year = YEAR_PATTERN
        .captures(query)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let metric = if DEATH_WORDS.iter().any(|w| lower.contains(w)) {
        Metric::Deaths
    } else if CASE_WORDS.iter().any(|w| lower.contains(w)) {
        Metric::Cases
    } else {
        Metric::Both
    };

    Intent {
        year,
        metric,
        diseases: DISEASES.into_iter().filter(|d| lower.contains(d)).collect(),
        areas: AREAS.into_iter().filter(|a| lower.contains(a)).collect(),
    }
}

pub fn filter_records<'a>(
    records: &'a [SurveillanceRecord],
    intent: &Intent,
) -> Vec<&'a SurveillanceRecord> {
    records
        .iter()
        .filter(|r| intent.year.map_or(true, |year| r.year == Some(year)))
        .filter(|r| {
            let disease = r.disease.to_lowercase();
            intent.diseases.is_empty() || intent.diseases.iter().any(|d| disease.contains(d))
        })
        .filter(|r| {
            let area = r.area.to_lowercase();
            intent.areas.is_empty() || intent.areas.iter().any(|a| area.contains(a))
        })
        .collect()
}

pub fn summarize(records: &[&SurveillanceRecord], intent: &Intent) -> Vec<String> {
    if records.is_empty() {
        return vec![NO_MATCH.to_string()];
    }

    let total_cases = records.iter().map(|r| r.cases).fold(0, u64::saturating_add);
    let total_deaths = records.iter().map(|r| r.deaths).fold(0, u64::saturating_add);
    let year_text = intent
        .year
        .map(|y| format!(" in {y}"))
        .unwrap_or_default();

    let mut lines = vec![match intent.metric {
        Metric::Deaths => format!("Total deaths{year_text}: {total_deaths}"),
        Metric::Cases => format!("Total cases{year_text}: {total_cases}"),
        Metric::Both => {
            format!("Summary{year_text}: {total_cases} cases and {total_deaths} deaths")
        }
    }];

    let mut by_disease: Vec<(&str, u64, u64)> = Vec::new();
    for record in records {
        match by_disease.iter_mut().find(|(d, _, _)| *d == record.disease) {
            Some(entry) => {
                entry.1 = entry.1.saturating_add(record.cases);
                entry.2 = entry.2.saturating_add(record.deaths);
            }
            None => by_disease.push((record.disease.as_str(), record.cases, record.deaths)),
        }
    }
    by_disease.sort_by(|a, b| b.1.cmp(&a.1));

    lines.extend(
        by_disease
            .into_iter()
            .take(5)
            .map(|(disease, cases, deaths)| format!("{disease}: {cases} cases, {deaths} deaths")),
    );
    lines
}

pub fn answer(records: &[SurveillanceRecord], message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return EMPTY_QUESTION.to_string();
    }

    let intent = parse_intent(message);
    let matched = filter_records(records, &intent);
    summarize(&matched, &intent).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, area: &str, disease: &str, cases: u64, deaths: u64) -> SurveillanceRecord {
        SurveillanceRecord {
            year: Some(year),
            week: Some(1),
            area: area.to_string(),
            disease: disease.to_string(),
            cases,
            deaths,
            unique_id: String::new(),
            state: "Maharashtra".to_string(),
            date_start: String::new(),
            date_reporting: String::new(),
        }
    }

    #[test]
    fn intent_picks_up_year_metric_and_keywords() {
        let intent = parse_intent("How many dengue deaths in Pune during 2023?");
        assert_eq!(intent.year, Some(2023));
        assert_eq!(intent.metric, Metric::Deaths);
        assert_eq!(intent.diseases, vec!["dengue"]);
        assert_eq!(intent.areas, vec!["pune"]);

        let vague = parse_intent("tell me everything");
        assert_eq!(vague.year, None);
        assert_eq!(vague.metric, Metric::Both);
    }

    #[test]
    fn answers_with_structured_summary() {
        let records = vec![
            record(2023, "Pune", "Dengue", 30, 1),
            record(2023, "Pune", "Malaria", 50, 2),
            record(2024, "Pune", "Dengue", 99, 9),
            record(2023, "Nagpur", "Dengue", 7, 0),
        ];

        let reply = answer(&records, "cases in pune 2023");
        assert_eq!(
            reply,
            "Total cases in 2023: 80\nMalaria: 50 cases, 2 deaths\nDengue: 30 cases, 1 deaths"
        );
    }

    #[test]
    fn huge_totals_saturate() {
        let huge = i64::MAX as u64;
        let records = vec![
            record(2024, "Pune", "Dengue", huge, huge),
            record(2024, "Pune", "Dengue", huge, huge),
            record(2024, "Pune", "Dengue", huge, huge),
        ];

        let reply = answer(&records, "dengue 2024");
        assert_eq!(
            reply,
            format!(
                "Summary in 2024: {max} cases and {max} deaths\nDengue: {max} cases, {max} deaths",
                max = u64::MAX
            )
        );
    }

    #[test]
    fn empty_and_unmatched_questions() {
        assert_eq!(answer(&[], "   "), EMPTY_QUESTION);
        assert_eq!(answer(&[], "malaria in 2019"), NO_MATCH);
    }
}
