use std::collections::BTreeSet;

use crate::models::{SurveillanceRecord, UNKNOWN};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Region {
    #[default]
    All,
    Named(String),
}

impl Region {
    /// "all" is the sentinel the region picker uses for no filter.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Named(value.to_string())
        }
    }

    pub fn matches(&self, area: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == area,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum View {
    KeyIndicators,
    DiseaseTrends,
    RegionalRanking,
    Map,
}

impl View {
    pub const ALL: [View; 4] = [
        View::KeyIndicators,
        View::DiseaseTrends,
        View::RegionalRanking,
        View::Map,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorEvent {
    Region(Region),
    Year(i32),
    Week(i32),
    ChartYear(i32),
    RegionalYear(i32),
    HeatYear(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorState {
    pub region: Region,
    pub year: Option<i32>,
    pub week: Option<i32>,
    pub chart_year: Option<i32>,
    pub regional_year: Option<i32>,
    pub heat_year: Option<i32>,
}

impl SelectorState {
    /// Defaults derived from the loaded data: every year picker on the most
    /// recent year, the week picker on the earliest week. An empty record set
    /// leaves everything unset.
    pub fn initialize(records: &[SurveillanceRecord]) -> Self {
        let options = SelectorOptions::from_records(records);
        let latest = options.years.first().copied();

        Self {
            region: Region::All,
            year: latest,
            week: options.weeks.first().copied(),
            chart_year: latest,
            regional_year: latest,
            heat_year: latest,
        }
    }

    /// Applies one selection and reports the views that depend on it.
    pub fn apply(&mut self, event: SelectorEvent) -> &'static [View] {
        match event {
            SelectorEvent::Region(region) => self.set_region(region),
            SelectorEvent::Year(year) => self.set_year(year),
            SelectorEvent::Week(week) => self.set_week(week),
            SelectorEvent::ChartYear(year) => self.set_chart_year(year),
            SelectorEvent::RegionalYear(year) => self.set_regional_year(year),
            SelectorEvent::HeatYear(year) => self.set_heat_year(year),
        }
    }

    pub fn set_region(&mut self, region: Region) -> &'static [View] {
        self.region = region;
        &[View::KeyIndicators]
    }

    pub fn set_year(&mut self, year: i32) -> &'static [View] {
        self.year = Some(year);
        &[View::KeyIndicators]
    }

    pub fn set_week(&mut self, week: i32) -> &'static [View] {
        self.week = Some(week);
        &[View::KeyIndicators]
    }

    pub fn set_chart_year(&mut self, year: i32) -> &'static [View] {
        self.chart_year = Some(year);
        &[View::DiseaseTrends]
    }

    pub fn set_regional_year(&mut self, year: i32) -> &'static [View] {
        self.regional_year = Some(year);
        &[View::RegionalRanking]
    }

    pub fn set_heat_year(&mut self, year: i32) -> &'static [View] {
        self.heat_year = Some(year);
        &[View::Map]
    }
}

/// Values offered by the pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorOptions {
    /// Most recent first.
    pub years: Vec<i32>,
    /// Positive weeks, earliest first.
    pub weeks: Vec<i32>,
    /// Sorted, without the "Unknown" placeholder.
    pub areas: Vec<String>,
}

impl SelectorOptions {
    pub fn from_records(records: &[SurveillanceRecord]) -> Self {
        let years: BTreeSet<i32> = records.iter().filter_map(|r| r.year).collect();
        let weeks: BTreeSet<i32> = records
            .iter()
            .filter_map(|r| r.week)
            .filter(|w| *w > 0)
            .collect();
        let areas: BTreeSet<&str> = records
            .iter()
            .map(|r| r.area.as_str())
            .filter(|a| !a.is_empty() && *a != UNKNOWN)
            .collect();

        Self {
            years: years.into_iter().rev().collect(),
            weeks: weeks.into_iter().collect(),
            areas: areas.into_iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: Option<i32>, week: Option<i32>, area: &str) -> SurveillanceRecord {
        SurveillanceRecord {
            year,
            week,
            area: area.to_string(),
            disease: "Dengue".to_string(),
            cases: 1,
            deaths: 0,
            unique_id: String::new(),
            state: String::new(),
            date_start: String::new(),
            date_reporting: String::new(),
        }
    }

    #[test]
    fn initializes_from_latest_year_and_earliest_week() {
        let records = vec![
            record(Some(2022), Some(9), "Pune"),
            record(Some(2024), Some(3), "Nagpur"),
            record(None, Some(0), "Unknown"),
            record(Some(2023), Some(1), "Pune"),
        ];
        let state = SelectorState::initialize(&records);
        assert_eq!(state.region, Region::All);
        assert_eq!(state.year, Some(2024));
        assert_eq!(state.chart_year, Some(2024));
        assert_eq!(state.regional_year, Some(2024));
        assert_eq!(state.heat_year, Some(2024));
        assert_eq!(state.week, Some(1));
    }

    #[test]
    fn empty_records_leave_selectors_unset() {
        let state = SelectorState::initialize(&[]);
        assert_eq!(state, SelectorState::default());
    }

    #[test]
    fn each_selector_recomputes_only_its_views() {
        let mut state = SelectorState::default();
        assert_eq!(
            state.apply(SelectorEvent::Region(Region::parse("Pune"))),
            &[View::KeyIndicators]
        );
        assert_eq!(state.apply(SelectorEvent::Week(4)), &[View::KeyIndicators]);
        assert_eq!(state.apply(SelectorEvent::Year(2023)), &[View::KeyIndicators]);
        assert_eq!(
            state.apply(SelectorEvent::ChartYear(2023)),
            &[View::DiseaseTrends]
        );
        assert_eq!(
            state.apply(SelectorEvent::RegionalYear(2022)),
            &[View::RegionalRanking]
        );
        assert_eq!(state.apply(SelectorEvent::HeatYear(2021)), &[View::Map]);
        assert_eq!(state.region, Region::Named("Pune".to_string()));
        assert_eq!(state.heat_year, Some(2021));
    }

    #[test]
    fn options_are_sorted_and_skip_placeholders() {
        let records = vec![
            record(Some(2022), Some(9), "Pune"),
            record(Some(2024), Some(-1), "Unknown"),
            record(Some(2022), Some(2), "Akola"),
        ];
        let options = SelectorOptions::from_records(&records);
        assert_eq!(options.years, vec![2024, 2022]);
        assert_eq!(options.weeks, vec![2, 9]);
        assert_eq!(options.areas, vec!["Akola", "Pune"]);
    }

    #[test]
    fn region_sentinel_parses_to_all() {
        assert_eq!(Region::parse("all"), Region::All);
        assert!(Region::All.matches("Anywhere"));
        assert!(!Region::parse("Pune").matches("Nagpur"));
    }
}
