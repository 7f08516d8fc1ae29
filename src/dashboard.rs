//! Surveillance dashboard controller.
//!
//! Owns the record set, the selector state and whatever surface the views are
//! drawn on. A selection event recomputes only the views that depend on the
//! selector it touched. Every slot is disposed before it is drawn again.
//!
//! Map data is fetched per heat-map year. Each fetch carries a sequence
//! ticket and only the response to the most recently issued ticket is drawn,
//! so a slow response for an older year can never overwrite a newer one.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::aggregate;
use crate::api::DataApi;
use crate::error::Result;
use crate::models::SurveillanceRecord;
use crate::normalize::normalize_rows;
use crate::render::{self, ChartConfig, IndicatorPanel, MapLayer};
use crate::selector::{SelectorEvent, SelectorOptions, SelectorState, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Indicators,
    TrendChart,
    RegionalChart,
    MapLayer,
}

/// Where rendered views end up.
pub trait Surface {
    /// Releases whatever currently occupies the slot.
    fn dispose(&mut self, slot: Slot);
    fn show_indicators(&mut self, panel: &IndicatorPanel);
    fn draw_chart(&mut self, slot: Slot, chart: &ChartConfig);
    fn draw_map(&mut self, layer: &MapLayer);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTicket {
    seq: u64,
    pub year: i32,
}

pub struct SurveillanceDashboard<A, S> {
    api: A,
    surface: S,
    records: Vec<SurveillanceRecord>,
    selectors: SelectorState,
    options: SelectorOptions,
    drawn: HashSet<Slot>,
    map_seq: u64,
}

impl<A: DataApi, S: Surface> SurveillanceDashboard<A, S> {
    pub fn new(api: A, surface: S) -> Self {
        Self {
            api,
            surface,
            records: Vec::new(),
            selectors: SelectorState::default(),
            options: SelectorOptions::default(),
            drawn: HashSet::new(),
            map_seq: 0,
        }
    }

    pub fn records(&self) -> &[SurveillanceRecord] {
        &self.records
    }

    pub fn selectors(&self) -> &SelectorState {
        &self.selectors
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Fetches the record set, resets the selectors to their data-derived
    /// defaults and draws every view. Safe to call again to reload.
    pub async fn load(&mut self) -> Result<usize> {
        let rows = self.api.fetch_rows().await.map_err(|e| {
            error!("Failed to load surveillance data: {e}");
            e
        })?;

        self.records = normalize_rows(&rows);
        self.options = SelectorOptions::from_records(&self.records);
        self.selectors = SelectorState::initialize(&self.records);
        info!(
            records = self.records.len(),
            years = ?self.options.years,
            "Surveillance data loaded"
        );

        if self.records.is_empty() {
            self.clear();
            return Ok(0);
        }

        for view in View::ALL {
            self.refresh(view).await;
        }

        Ok(self.records.len())
    }

    pub async fn select(&mut self, event: SelectorEvent) {
        if self.records.is_empty() {
            debug!(?event, "No data loaded, ignoring selection");
            return;
        }

        info!(?event, "Selection changed");
        let views = self.selectors.apply(event);
        for view in views {
            self.refresh(*view).await;
        }
    }

    pub async fn refresh(&mut self, view: View) {
        match view {
            View::KeyIndicators => self.refresh_indicators(),
            View::DiseaseTrends => self.refresh_trends(),
            View::RegionalRanking => self.refresh_regional(),
            View::Map => self.refresh_map().await,
        }
    }

    fn refresh_indicators(&mut self) {
        let Some(year) = self.selectors.year else {
            return;
        };

        let indicators = aggregate::key_indicators(
            &self.records,
            year,
            self.selectors.week,
            &self.selectors.region,
        );
        debug!(
            year,
            cases = indicators.total_cases,
            deaths = indicators.total_deaths,
            "Key indicators computed"
        );

        let panel = IndicatorPanel::from(&indicators);
        self.redraw(Slot::Indicators, |surface| surface.show_indicators(&panel));
    }

    fn refresh_trends(&mut self) {
        let Some(year) = self.selectors.chart_year else {
            return;
        };

        let chart = render::trend_chart(&aggregate::disease_trends(&self.records, year));
        self.redraw(Slot::TrendChart, |surface| {
            surface.draw_chart(Slot::TrendChart, &chart)
        });
    }

    fn refresh_regional(&mut self) {
        let Some(year) = self.selectors.regional_year else {
            return;
        };

        let chart = render::regional_chart(&aggregate::regional_ranking(&self.records, year));
        self.redraw(Slot::RegionalChart, |surface| {
            surface.draw_chart(Slot::RegionalChart, &chart)
        });
    }

    async fn refresh_map(&mut self) {
        let Some(ticket) = self.issue_map_ticket() else {
            return;
        };

        let response = self.api.fetch_map(ticket.year).await;
        self.apply_map(ticket, response);
    }

    /// Starts a map fetch for the current heat-map year. Any ticket issued
    /// earlier becomes stale.
    pub fn issue_map_ticket(&mut self) -> Option<MapTicket> {
        let year = self.selectors.heat_year?;
        self.map_seq += 1;
        Some(MapTicket {
            seq: self.map_seq,
            year,
        })
    }

    /// Draws a map response if its ticket is still current. Returns whether
    /// the layer was replaced.
    pub fn apply_map(&mut self, ticket: MapTicket, response: Result<Value>) -> bool {
        if ticket.seq != self.map_seq {
            debug!(year = ticket.year, "Discarding stale map response");
            return false;
        }

        let collection = match response {
            Ok(collection) => collection,
            Err(e) => {
                warn!(year = ticket.year, "Map data error: {e}");
                return false;
            }
        };

        let summary = aggregate::map_summary(ticket.year, &collection);
        debug!(year = ticket.year, max_cases = summary.max_cases, "Map summary computed");

        let layer = render::map_layer(&summary);
        self.redraw(Slot::MapLayer, |surface| surface.draw_map(&layer));
        true
    }

    /// Empties every drawn slot and invalidates outstanding map tickets.
    fn clear(&mut self) {
        for slot in self.drawn.drain() {
            self.surface.dispose(slot);
        }
        self.map_seq += 1;
    }

    fn redraw(&mut self, slot: Slot, draw: impl FnOnce(&mut S)) {
        if self.drawn.contains(&slot) {
            self.surface.dispose(slot);
        }
        draw(&mut self.surface);
        self.drawn.insert(slot);
    }
}

/// Keeps the latest content of every slot in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotSurface {
    pub indicators: Option<IndicatorPanel>,
    pub trend_chart: Option<ChartConfig>,
    pub regional_chart: Option<ChartConfig>,
    pub map: Option<MapLayer>,
}

impl Surface for SnapshotSurface {
    fn dispose(&mut self, slot: Slot) {
        match slot {
            Slot::Indicators => self.indicators = None,
            Slot::TrendChart => self.trend_chart = None,
            Slot::RegionalChart => self.regional_chart = None,
            Slot::MapLayer => self.map = None,
        }
    }

    fn show_indicators(&mut self, panel: &IndicatorPanel) {
        self.indicators = Some(panel.clone());
    }

    fn draw_chart(&mut self, slot: Slot, chart: &ChartConfig) {
        match slot {
            Slot::TrendChart => self.trend_chart = Some(chart.clone()),
            Slot::RegionalChart => self.regional_chart = Some(chart.clone()),
            other => warn!(?other, "Not a chart slot"),
        }
    }

    fn draw_map(&mut self, layer: &MapLayer) {
        self.map = Some(layer.clone());
    }
}
