//! Derived dashboard view: filters applied to a loaded [`Dataset`], plus
//! statistics and map styling for whatever survives.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::analyzers::aggregate::compute_statistics;
use crate::analyzers::types::SummaryStatistics;
use crate::color::{ColorScale, LegendEntry, Rgb, VisualizationMode, WeightRange};
use crate::filter::{Debouncer, FilterState, filter_by_date_range, filter_locations, filter_routes};
use crate::loader::Dataset;
use crate::models::{DelayEvent, GeometryMap, LocationRecord, RouteRecord};

/// How one route line is drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStyle {
    pub route_id: String,
    pub color: Rgb,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub routes: Vec<RouteRecord>,
    pub geometries: GeometryMap,
    pub locations: Vec<LocationRecord>,
    pub events: Vec<DelayEvent>,
    pub statistics: SummaryStatistics,
    pub scale: ColorScale,
}

impl DashboardView {
    /// Recomputes everything visible from the full dataset.
    ///
    /// Statistics are re-aggregated from the date-filtered events when any
    /// events were loaded; otherwise the loaded summary is shown as is.
    pub fn compute(
        dataset: &Dataset,
        filter: &FilterState,
        mode: VisualizationMode,
        weights: WeightRange,
    ) -> Self {
        let routes = filter_routes(&dataset.routes, filter.delay_threshold, &filter.search_query);
        let locations =
            filter_locations(&dataset.locations, filter.delay_threshold, &filter.search_query);
        let events = filter_by_date_range(&dataset.events, filter.start, filter.end);

        let geometries: GeometryMap = dataset
            .geometries
            .iter()
            .filter(|(id, _)| routes.iter().any(|r| &r.route_id == *id))
            .map(|(id, points)| (id.clone(), points.clone()))
            .collect();

        let statistics = if dataset.events.is_empty() {
            dataset.summary.clone()
        } else {
            compute_statistics(&events)
        };

        let scale = ColorScale::for_routes(&routes, mode, weights);

        debug!(
            routes = routes.len(),
            geometries = geometries.len(),
            locations = locations.len(),
            events = events.len(),
            "Dashboard view computed"
        );

        Self {
            routes,
            geometries,
            locations,
            events,
            statistics,
            scale,
        }
    }

    pub fn route_styles(&self) -> Vec<RouteStyle> {
        self.routes
            .iter()
            .map(|route| RouteStyle {
                route_id: route.route_id.clone(),
                color: self.scale.color(route),
                weight: self.scale.weight(route),
            })
            .collect()
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.scale.legend()
    }
}

/// Interactive session state: holds the dataset and current view, and
/// recomputes the view once filter changes settle.
#[derive(Debug)]
pub struct Dashboard {
    dataset: Dataset,
    filter: FilterState,
    mode: VisualizationMode,
    weights: WeightRange,
    debouncer: Debouncer,
    view: DashboardView,
}

impl Dashboard {
    pub fn new(dataset: Dataset, weights: WeightRange, debounce: Duration) -> Self {
        let filter = FilterState::default();
        let mode = VisualizationMode::default();
        let view = DashboardView::compute(&dataset, &filter, mode, weights);

        Self {
            dataset,
            filter,
            mode,
            weights,
            debouncer: Debouncer::new(debounce),
            view,
        }
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Records a new filter; the view is refreshed by a later [`poll`](Self::poll).
    pub fn set_filter(&mut self, filter: FilterState, now: Instant) {
        self.filter = filter;
        self.debouncer.trigger(now);
    }

    /// Switching modes restyles immediately.
    pub fn set_mode(&mut self, mode: VisualizationMode) {
        self.mode = mode;
        self.recompute();
    }

    /// Replaces the dataset after a reload and recomputes at once.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.recompute();
    }

    /// Recomputes if a pending filter change has settled. Returns whether
    /// the view changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debouncer.fire(now) {
            self.recompute();
            true
        } else {
            false
        }
    }

    fn recompute(&mut self) {
        self.view = DashboardView::compute(&self.dataset, &self.filter, self.mode, self.weights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DELAY_COLORS;
    use crate::fallback::{sample_geometries, sample_routes};
    use chrono::NaiveDate;

    fn event(day: u32, route: &str, delay: f64) -> DelayEvent {
        DelayEvent {
            date: NaiveDate::from_ymd_opt(2025, 3, day).and_then(|d| d.and_hms_opt(9, 0, 0)),
            route: Some(route.into()),
            vehicle: Some(format!("v{day}")),
            location: Some("Union Station".into()),
            time: Some("09:10".into()),
            delay_minutes: Some(delay),
        }
    }

    fn sample_dataset() -> Dataset {
        Dataset {
            routes: sample_routes(),
            geometries: sample_geometries(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unfiltered_view_keeps_everything() {
        let dataset = sample_dataset();
        let view = DashboardView::compute(
            &dataset,
            &FilterState::default(),
            VisualizationMode::Delay,
            WeightRange::default(),
        );

        assert_eq!(view.routes, dataset.routes);
        // Only geometries of surviving routes are drawn.
        assert_eq!(view.geometries.len(), 6);
        assert!(!view.geometries.contains_key("511"));
        assert_eq!(view.statistics, SummaryStatistics::fallback());
    }

    #[test]
    fn test_threshold_restricts_routes_and_geometries() {
        let filter = FilterState {
            delay_threshold: 10.0,
            ..Default::default()
        };
        let view = DashboardView::compute(
            &sample_dataset(),
            &filter,
            VisualizationMode::Delay,
            WeightRange::default(),
        );

        let ids: Vec<_> = view.routes.iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(ids, vec!["504", "506"]);
        assert_eq!(view.geometries.keys().collect::<Vec<_>>(), vec!["504", "506"]);
    }

    #[test]
    fn test_statistics_follow_date_filter() {
        let dataset = Dataset {
            events: vec![event(1, "501", 5.0), event(2, "504", 10.0), event(20, "504", 30.0)],
            ..sample_dataset()
        };
        let filter = FilterState {
            start: NaiveDate::from_ymd_opt(2025, 3, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            end: NaiveDate::from_ymd_opt(2025, 3, 2).and_then(|d| d.and_hms_opt(0, 0, 0)),
            ..Default::default()
        };

        let view = DashboardView::compute(
            &dataset,
            &filter,
            VisualizationMode::Delay,
            WeightRange::default(),
        );

        assert_eq!(view.events.len(), 2);
        assert_eq!(view.statistics.total_delays, 2);
        assert_eq!(view.statistics.avg_delay_minutes, 7.5);
    }

    #[test]
    fn test_route_styles_use_delay_palette() {
        let view = DashboardView::compute(
            &sample_dataset(),
            &FilterState::default(),
            VisualizationMode::Delay,
            WeightRange::default(),
        );
        let styles = view.route_styles();
        let harbourfront = styles.iter().find(|s| s.route_id == "509").unwrap();
        assert_eq!(harbourfront.color, DELAY_COLORS[0]);
        let carlton = styles.iter().find(|s| s.route_id == "506").unwrap();
        assert_eq!(carlton.color, DELAY_COLORS[3]);
        assert_eq!(view.legend().len(), 4);
    }

    #[test]
    fn test_filter_change_waits_for_debounce() {
        let t0 = Instant::now();
        let mut dashboard = Dashboard::new(
            sample_dataset(),
            WeightRange::default(),
            Duration::from_millis(300),
        );
        assert_eq!(dashboard.view().routes.len(), 6);

        dashboard.set_filter(
            FilterState {
                search_query: "king".into(),
                ..Default::default()
            },
            t0,
        );
        assert!(!dashboard.poll(t0 + Duration::from_millis(100)));
        assert_eq!(dashboard.view().routes.len(), 6);

        assert!(dashboard.poll(t0 + Duration::from_millis(300)));
        assert_eq!(dashboard.view().routes.len(), 1);
        assert_eq!(dashboard.filter().search_query, "king");
    }

    #[test]
    fn test_mode_switch_restyles_immediately() {
        let mut dashboard =
            Dashboard::new(sample_dataset(), WeightRange::default(), Duration::from_millis(300));
        dashboard.set_mode(VisualizationMode::Frequency);
        assert_eq!(dashboard.view().scale.mode, VisualizationMode::Frequency);
    }
}
