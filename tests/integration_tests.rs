use std::env;
use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use transit_delay_dash::analyzers::aggregate::compute_statistics;
use transit_delay_dash::analyzers::performance::{location_analysis, route_performance};
use transit_delay_dash::analyzers::types::SummaryStatistics;
use transit_delay_dash::cache::ResultCache;
use transit_delay_dash::color::{DELAY_COLORS, VisualizationMode, WeightRange};
use transit_delay_dash::dashboard::DashboardView;
use transit_delay_dash::fallback::sample_geometries;
use transit_delay_dash::fetch::BasicClient;
use transit_delay_dash::filter::FilterState;
use transit_delay_dash::loader::{
    DELAY_EVENTS, DataLoader, LOCATION_ANALYSIS, ROUTE_GEOMETRIES, ROUTE_PERFORMANCE,
    SUMMARY_STATISTICS,
};
use transit_delay_dash::normalize::delay_events;
use transit_delay_dash::output::{
    should_refresh, write_geometries_json, write_location_analysis_csv,
    write_route_performance_csv, write_summary_json,
};
use transit_delay_dash::parser::parse_json;

const ROUTES_CSV: &str = include_str!("fixtures/route_performance.csv");
const LOCATIONS_CSV: &str = include_str!("fixtures/location_analysis.csv");
const DELAY_JSON: &str = include_str!("fixtures/delay_data.json");

fn data_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("transit_delay_dash_it_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn day(d: u32) -> Option<chrono::NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 3, d).and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = data_dir("pipeline");
    fs::write(dir.join(ROUTE_PERFORMANCE), ROUTES_CSV).unwrap();
    fs::write(dir.join(LOCATION_ANALYSIS), LOCATIONS_CSV).unwrap();
    fs::write(dir.join(DELAY_EVENTS), DELAY_JSON).unwrap();

    let cache = ResultCache::new();
    let loader = DataLoader::new(BasicClient::new(), dir.display().to_string(), &cache);
    let dataset = loader.load_all().await;

    // Five rows, one without Avg_Delay_Min.
    assert_eq!(dataset.routes.len(), 4);
    assert!(dataset.routes.iter().all(|r| r.route_id != "504"));
    assert_eq!(dataset.geometries, sample_geometries());
    assert_eq!(dataset.locations.len(), 1);
    assert_eq!(dataset.locations[0].peak_hours, vec!["07:00-09:00", "16:00-18:00"]);
    assert_eq!(dataset.summary, SummaryStatistics::fallback());
    assert_eq!(dataset.events.len(), 5);

    let view = DashboardView::compute(
        &dataset,
        &FilterState::default(),
        VisualizationMode::Delay,
        WeightRange::default(),
    );
    assert_eq!(view.routes, dataset.routes);
    assert_eq!(view.geometries.len(), 4);

    let stats = &view.statistics;
    assert_eq!(stats.total_delays, 5);
    assert_eq!(stats.valid_delays, 4);
    assert_eq!(stats.avg_delay_minutes, 12.0);
    assert_eq!(stats.total_routes, 4);
    assert_eq!(stats.coverage_percentage, 3.0);
    assert_eq!(stats.peak_delay_hour, "08:00");
    assert_eq!(stats.most_delayed_route, "506 - Route 506");
    assert_eq!(stats.time_period, "2025-03-01 to 2025-03-15");

    let styles = view.route_styles();
    let lowest = styles.iter().find(|s| s.route_id == "509").unwrap();
    let highest = styles.iter().find(|s| s.route_id == "506").unwrap();
    assert_eq!(lowest.color, DELAY_COLORS[0]);
    assert_eq!(highest.color, DELAY_COLORS[3]);

    fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_date_filter_keeps_undated_events() {
    let dir = data_dir("date_filter");
    fs::write(dir.join(DELAY_EVENTS), DELAY_JSON).unwrap();

    let cache = ResultCache::new();
    let loader = DataLoader::new(BasicClient::new(), dir.display().to_string(), &cache);
    let dataset = loader.load_all().await;

    let filter = FilterState {
        start: day(1),
        end: day(2),
        ..Default::default()
    };
    let view = DashboardView::compute(
        &dataset,
        &filter,
        VisualizationMode::Delay,
        WeightRange::default(),
    );

    // Three events in range plus the one without a date.
    assert_eq!(view.events.len(), 4);
    assert_eq!(view.statistics.total_delays, 4);
    assert_eq!(view.statistics.avg_delay_minutes, 9.33);

    fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_derived_files_load_back() {
    let dir = data_dir("derived");
    let events = delay_events(&parse_json(DELAY_JSON).unwrap()).unwrap();
    let now = Utc::now();

    write_route_performance_csv(&dir.join(ROUTE_PERFORMANCE), &route_performance(&events)).unwrap();
    write_location_analysis_csv(&dir.join(LOCATION_ANALYSIS), &location_analysis(&events)).unwrap();
    write_geometries_json(&dir.join(ROUTE_GEOMETRIES), &sample_geometries()).unwrap();
    write_summary_json(
        &dir.join(SUMMARY_STATISTICS),
        &compute_statistics(&events).with_updated_at(now),
    )
    .unwrap();
    assert!(!should_refresh(&dir.join(SUMMARY_STATISTICS), now));

    let cache = ResultCache::new();
    let loader = DataLoader::new(BasicClient::new(), dir.display().to_string(), &cache);
    let dataset = loader.load_all().await;

    let ids: Vec<_> = dataset.routes.iter().map(|r| r.route_id.as_str()).collect();
    assert_eq!(ids, vec!["501", "504", "506"]);
    assert_eq!(dataset.routes[0].avg_delay_minutes, 8.0);
    assert_eq!(dataset.routes[0].delay_count, 2);

    let names: Vec<_> = dataset.locations.iter().map(|l| l.location_name.as_str()).collect();
    assert_eq!(names, vec!["Union Station", "King and Spadina"]);

    assert_eq!(dataset.geometries, sample_geometries());
    assert_eq!(dataset.summary.total_delays, 5);
    assert_eq!(dataset.summary.most_delayed_route, "506 - Route 506");
    assert!(dataset.summary.updated_at.is_some());

    fs::remove_dir_all(&dir).unwrap();
}
