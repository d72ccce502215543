//! Persistence for derived dashboard resources.
//!
//! Every writer produces exactly the layout the loader reads back.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{LocationAnalysisRow, RoutePerformanceRow, SummaryStatistics};
use crate::models::{GeometryMap, LocationRecord};
use crate::normalize::normalize_summary;
use crate::parser::parse_json;

/// Age after which derived files are rebuilt.
pub fn refresh_interval() -> Duration {
    Duration::hours(1)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

/// Writes route performance rows with the `Route,Delay_Count,...` header.
pub fn write_route_performance_csv(path: &Path, rows: &[RoutePerformanceRow]) -> Result<()> {
    write_csv(path, rows)?;
    info!(path = %path.display(), routes = rows.len(), "Saved route performance");
    Ok(())
}

/// Writes locations; `peak_hours` is stored as a JSON array in one cell.
pub fn write_location_analysis_csv(path: &Path, locations: &[LocationRecord]) -> Result<()> {
    let rows: Vec<LocationAnalysisRow> = locations.iter().map(LocationAnalysisRow::from).collect();
    write_csv(path, &rows)?;
    info!(path = %path.display(), locations = rows.len(), "Saved location analysis");
    Ok(())
}

/// Writes geometries as `{ route_id: [[lat, lng], ...] }`.
pub fn write_geometries_json(path: &Path, geometries: &GeometryMap) -> Result<()> {
    let pairs: BTreeMap<&str, Vec<[f64; 2]>> = geometries
        .iter()
        .map(|(route, points)| (route.as_str(), points.iter().map(|p| [p.lat, p.lng]).collect()))
        .collect();
    write_json(path, &pairs)?;
    info!(path = %path.display(), routes = pairs.len(), "Saved route geometries");
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &SummaryStatistics) -> Result<()> {
    write_json(path, summary)?;
    info!(path = %path.display(), "Saved summary statistics");
    Ok(())
}

/// True when the summary at `path` is missing, unreadable, carries no
/// `updated_at`, or was updated more than an hour before `now`.
pub fn should_refresh(path: &Path, now: DateTime<Utc>) -> bool {
    let Ok(text) = std::fs::read_to_string(path) else {
        return true;
    };

    let updated_at = parse_json(&text)
        .and_then(|value| normalize_summary(&value))
        .ok()
        .and_then(|summary| summary.updated_at);

    match updated_at {
        Some(at) => at < now - refresh_interval(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_location_analysis, parse_route_geometries, parse_route_performance};
    use crate::models::LatLng;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn row(route: &str, avg: f64) -> RoutePerformanceRow {
        RoutePerformanceRow {
            route: route.into(),
            delay_count: 3,
            avg_delay_min: avg,
            total_delay_min: avg * 3.0,
            unique_vehicles: 2,
            delays_per_day: 1.5,
            on_time_percentage: 0.0,
            route_long_name: format!("Route {route}"),
        }
    }

    #[test]
    fn test_route_performance_csv_reads_back() {
        let path = temp_path("transit_delay_dash_test_routes.csv");
        write_route_performance_csv(&path, &[row("501", 8.5), row("504", 12.0)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Route,Delay_Count,Avg_Delay_Min"));

        let routes = parse_route_performance(&content).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].display_name, "Route 504");
        assert_eq!(routes[0].delay_frequency, Some(1.5));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_location_csv_keeps_quoted_peak_hours() {
        let path = temp_path("transit_delay_dash_test_locations.csv");
        let location = LocationRecord {
            location_id: "union_station".into(),
            location_name: "Union Station".into(),
            position: LatLng::new(43.645, -79.38),
            total_delays: 7,
            avg_delay_minutes: 5.5,
            route_count: 3,
            vehicle_count: Some(4),
            peak_hours: vec!["07:00-09:00".into(), "16:00-18:00".into()],
        };
        write_location_analysis_csv(&path, &[location.clone()]).unwrap();

        let locations = parse_location_analysis(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(locations, vec![location]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_geometries_json_reads_back() {
        let path = temp_path("transit_delay_dash_test_geometries.json");
        let geometries = GeometryMap::from([(
            "501".to_string(),
            vec![LatLng::new(43.64, -79.41), LatLng::new(43.65, -79.40)],
        )]);
        write_geometries_json(&path, &geometries).unwrap();

        let read = parse_route_geometries(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, geometries);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_should_refresh_missing_file() {
        let path = temp_path("transit_delay_dash_test_missing_summary.json");
        let _ = fs::remove_file(&path);
        assert!(should_refresh(&path, Utc::now()));
    }

    #[test]
    fn test_should_refresh_by_age() {
        let path = temp_path("transit_delay_dash_test_summary_age.json");
        let now = Utc::now();
        let summary = SummaryStatistics::fallback().with_updated_at(now - Duration::minutes(30));
        write_summary_json(&path, &summary).unwrap();

        assert!(!should_refresh(&path, now));
        assert!(should_refresh(&path, now + Duration::minutes(31)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_should_refresh_without_timestamp() {
        let path = temp_path("transit_delay_dash_test_summary_no_ts.json");
        write_summary_json(&path, &SummaryStatistics::fallback()).unwrap();
        assert!(should_refresh(&path, Utc::now()));
        fs::remove_file(&path).unwrap();
    }
}
