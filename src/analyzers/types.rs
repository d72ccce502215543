//! Data types used by the aggregation pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LocationRecord, RouteRecord};

/// Oldest and most recent parsed event dates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub oldest: NaiveDateTime,
    pub most_recent: NaiveDateTime,
}

/// Share of usable rows and breadth of coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub valid_delay_percentage: f64,
    pub route_coverage: u64,
    pub location_coverage: u64,
}

/// Snapshot of derived delay metrics. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_delays: u64,
    pub valid_delays: u64,
    pub avg_delay_minutes: f64,
    pub total_routes: u64,
    pub unique_vehicles: u64,
    pub unique_locations: u64,
    pub data_points: u64,
    pub coverage_percentage: f64,
    pub date_range: Option<DateRange>,
    pub peak_delay_hour: String,
    pub most_delayed_route: String,
    pub time_period: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub data_quality: DataQuality,
}

impl SummaryStatistics {
    /// The fixed snapshot served when there is nothing to aggregate.
    pub fn fallback() -> Self {
        SummaryStatistics {
            total_delays: 12478,
            valid_delays: 11856,
            avg_delay_minutes: 8.7,
            total_routes: 156,
            unique_vehicles: 1423,
            unique_locations: 892,
            data_points: 12478,
            coverage_percentage: 87.5,
            date_range: None,
            peak_delay_hour: "08:00".to_string(),
            most_delayed_route: "Unknown".to_string(),
            time_period: "Sample Data".to_string(),
            updated_at: None,
            data_quality: DataQuality {
                valid_delay_percentage: 95.02,
                route_coverage: 156,
                location_coverage: 892,
            },
        }
    }

    /// Stamp the snapshot with its generation time.
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }
}

impl Default for SummaryStatistics {
    fn default() -> Self {
        Self::fallback()
    }
}

/// A derived per-route row, written in the route performance CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePerformanceRow {
    #[serde(rename = "Route")]
    pub route: String,
    #[serde(rename = "Delay_Count")]
    pub delay_count: u64,
    #[serde(rename = "Avg_Delay_Min")]
    pub avg_delay_min: f64,
    #[serde(rename = "Total_Delay_Min")]
    pub total_delay_min: f64,
    #[serde(rename = "Unique_Vehicles")]
    pub unique_vehicles: u64,
    #[serde(rename = "Delays_Per_Day")]
    pub delays_per_day: f64,
    #[serde(rename = "On_Time_Percentage")]
    pub on_time_percentage: f64,
    pub route_long_name: String,
}

impl From<&RoutePerformanceRow> for RouteRecord {
    fn from(row: &RoutePerformanceRow) -> Self {
        RouteRecord {
            route_id: row.route.clone(),
            display_name: row.route_long_name.clone(),
            avg_delay_minutes: row.avg_delay_min,
            delay_count: row.delay_count,
            total_delay_minutes: Some(row.total_delay_min),
            on_time_percentage: Some(row.on_time_percentage),
            delay_frequency: Some(row.delays_per_day),
        }
    }
}

/// A location row in the location analysis CSV layout. `peak_hours` holds a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAnalysisRow {
    pub location_id: String,
    pub location_name: String,
    pub total_delays: u64,
    pub avg_delay_min: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub route_count: u64,
    pub vehicle_count: u64,
    pub peak_hours: String,
}

impl From<&LocationRecord> for LocationAnalysisRow {
    fn from(location: &LocationRecord) -> Self {
        LocationAnalysisRow {
            location_id: location.location_id.clone(),
            location_name: location.location_name.clone(),
            total_delays: location.total_delays,
            avg_delay_min: location.avg_delay_minutes,
            latitude: location.position.lat,
            longitude: location.position.lng,
            route_count: location.route_count,
            vehicle_count: location.vehicle_count.unwrap_or(0),
            peak_hours: serde_json::to_string(&location.peak_hours)
                .unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LatLng;

    #[test]
    fn test_fallback_snapshot_constants() {
        let stats = SummaryStatistics::fallback();
        assert_eq!(stats.total_delays, 12478);
        assert_eq!(stats.avg_delay_minutes, 8.7);
        assert_eq!(stats.total_routes, 156);
        assert_eq!(stats.coverage_percentage, 87.5);
        assert_eq!(stats.peak_delay_hour, "08:00");
        assert_eq!(SummaryStatistics::default(), stats);
    }

    #[test]
    fn test_location_row_encodes_peak_hours() {
        let location = LocationRecord {
            location_id: "union".into(),
            location_name: "Union".into(),
            position: LatLng::new(43.645, -79.38),
            total_delays: 4,
            avg_delay_minutes: 6.5,
            route_count: 2,
            vehicle_count: None,
            peak_hours: vec!["07:00-09:00".into()],
        };
        let row = LocationAnalysisRow::from(&location);
        assert_eq!(row.peak_hours, r#"["07:00-09:00"]"#);
        assert_eq!(row.vehicle_count, 0);
    }
}
