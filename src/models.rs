//! Canonical records produced by the normalizer.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One transit route with its delay metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,
    pub display_name: String,
    pub avg_delay_minutes: f64,
    pub delay_count: u64,
    pub total_delay_minutes: Option<f64>,
    pub on_time_percentage: Option<f64>,
    pub delay_frequency: Option<f64>,
}

/// A validated `(latitude, longitude)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Route id to its ordered polyline. Routes never map to an empty list.
pub type GeometryMap = BTreeMap<String, Vec<LatLng>>;

/// One monitored location with its delay stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location_id: String,
    pub location_name: String,
    pub position: LatLng,
    pub total_delays: u64,
    pub avg_delay_minutes: f64,
    pub route_count: u64,
    pub vehicle_count: Option<u64>,
    pub peak_hours: Vec<String>,
}

/// A single reported delay incident, before aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayEvent {
    pub date: Option<NaiveDateTime>,
    pub route: Option<String>,
    pub vehicle: Option<String>,
    pub location: Option<String>,
    pub time: Option<String>,
    pub delay_minutes: Option<f64>,
}

impl DelayEvent {
    /// The delay magnitude if it is strictly positive.
    pub fn positive_delay(&self) -> Option<f64> {
        self.delay_minutes.filter(|d| *d > 0.0)
    }
}

/// Anything with an optional timestamp that the date-range filter can test.
pub trait Dated {
    fn date(&self) -> Option<NaiveDateTime>;
}

impl Dated for DelayEvent {
    fn date(&self) -> Option<NaiveDateTime> {
        self.date
    }
}
