//! Per-route and per-location breakdowns of raw delay events, and rankings.

use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analyzers::types::RoutePerformanceRow;
use crate::analyzers::utility::{mean, round2};
use crate::models::{DelayEvent, LatLng, LocationRecord, RouteRecord};
use crate::normalize::values::sanitize_location_id;

/// Days assumed when no event carries a readable date.
const DEFAULT_PERIOD_DAYS: usize = 30;

/// Centre the placeholder location coordinates are spread around.
const CITY_CENTRE: LatLng = LatLng {
    lat: 43.65,
    lng: -79.38,
};

/// Seed for placeholder coordinates.
const PLACEHOLDER_SEED: u64 = 0x7cc_2025;

/// Peak windows reported for derived locations.
const DEFAULT_PEAK_HOURS: &[&str] = &["07:00-09:00", "16:00-18:00"];

#[derive(Default)]
struct Group<'a> {
    delays: Vec<f64>,
    routes: HashSet<&'a str>,
    vehicles: HashSet<&'a str>,
}

impl<'a> Group<'a> {
    fn add(&mut self, event: &'a DelayEvent, delay: f64) {
        self.delays.push(delay);
        if let Some(route) = event.route.as_deref() {
            self.routes.insert(route);
        }
        if let Some(vehicle) = event.vehicle.as_deref() {
            self.vehicles.insert(vehicle);
        }
    }
}

/// Groups events with a positive delay by route, in route id order.
pub fn route_performance(events: &[DelayEvent]) -> Vec<RoutePerformanceRow> {
    let mut groups: BTreeMap<&str, Group> = BTreeMap::new();
    for event in events {
        if let (Some(route), Some(delay)) = (event.route.as_deref(), event.positive_delay()) {
            groups.entry(route).or_default().add(event, delay);
        }
    }

    let days = match events
        .iter()
        .filter_map(|e| e.date.map(|d| d.date()))
        .collect::<HashSet<_>>()
        .len()
    {
        0 => DEFAULT_PERIOD_DAYS,
        n => n,
    };

    groups
        .into_iter()
        .map(|(route, group)| {
            let count = group.delays.len();
            RoutePerformanceRow {
                route: route.to_string(),
                delay_count: count as u64,
                avg_delay_min: round2(mean(&group.delays)),
                total_delay_min: round2(group.delays.iter().sum()),
                unique_vehicles: group.vehicles.len() as u64,
                delays_per_day: round2(count as f64 / days as f64),
                on_time_percentage: 0.0,
                route_long_name: format!("Route {route}"),
            }
        })
        .collect()
}

/// Groups events with a positive delay by location, busiest first.
///
/// Events without a location, or with the `Unknown` placeholder, are
/// skipped. Coordinates are placeholders drawn from a fixed-seed RNG in
/// location name order, so repeated runs give the same positions.
pub fn location_analysis(events: &[DelayEvent]) -> Vec<LocationRecord> {
    let mut groups: BTreeMap<&str, Group> = BTreeMap::new();
    for event in events {
        let Some(location) = event.location.as_deref() else {
            continue;
        };
        if location.is_empty() || location == "Unknown" {
            continue;
        }
        if let Some(delay) = event.positive_delay() {
            groups.entry(location).or_default().add(event, delay);
        }
    }

    let mut rng = StdRng::seed_from_u64(PLACEHOLDER_SEED);
    let mut locations: Vec<LocationRecord> = groups
        .into_iter()
        .map(|(name, group)| {
            let location_id = sanitize_location_id(name);
            LocationRecord {
                position: placeholder_position(&mut rng),
                location_name: name.to_string(),
                total_delays: group.delays.len() as u64,
                avg_delay_minutes: round2(mean(&group.delays)),
                route_count: group.routes.len() as u64,
                vehicle_count: Some(group.vehicles.len() as u64),
                peak_hours: DEFAULT_PEAK_HOURS.iter().map(|s| s.to_string()).collect(),
                location_id,
            }
        })
        .collect();

    locations.sort_by(|a, b| b.total_delays.cmp(&a.total_delays));
    locations
}

/// The `n` routes with the highest average delay, ties in input order.
pub fn rank_routes(routes: &[RouteRecord], n: usize) -> Vec<RouteRecord> {
    let mut ranked = routes.to_vec();
    ranked.sort_by(|a, b| b.avg_delay_minutes.total_cmp(&a.avg_delay_minutes));
    ranked.truncate(n);
    ranked
}

/// A point within ±0.05° of the city centre.
fn placeholder_position(rng: &mut StdRng) -> LatLng {
    let round6 = |v: f64| (v * 1e6).round() / 1e6;
    LatLng::new(
        round6(CITY_CENTRE.lat + rng.random_range(-0.05..=0.05)),
        round6(CITY_CENTRE.lng + rng.random_range(-0.05..=0.05)),
    )
}
