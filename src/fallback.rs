//! Synthetic datasets served when a resource cannot be loaded.

use crate::models::{GeometryMap, LatLng, RouteRecord};

/// Downtown Toronto, where the sample data is placed.
pub const SAMPLE_CENTRE: LatLng = LatLng {
    lat: 43.6532,
    lng: -79.3832,
};

const SAMPLE_ROUTES: &[(&str, &str, f64, u64, f64)] = &[
    ("501", "Queen", 8.5, 245, 82.4),
    ("504", "King", 12.3, 312, 74.1),
    ("505", "Dundas", 6.7, 178, 86.9),
    ("506", "Carlton", 15.2, 402, 68.5),
    ("509", "Harbourfront", 4.3, 96, 91.2),
    ("510", "Spadina", 9.8, 267, 79.8),
];

/// Sweep of each sample arc in radians. Slightly short of a half turn so
/// the generated coordinates match previously published sample files.
#[allow(clippy::approx_constant)]
const SAMPLE_ARC: f64 = 3.14;

const SAMPLE_GEOMETRY_ROUTES: &[&str] = &["501", "504", "505", "506", "509", "510", "511", "512"];

/// Six representative routes.
pub fn sample_routes() -> Vec<RouteRecord> {
    SAMPLE_ROUTES
        .iter()
        .map(|&(id, name, avg, count, on_time)| RouteRecord {
            route_id: id.to_string(),
            display_name: format!("{id} {name}"),
            avg_delay_minutes: avg,
            delay_count: count,
            total_delay_minutes: Some(((avg * count as f64) * 10.0).round() / 10.0),
            on_time_percentage: Some(on_time),
            delay_frequency: Some(((count as f64 / 30.0) * 100.0).round() / 100.0),
        })
        .collect()
}

/// Eight half-circle polylines fanned out from [`SAMPLE_CENTRE`]; route
/// `i` has `8 + i` points.
pub fn sample_geometries() -> GeometryMap {
    let round6 = |v: f64| (v * 1e6).round() / 1e6;

    SAMPLE_GEOMETRY_ROUTES
        .iter()
        .enumerate()
        .map(|(i, route)| {
            let offset = 0.01 * i as f64;
            let point_count = 8 + i;
            let points = (0..point_count)
                .map(|j| {
                    let angle = (j as f64 / point_count as f64) * SAMPLE_ARC;
                    LatLng::new(
                        round6(SAMPLE_CENTRE.lat + offset + 0.005 * angle.cos()),
                        round6(SAMPLE_CENTRE.lng + offset + 0.005 * angle.sin()),
                    )
                })
                .collect();
            (route.to_string(), points)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::is_valid_coordinate;

    #[test]
    fn test_sample_routes_delays() {
        let delays: Vec<f64> = sample_routes().iter().map(|r| r.avg_delay_minutes).collect();
        assert_eq!(delays, vec![8.5, 12.3, 6.7, 15.2, 4.3, 9.8]);
    }

    #[test]
    fn test_sample_geometries_shape() {
        let geometries = sample_geometries();
        assert_eq!(geometries.len(), 8);
        assert_eq!(geometries["501"].len(), 8);
        assert_eq!(geometries["512"].len(), 15);
        assert!(
            geometries
                .values()
                .flatten()
                .all(|p| is_valid_coordinate(p.lat, p.lng))
        );
    }

    #[test]
    fn test_sample_arc_endpoints() {
        let round6 = |v: f64| (v * 1e6).round() / 1e6;
        let last = *sample_geometries()["512"].last().unwrap();
        let offset = 0.01 * 7.0;

        let arc = (14.0 / 15.0) * SAMPLE_ARC;
        let half_turn = (14.0 / 15.0) * std::f64::consts::PI;
        assert_eq!(last.lng, round6(SAMPLE_CENTRE.lng + offset + 0.005 * arc.sin()));
        assert_ne!(last.lng, round6(SAMPLE_CENTRE.lng + offset + 0.005 * half_turn.sin()));

        let first = sample_geometries()["501"][0];
        assert_eq!(first, LatLng::new(round6(SAMPLE_CENTRE.lat + 0.005), SAMPLE_CENTRE.lng));
    }
}
