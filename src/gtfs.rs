//! Route polylines from static GTFS `shapes.txt` and `trips.txt`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::fallback::sample_geometries;
use crate::models::{GeometryMap, LatLng};
use crate::normalize::is_valid_coordinate;

#[derive(Debug, Deserialize)]
struct ShapePoint {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct Trip {
    route_id: String,
    #[serde(default)]
    shape_id: Option<String>,
}

fn read_rows<T: DeserializeOwned>(text: &str, file: &str) -> Vec<T> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                debug!(file, error = %e, "Skipping unreadable GTFS row");
            }
        }
    }
    if skipped > 0 {
        debug!(file, skipped, "GTFS rows skipped");
    }
    rows
}

/// Builds a [`GeometryMap`] from the text of `shapes.txt` and `trips.txt`.
///
/// Each route takes the shape of the last trip that references one. Points
/// are ordered by `shape_pt_sequence`; invalid coordinates are dropped and
/// routes left without points are omitted.
pub fn geometry_from_gtfs(shapes_text: &str, trips_text: &str) -> GeometryMap {
    let mut shapes: HashMap<String, Vec<ShapePoint>> = HashMap::new();
    for point in read_rows::<ShapePoint>(shapes_text, "shapes.txt") {
        shapes.entry(point.shape_id.clone()).or_default().push(point);
    }
    for points in shapes.values_mut() {
        points.sort_by_key(|p| p.shape_pt_sequence);
    }

    let mut route_shape: HashMap<String, String> = HashMap::new();
    for trip in read_rows::<Trip>(trips_text, "trips.txt") {
        if let Some(shape_id) = trip.shape_id.filter(|s| !s.is_empty()) {
            if !trip.route_id.is_empty() {
                route_shape.insert(trip.route_id, shape_id);
            }
        }
    }

    let geometries: GeometryMap = route_shape
        .into_iter()
        .filter_map(|(route_id, shape_id)| {
            let points: Vec<LatLng> = shapes
                .get(&shape_id)?
                .iter()
                .filter(|p| is_valid_coordinate(p.shape_pt_lat, p.shape_pt_lon))
                .map(|p| LatLng::new(p.shape_pt_lat, p.shape_pt_lon))
                .collect();
            (!points.is_empty()).then_some((route_id, points))
        })
        .collect();

    info!(
        shapes = shapes.len(),
        routes = geometries.len(),
        "Route geometries derived from GTFS"
    );
    geometries
}

/// Geometries for the `derive` output: read from a GTFS directory when one
/// is given, otherwise or on any failure the sample geometries.
///
/// Missing or unreadable feed files are logged, not returned as errors.
pub fn geometries_or_sample(gtfs_dir: Option<&Path>) -> GeometryMap {
    let derived = match gtfs_dir {
        Some(dir) => read_feed(dir)
            .map(|(shapes, trips)| geometry_from_gtfs(&shapes, &trips))
            .unwrap_or_default(),
        None => GeometryMap::new(),
    };

    if derived.is_empty() {
        warn!("No GTFS shapes available, using sample geometries");
        sample_geometries()
    } else {
        derived
    }
}

fn read_feed(dir: &Path) -> Option<(String, String)> {
    let read = |file: &str| {
        let path = dir.join(file);
        std::fs::read_to_string(&path)
            .map_err(|e| warn!(path = %path.display(), error = %e, "Failed to read GTFS file"))
            .ok()
    };
    Some((read("shapes.txt")?, read("trips.txt")?))
}
