//! Normalization of loosely-typed source records into canonical records.
//!
//! Every logical field is read through an alias table in [`fields`] and
//! cleaned by the helpers in [`values`]. Records that cannot satisfy the
//! canonical schema are rejected with [`DataError::InvalidRecord`]; the
//! collection-level functions drop them and keep going.

pub mod fields;
pub mod values;

use serde_json::Value;
use tracing::debug;

use crate::analyzers::types::{DataQuality, DateRange, SummaryStatistics};
use crate::analyzers::utility::{pct, round2};
use crate::error::DataError;
use crate::models::{DelayEvent, GeometryMap, LatLng, LocationRecord, RouteRecord};
use crate::parser::RawRecord;

pub use values::{clean_route_id, is_valid_coordinate, parse_date, parse_number};

use values::{parse_count, route_number, sanitize_location_id, text};

/// Normalizes one route performance record.
///
/// # Errors
///
/// Returns [`DataError::InvalidRecord`] when the route id is empty or the
/// average delay or delay count is missing, unparseable or negative.
pub fn normalize_route(record: &RawRecord) -> Result<RouteRecord, DataError> {
    let route_id = clean_route_id(fields::ROUTE_ID.first_present(record));
    if route_id.is_empty() {
        return Err(DataError::InvalidRecord("route id is empty".into()));
    }

    let avg_delay_minutes = parse_number(fields::AVG_DELAY.first_present(record))
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| DataError::InvalidRecord(format!("route {route_id}: no average delay")))?;

    let delay_count = parse_count(fields::DELAY_COUNT.first_present(record))
        .ok_or_else(|| DataError::InvalidRecord(format!("route {route_id}: no delay count")))?;

    let display_name = text(fields::ROUTE_NAME.first_present(record))
        .unwrap_or_else(|| format!("Route {route_id}"));

    Ok(RouteRecord {
        display_name,
        avg_delay_minutes,
        delay_count,
        total_delay_minutes: parse_number(fields::TOTAL_DELAY.first_present(record)),
        on_time_percentage: parse_number(fields::ON_TIME.first_present(record)),
        delay_frequency: parse_number(fields::DELAY_FREQUENCY.first_present(record)),
        route_id,
    })
}

/// Normalizes route records, dropping the invalid ones and keeping input order.
pub fn normalize_routes<'a>(records: impl IntoIterator<Item = &'a RawRecord>) -> Vec<RouteRecord> {
    records
        .into_iter()
        .filter_map(|record| match normalize_route(record) {
            Ok(route) => Some(route),
            Err(e) => {
                debug!(error = %e, "Dropping route record");
                None
            }
        })
        .collect()
}

/// Keeps the valid `[lat, lng]` pairs of a coordinate list, in order.
pub fn normalize_coordinates(points: &Value) -> Vec<LatLng> {
    let Some(points) = points.as_array() else {
        return Vec::new();
    };

    points
        .iter()
        .filter_map(|point| {
            let pair = point.as_array()?;
            let lat = parse_number(pair.first())?;
            let lng = parse_number(pair.get(1))?;
            is_valid_coordinate(lat, lng).then(|| LatLng::new(lat, lng))
        })
        .collect()
}

/// Builds a [`GeometryMap`] from a `{ route_id: [[lat, lng], ...] }` object.
///
/// Routes whose coordinate list is empty after validation are omitted.
///
/// # Errors
///
/// Returns [`DataError::MalformedPayload`] if the payload is not an object.
pub fn normalize_geometries(value: &Value) -> Result<GeometryMap, DataError> {
    let object = value
        .as_object()
        .ok_or_else(|| DataError::MalformedPayload("route geometries must be an object".into()))?;

    let mut geometries = GeometryMap::new();
    for (key, points) in object {
        let route_id = key.trim();
        if route_id.is_empty() {
            continue;
        }
        let coordinates = normalize_coordinates(points);
        if coordinates.is_empty() {
            debug!(route_id, "Dropping route geometry with no valid points");
            continue;
        }
        geometries.insert(route_id.to_string(), coordinates);
    }

    Ok(geometries)
}

/// Normalizes one location analysis record.
///
/// # Errors
///
/// Returns [`DataError::InvalidRecord`] when the location has neither id
/// nor name, or its coordinates are missing or out of range.
pub fn normalize_location(record: &RawRecord) -> Result<LocationRecord, DataError> {
    let location_name = text(fields::LOCATION_NAME.first_present(record));
    let location_id = text(fields::LOCATION_ID.first_present(record))
        .or_else(|| location_name.as_deref().map(sanitize_location_id))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DataError::InvalidRecord("location has no id or name".into()))?;

    let lat = parse_number(fields::LATITUDE.first_present(record));
    let lng = parse_number(fields::LONGITUDE.first_present(record));
    let position = match (lat, lng) {
        (Some(lat), Some(lng)) if is_valid_coordinate(lat, lng) => LatLng::new(lat, lng),
        _ => {
            return Err(DataError::InvalidRecord(format!(
                "location {location_id}: invalid coordinates"
            )));
        }
    };

    Ok(LocationRecord {
        location_name: location_name.unwrap_or_else(|| location_id.clone()),
        position,
        total_delays: parse_count(fields::LOCATION_TOTAL.first_present(record)).unwrap_or(0),
        avg_delay_minutes: parse_number(fields::LOCATION_AVG.first_present(record)).unwrap_or(0.0),
        route_count: parse_count(fields::ROUTE_COUNT.first_present(record)).unwrap_or(0),
        vehicle_count: parse_count(fields::VEHICLE_COUNT.first_present(record)),
        peak_hours: peak_hours(fields::PEAK_HOURS.first_present(record)),
        location_id,
    })
}

/// Normalizes location records, dropping the invalid ones and keeping input order.
pub fn normalize_locations<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
) -> Vec<LocationRecord> {
    records
        .into_iter()
        .filter_map(|record| match normalize_location(record) {
            Ok(location) => Some(location),
            Err(e) => {
                debug!(error = %e, "Dropping location record");
                None
            }
        })
        .collect()
}

/// Peak hours arrive either as a JSON array or as a cell holding JSON-encoded text.
fn peak_hours(value: Option<&Value>) -> Vec<String> {
    let decoded;
    let array = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => {
                decoded = items;
                &decoded
            }
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    array
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Reads one raw delay event. Never fails; unreadable fields are `None`.
pub fn delay_event(record: &RawRecord) -> DelayEvent {
    let delay_minutes = fields::EVENT_DELAY
        .first_parsed(record, |v| parse_number(Some(v)).filter(|d| *d != 0.0))
        .or_else(|| fields::EVENT_DELAY.first_parsed(record, |v| parse_number(Some(v))));

    DelayEvent {
        date: fields::EVENT_DATE.first_parsed(record, parse_date),
        route: text(fields::EVENT_ROUTE.first_present(record))
            .map(|r| route_number(&r))
            .filter(|r| !r.is_empty()),
        vehicle: text(fields::EVENT_VEHICLE.first_present(record)),
        location: text(fields::EVENT_LOCATION.first_present(record)),
        time: text(fields::EVENT_TIME.first_present(record)),
        delay_minutes,
    }
}

/// Reads a raw delay-event payload: an array of objects, or an object
/// wrapping that array under `records`.
///
/// # Errors
///
/// Returns [`DataError::MalformedPayload`] for any other shape.
pub fn delay_events(value: &Value) -> Result<Vec<DelayEvent>, DataError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => object
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DataError::MalformedPayload("delay events object has no records".into())
            })?,
        _ => {
            return Err(DataError::MalformedPayload(
                "delay events must be an array".into(),
            ));
        }
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(delay_event)
        .collect())
}

/// Reads a summary statistics object. Missing fields keep the fallback values.
///
/// # Errors
///
/// Returns [`DataError::MalformedPayload`] if the payload is not an object.
pub fn normalize_summary(value: &Value) -> Result<SummaryStatistics, DataError> {
    let record = value
        .as_object()
        .ok_or_else(|| DataError::MalformedPayload("summary statistics must be an object".into()))?;
    let defaults = SummaryStatistics::fallback();

    let count = |field: &fields::Field, default: u64| {
        parse_count(field.first_present(record)).unwrap_or(default)
    };
    let number = |field: &fields::Field, default: f64| {
        parse_number(field.first_present(record)).unwrap_or(default)
    };
    let string = |field: &fields::Field, default: String| {
        text(field.first_present(record)).unwrap_or(default)
    };

    let total_delays = count(&fields::SUMMARY_TOTAL, defaults.total_delays);
    let valid_delays = count(&fields::SUMMARY_VALID, defaults.valid_delays);
    let total_routes = count(&fields::SUMMARY_ROUTES, defaults.total_routes);
    let unique_locations = count(&fields::SUMMARY_LOCATIONS, defaults.unique_locations);

    let nested = |key: &str| record.get(key).and_then(Value::as_object);

    let date_range = {
        let source = nested("date_range").unwrap_or(record);
        let oldest = fields::SUMMARY_OLDEST.first_parsed(source, parse_date);
        let most_recent = fields::SUMMARY_MOST_RECENT.first_parsed(source, parse_date);
        match (oldest, most_recent) {
            (Some(oldest), Some(most_recent)) => Some(DateRange {
                oldest,
                most_recent,
            }),
            _ => None,
        }
    };

    let data_quality = match nested("data_quality") {
        Some(quality) => DataQuality {
            valid_delay_percentage: parse_number(fields::QUALITY_VALID_PCT.first_present(quality))
                .unwrap_or_else(|| valid_percentage(valid_delays, total_delays)),
            route_coverage: parse_count(fields::QUALITY_ROUTES.first_present(quality))
                .unwrap_or(total_routes),
            location_coverage: parse_count(fields::QUALITY_LOCATIONS.first_present(quality))
                .unwrap_or(unique_locations),
        },
        None => DataQuality {
            valid_delay_percentage: valid_percentage(valid_delays, total_delays),
            route_coverage: total_routes,
            location_coverage: unique_locations,
        },
    };

    Ok(SummaryStatistics {
        total_delays,
        valid_delays,
        avg_delay_minutes: number(&fields::SUMMARY_AVG, defaults.avg_delay_minutes),
        total_routes,
        unique_vehicles: count(&fields::SUMMARY_VEHICLES, defaults.unique_vehicles),
        unique_locations,
        data_points: count(&fields::SUMMARY_DATA_POINTS, total_delays),
        coverage_percentage: number(&fields::SUMMARY_COVERAGE, defaults.coverage_percentage),
        date_range,
        peak_delay_hour: string(&fields::SUMMARY_PEAK_HOUR, defaults.peak_delay_hour),
        most_delayed_route: string(&fields::SUMMARY_MOST_DELAYED, defaults.most_delayed_route),
        time_period: string(&fields::SUMMARY_PERIOD, defaults.time_period),
        updated_at: fields::SUMMARY_UPDATED
            .first_parsed(record, parse_date)
            .map(|dt| dt.and_utc()),
        data_quality,
    })
}

fn valid_percentage(valid: u64, total: u64) -> f64 {
    round2(pct(valid as usize, total as usize))
}
