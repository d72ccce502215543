//! Filter engine: pure, order-preserving predicates over canonical records.
//!
//! Every function returns a new collection and leaves its input untouched.

pub mod debounce;

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::models::{Dated, LocationRecord, RouteRecord};

pub use debounce::Debouncer;

/// The interactive filter inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterState {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub delay_threshold: f64,
    pub search_query: String,
}

/// Last representable millisecond of `at`'s calendar day.
pub fn end_of_day(at: NaiveDateTime) -> NaiveDateTime {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    at.date().and_time(last)
}

/// Keeps records dated within `[start, end_of_day(end)]`.
///
/// Permissive on purpose: with either bound missing every record is kept,
/// and records with no readable date are always kept.
pub fn filter_by_date_range<T: Dated + Clone>(
    records: &[T],
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Vec<T> {
    let (Some(start), Some(end)) = (start, end) else {
        return records.to_vec();
    };
    let end = end_of_day(end);

    records
        .iter()
        .filter(|record| match record.date() {
            Some(date) => date >= start && date <= end,
            None => true,
        })
        .cloned()
        .collect()
}

/// Keeps routes at or above `delay_threshold` and, when `search_query` is
/// non-empty, whose id or display name contains it (case-insensitive).
/// The query is matched as given, so surrounding whitespace is significant.
pub fn filter_routes(
    routes: &[RouteRecord],
    delay_threshold: f64,
    search_query: &str,
) -> Vec<RouteRecord> {
    let query = search_query.to_lowercase();

    routes
        .iter()
        .filter(|route| route.avg_delay_minutes >= delay_threshold)
        .filter(|route| {
            query.is_empty()
                || route.route_id.to_lowercase().contains(&query)
                || route.display_name.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Same predicates as [`filter_routes`], applied to locations by id or name.
pub fn filter_locations(
    locations: &[LocationRecord],
    delay_threshold: f64,
    search_query: &str,
) -> Vec<LocationRecord> {
    let query = search_query.to_lowercase();

    locations
        .iter()
        .filter(|location| location.avg_delay_minutes >= delay_threshold)
        .filter(|location| {
            query.is_empty()
                || location.location_id.to_lowercase().contains(&query)
                || location.location_name.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}
