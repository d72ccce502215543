//! Alias tables mapping loosely-named source fields onto logical fields.
//!
//! Each logical field is a [`Field`]: an ordered list of accepted source
//! names, optionally followed by a scan over every key containing a given
//! fragment. Adding an alias is a one-line table change.

use serde_json::Value;

use crate::parser::RawRecord;

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub aliases: &'static [&'static str],
    /// Lower-case fragment; any other key containing it is tried after the aliases.
    pub scan_contains: Option<&'static str>,
}

impl Field {
    const fn named(aliases: &'static [&'static str]) -> Self {
        Self {
            aliases,
            scan_contains: None,
        }
    }

    /// Every candidate value in priority order.
    pub fn candidates<'a>(
        &'a self,
        record: &'a RawRecord,
    ) -> impl Iterator<Item = &'a Value> + 'a {
        let named = self.aliases.iter().filter_map(|name| record.get(*name));

        let scanned = self.scan_contains.into_iter().flat_map(move |fragment| {
            record.iter().filter_map(move |(key, value)| {
                let is_alias = self.aliases.contains(&key.as_str());
                (!is_alias && key.to_lowercase().contains(fragment)).then_some(value)
            })
        });

        named.chain(scanned)
    }

    /// The first candidate that is neither null nor blank text.
    pub fn first_present<'a>(&'a self, record: &'a RawRecord) -> Option<&'a Value> {
        self.candidates(record).find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    /// The first candidate that `parse` accepts.
    pub fn first_parsed<T>(
        &self,
        record: &RawRecord,
        parse: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        self.candidates(record).find_map(parse)
    }
}

// Route performance resource.
pub static ROUTE_ID: Field = Field::named(&["Route", "route_id", "route", "routeId"]);
pub static ROUTE_NAME: Field =
    Field::named(&["route_long_name", "route_name", "routeName", "name"]);
pub static AVG_DELAY: Field =
    Field::named(&["Avg_Delay_Min", "avg_delay_minutes", "avgDelayMinutes"]);
pub static DELAY_COUNT: Field = Field::named(&["Delay_Count", "delay_count", "delayCount"]);
pub static TOTAL_DELAY: Field = Field::named(&["Total_Delay_Min", "total_delay_minutes"]);
pub static ON_TIME: Field = Field::named(&["On_Time_Percentage", "on_time_percentage"]);
pub static DELAY_FREQUENCY: Field =
    Field::named(&["Delay_Frequency", "delay_frequency", "Delays_Per_Day"]);

// Location analysis resource.
pub static LOCATION_ID: Field = Field::named(&["location_id", "locationId", "id"]);
pub static LOCATION_NAME: Field = Field::named(&["location_name", "locationName", "name"]);
pub static LOCATION_TOTAL: Field = Field::named(&["total_delays", "totalDelays"]);
pub static LOCATION_AVG: Field = Field::named(&["avg_delay_min", "avg_delay_minutes"]);
pub static LATITUDE: Field = Field::named(&["latitude", "lat"]);
pub static LONGITUDE: Field = Field::named(&["longitude", "lng", "lon"]);
pub static ROUTE_COUNT: Field = Field::named(&["route_count", "routeCount"]);
pub static VEHICLE_COUNT: Field = Field::named(&["vehicle_count", "vehicleCount"]);
pub static PEAK_HOURS: Field = Field::named(&["peak_hours", "peakHours"]);

// Raw delay events.
pub static EVENT_DATE: Field = Field {
    aliases: &["Date", "Report_Date", "Report Date", "ReportDate", "date"],
    scan_contains: Some("date"),
};
pub static EVENT_ROUTE: Field = Field::named(&["Route", "Line", "route", "route_id"]);
pub static EVENT_VEHICLE: Field = Field::named(&["Vehicle", "vehicle"]);
pub static EVENT_LOCATION: Field = Field::named(&["Location", "Station", "location"]);
pub static EVENT_TIME: Field = Field::named(&["Time", "time"]);
pub static EVENT_DELAY: Field = Field::named(&["Min Delay", "Delay"]);

// Summary statistics resource.
pub static SUMMARY_TOTAL: Field = Field::named(&["total_delays", "totalDelays", "data_points"]);
pub static SUMMARY_VALID: Field = Field::named(&["valid_delays", "validDelays"]);
pub static SUMMARY_AVG: Field =
    Field::named(&["avg_delay_minutes", "avgDelayMinutes", "average_delay"]);
pub static SUMMARY_ROUTES: Field = Field::named(&["unique_routes", "total_routes", "totalRoutes"]);
pub static SUMMARY_VEHICLES: Field = Field::named(&["unique_vehicles", "uniqueVehicles"]);
pub static SUMMARY_LOCATIONS: Field = Field::named(&["unique_locations", "uniqueLocations"]);
pub static SUMMARY_COVERAGE: Field = Field::named(&["coverage_percentage", "coverage"]);
pub static SUMMARY_PEAK_HOUR: Field = Field::named(&["peak_delay_hour", "peakHour"]);
pub static SUMMARY_MOST_DELAYED: Field = Field::named(&["most_delayed_route", "mostDelayedRoute"]);
pub static SUMMARY_PERIOD: Field = Field::named(&["time_period", "timePeriod"]);
pub static SUMMARY_UPDATED: Field = Field::named(&["updated_at", "updatedAt"]);
pub static SUMMARY_DATA_POINTS: Field = Field::named(&["data_points", "dataPoints"]);
pub static SUMMARY_OLDEST: Field = Field::named(&["oldest", "oldest_date", "oldestDate"]);
pub static SUMMARY_MOST_RECENT: Field =
    Field::named(&["most_recent", "most_recent_date", "mostRecentDate"]);
pub static QUALITY_VALID_PCT: Field =
    Field::named(&["valid_delay_percentage", "validDelayPercentage"]);
pub static QUALITY_ROUTES: Field = Field::named(&["route_coverage", "routeCoverage"]);
pub static QUALITY_LOCATIONS: Field = Field::named(&["location_coverage", "locationCoverage"]);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn parse_json_record(text: &str) -> RawRecord {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_aliases_tried_in_order() {
        let r = record(json!({"route": "b", "Route": "a"}));
        assert_eq!(ROUTE_ID.first_present(&r), Some(&json!("a")));
    }

    #[test]
    fn test_first_present_skips_blank_and_null() {
        let r = record(json!({"Route": "  ", "route_id": null, "route": "504"}));
        assert_eq!(ROUTE_ID.first_present(&r), Some(&json!("504")));
    }

    #[test]
    fn test_scan_finds_unlisted_date_key() {
        let r = record(json!({"Incident_Date_Local": "2025-01-04"}));
        let found: Vec<_> = EVENT_DATE.candidates(&r).collect();
        assert_eq!(found, vec![&json!("2025-01-04")]);
    }

    #[test]
    fn test_scan_follows_payload_key_order() {
        let r =
            parse_json_record(r#"{"Incident_Date": "2025-03-02", "Closed_Date": "2025-01-01"}"#);
        let found: Vec<_> = EVENT_DATE.candidates(&r).collect();
        assert_eq!(found, vec![&json!("2025-03-02"), &json!("2025-01-01")]);
    }

    #[test]
    fn test_scan_does_not_repeat_aliases() {
        let r = record(json!({"Date": "x", "date": "y"}));
        assert_eq!(EVENT_DATE.candidates(&r).count(), 2);
    }

    #[test]
    fn test_first_parsed_skips_rejected_candidates() {
        let r = record(json!({"Min Delay": "abc", "Delay": "7"}));
        let parsed = EVENT_DELAY.first_parsed(&r, |v| v.as_str()?.parse::<f64>().ok());
        assert_eq!(parsed, Some(7.0));
    }
}
