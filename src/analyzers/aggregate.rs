use crate::analyzers::performance::route_performance;
use crate::analyzers::types::{DataQuality, DateRange, SummaryStatistics};
use crate::analyzers::utility::{mean, pct, round2};
use crate::models::DelayEvent;
use crate::normalize::values::leading_hour;
use std::collections::HashSet;

/// Fleet size the coverage percentage is measured against. An approximation,
/// not a measured route total.
pub const REFERENCE_FLEET_SIZE: f64 = 150.0;

/// Peak hour reported when no event carries a readable time of day.
pub const DEFAULT_PEAK_HOUR: &str = "08:00";

/// Derives a [`SummaryStatistics`] snapshot from raw delay events.
///
/// Never fails. With no events the fixed fallback snapshot is returned; an
/// event whose date, time or delay cannot be read simply does not
/// contribute to that metric.
pub fn compute_statistics(events: &[DelayEvent]) -> SummaryStatistics {
    if events.is_empty() {
        return SummaryStatistics::fallback();
    }

    let total_delays = events.len();

    let delays: Vec<f64> = events.iter().filter_map(DelayEvent::positive_delay).collect();
    let valid_delays = delays.len();
    let avg_delay_minutes = round2(mean(&delays));

    let routes = distinct(events.iter().map(|e| e.route.as_deref()));
    let vehicles = distinct(events.iter().map(|e| e.vehicle.as_deref()));
    let locations = distinct(events.iter().map(|e| e.location.as_deref()));

    let date_range = date_range(events);

    let coverage_percentage = (routes as f64 / REFERENCE_FLEET_SIZE * 100.0).round();

    let most_delayed_route = route_performance(events)
        .into_iter()
        .fold(None, |best: Option<(f64, String)>, row| match best {
            Some((avg, _)) if row.avg_delay_min <= avg => best,
            _ => Some((
                row.avg_delay_min,
                format!("{} - {}", row.route, row.route_long_name),
            )),
        })
        .map(|(_, label)| label)
        .unwrap_or_else(|| "Unknown".to_string());

    let time_period = match &date_range {
        Some(range) => format!(
            "{} to {}",
            range.oldest.format("%Y-%m-%d"),
            range.most_recent.format("%Y-%m-%d")
        ),
        None => "All dates".to_string(),
    };

    SummaryStatistics {
        total_delays: total_delays as u64,
        valid_delays: valid_delays as u64,
        avg_delay_minutes,
        total_routes: routes as u64,
        unique_vehicles: vehicles as u64,
        unique_locations: locations as u64,
        data_points: total_delays as u64,
        coverage_percentage,
        date_range,
        peak_delay_hour: peak_delay_hour(events),
        most_delayed_route,
        time_period,
        updated_at: None,
        data_quality: DataQuality {
            valid_delay_percentage: round2(pct(valid_delays, total_delays)),
            route_coverage: routes as u64,
            location_coverage: locations as u64,
        },
    }
}

/// Number of distinct non-empty values.
fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> usize {
    values
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Oldest and most recent parsed dates, or `None` if no event has one.
pub fn date_range(events: &[DelayEvent]) -> Option<DateRange> {
    let mut dates = events.iter().filter_map(|e| e.date);
    let first = dates.next()?;
    let (oldest, most_recent) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange {
        oldest,
        most_recent,
    })
}

/// Hour of day with the most events, formatted `HH:00`.
///
/// Hours are counted in first-seen order and the scan keeps the first
/// maximum, so ties go to the hour that appeared earliest.
pub fn peak_delay_hour(events: &[DelayEvent]) -> String {
    let mut counts: Vec<(u32, usize)> = Vec::new();

    for hour in events
        .iter()
        .filter_map(|e| e.time.as_deref().and_then(leading_hour))
    {
        match counts.iter_mut().find(|(h, _)| *h == hour) {
            Some((_, count)) => *count += 1,
            None => counts.push((hour, 1)),
        }
    }

    let mut peak: Option<(u32, usize)> = None;
    for (hour, count) in counts {
        if peak.is_none_or(|(_, best)| count > best) {
            peak = Some((hour, count));
        }
    }

    match peak {
        Some((hour, _)) => format!("{hour:02}:00"),
        None => DEFAULT_PEAK_HOUR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(route: &str, delay: f64, time: Option<&str>) -> DelayEvent {
        DelayEvent {
            route: Some(route.to_string()),
            delay_minutes: Some(delay),
            time: time.map(str::to_string),
            ..Default::default()
        }
    }

    fn on(day: u32, mut e: DelayEvent) -> DelayEvent {
        e.date = NaiveDate::from_ymd_opt(2025, 1, day).and_then(|d| d.and_hms_opt(9, 0, 0));
        e
    }

    #[test]
    fn test_empty_input_returns_fallback_snapshot() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_delays, 12478);
        assert_eq!(stats.avg_delay_minutes, 8.7);
        assert_eq!(stats.total_routes, 156);
        assert_eq!(stats.coverage_percentage, 87.5);
        assert_eq!(stats.peak_delay_hour, "08:00");
    }

    #[test]
    fn test_counts_and_average() {
        let mut events = vec![
            event("501", 10.0, Some("08:10")),
            event("504", 5.0, Some("17:20")),
            event("501", 0.0, Some("08:40")),
            event("505", 6.0, None),
        ];
        events[0].vehicle = Some("8001".into());
        events[1].vehicle = Some("8001".into());
        events[2].location = Some("UNION".into());
        events[3].location = Some(String::new());

        let stats = compute_statistics(&events);

        assert_eq!(stats.total_delays, 4);
        assert_eq!(stats.valid_delays, 3);
        assert_eq!(stats.avg_delay_minutes, 7.0);
        assert_eq!(stats.total_routes, 3);
        assert_eq!(stats.unique_vehicles, 1);
        assert_eq!(stats.unique_locations, 1);
        assert_eq!(stats.data_quality.valid_delay_percentage, 75.0);
        assert_eq!(stats.peak_delay_hour, "08:00");
        assert_eq!(stats.most_delayed_route, "501 - Route 501");
    }

    #[test]
    fn test_average_rounded_to_two_places() {
        let events = vec![
            event("1", 1.0, None),
            event("1", 1.0, None),
            event("1", 2.0, None),
        ];
        assert_eq!(compute_statistics(&events).avg_delay_minutes, 1.33);
    }

    #[test]
    fn test_no_positive_delays_gives_zero_average() {
        let events = vec![event("1", 0.0, None), DelayEvent::default()];
        let stats = compute_statistics(&events);
        assert_eq!(stats.valid_delays, 0);
        assert_eq!(stats.avg_delay_minutes, 0.0);
        assert_eq!(stats.most_delayed_route, "Unknown");
    }

    #[test]
    fn test_coverage_uses_reference_fleet() {
        let events: Vec<_> = (0..3).map(|i| event(&i.to_string(), 1.0, None)).collect();
        // 3 / 150 * 100 = 2.0
        assert_eq!(compute_statistics(&events).coverage_percentage, 2.0);

        let events: Vec<_> = (0..4).map(|i| event(&i.to_string(), 1.0, None)).collect();
        // 2.67 rounds to 3
        assert_eq!(compute_statistics(&events).coverage_percentage, 3.0);
    }

    #[test]
    fn test_date_range_ignores_dateless_events() {
        let events = vec![
            on(20, event("1", 1.0, None)),
            event("1", 1.0, None),
            on(3, event("1", 1.0, None)),
            on(11, event("1", 1.0, None)),
        ];
        let range = compute_statistics(&events).date_range.unwrap();
        assert_eq!(range.oldest.date(), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(
            range.most_recent.date(),
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
        );
    }

    #[test]
    fn test_date_range_absent_without_dates() {
        let stats = compute_statistics(&[event("1", 1.0, None)]);
        assert!(stats.date_range.is_none());
        assert_eq!(stats.time_period, "All dates");
    }

    #[test]
    fn test_peak_hour_tie_goes_to_first_seen() {
        let events = vec![
            event("1", 1.0, Some("17:05")),
            event("1", 1.0, Some("07:30")),
            event("1", 1.0, Some("07:45")),
            event("1", 1.0, Some("17:59")),
        ];
        assert_eq!(peak_delay_hour(&events), "17:00");
    }

    #[test]
    fn test_peak_hour_skips_unreadable_times() {
        let events = vec![
            event("1", 1.0, Some("noon")),
            event("1", 1.0, Some("6:15")),
        ];
        assert_eq!(peak_delay_hour(&events), "06:00");
    }

    #[test]
    fn test_peak_hour_defaults_without_times() {
        assert_eq!(peak_delay_hour(&[event("1", 1.0, None)]), DEFAULT_PEAK_HOUR);
    }
}
