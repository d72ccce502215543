//! Resource loading with caching and fallbacks.
//!
//! Every public load returns a usable value. Fetch failures, malformed
//! payloads and empty datasets are logged and replaced by the matching
//! fallback; nothing escapes to the caller.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::analyzers::aggregate::compute_statistics;
use crate::analyzers::types::SummaryStatistics;
use crate::cache::{ResultCache, default_ttl};
use crate::error::DataError;
use crate::fallback;
use crate::fetch::{HttpClient, read_resource, resource_location};
use crate::models::{DelayEvent, GeometryMap, LocationRecord, RouteRecord};
use crate::normalize::{
    delay_events, normalize_geometries, normalize_locations, normalize_routes, normalize_summary,
};
use crate::parser::{parse_delimited, parse_json, row_to_record};

pub const ROUTE_PERFORMANCE: &str = "route_performance.csv";
pub const ROUTE_GEOMETRIES: &str = "route_geometries.json";
pub const LOCATION_ANALYSIS: &str = "location_analysis.csv";
pub const SUMMARY_STATISTICS: &str = "summary_statistics.json";
pub const DELAY_EVENTS: &str = "delay_data.json";

/// A parsed resource as held in the cache.
#[derive(Debug, Clone)]
pub enum Resource {
    Routes(Vec<RouteRecord>),
    Geometries(GeometryMap),
    Locations(Vec<LocationRecord>),
    Summary(SummaryStatistics),
    Events(Vec<DelayEvent>),
}

/// Everything the dashboard renders from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub routes: Vec<RouteRecord>,
    pub geometries: GeometryMap,
    pub locations: Vec<LocationRecord>,
    pub summary: SummaryStatistics,
    pub events: Vec<DelayEvent>,
}

/// Parses the route performance CSV.
///
/// # Errors
///
/// [`DataError::EmptyDataset`] if no row survives normalization.
pub fn parse_route_performance(text: &str) -> Result<Vec<RouteRecord>, DataError> {
    let records: Vec<_> = parse_delimited(text).into_iter().map(row_to_record).collect();
    let routes = normalize_routes(&records);
    debug!(rows = records.len(), routes = routes.len(), "Route performance parsed");
    non_empty(routes, ROUTE_PERFORMANCE)
}

/// Parses the route geometry JSON.
///
/// # Errors
///
/// [`DataError::MalformedPayload`] for bad JSON, [`DataError::EmptyDataset`]
/// if no route keeps a valid point.
pub fn parse_route_geometries(text: &str) -> Result<GeometryMap, DataError> {
    let geometries = normalize_geometries(&parse_json(text)?)?;
    if geometries.is_empty() {
        return Err(DataError::EmptyDataset(ROUTE_GEOMETRIES.into()));
    }
    Ok(geometries)
}

/// Parses the location analysis CSV.
///
/// # Errors
///
/// [`DataError::EmptyDataset`] if no row survives normalization.
pub fn parse_location_analysis(text: &str) -> Result<Vec<LocationRecord>, DataError> {
    let records: Vec<_> = parse_delimited(text).into_iter().map(row_to_record).collect();
    non_empty(normalize_locations(&records), LOCATION_ANALYSIS)
}

/// Parses summary statistics: a flat summary object, or an array of raw
/// delay events to aggregate.
///
/// # Errors
///
/// [`DataError::MalformedPayload`] for bad JSON or an unexpected shape,
/// [`DataError::EmptyDataset`] for an empty event array.
pub fn parse_summary_statistics(text: &str) -> Result<SummaryStatistics, DataError> {
    let value = parse_json(text)?;
    if value.is_array() {
        let events = non_empty(delay_events(&value)?, SUMMARY_STATISTICS)?;
        return Ok(compute_statistics(&events));
    }
    normalize_summary(&value)
}

/// Parses the raw delay event JSON.
///
/// # Errors
///
/// [`DataError::MalformedPayload`] for bad JSON or an unexpected shape,
/// [`DataError::EmptyDataset`] if there are no events.
pub fn parse_delay_events(text: &str) -> Result<Vec<DelayEvent>, DataError> {
    non_empty(delay_events(&parse_json(text)?)?, DELAY_EVENTS)
}

fn non_empty<T>(items: Vec<T>, resource: &str) -> Result<Vec<T>, DataError> {
    if items.is_empty() {
        Err(DataError::EmptyDataset(resource.to_string()))
    } else {
        Ok(items)
    }
}

/// Loads dashboard resources from a base location (directory or URL).
pub struct DataLoader<'a, C> {
    client: C,
    base: String,
    cache: &'a ResultCache<Resource>,
    ttl: Duration,
}

impl<'a, C: HttpClient> DataLoader<'a, C> {
    pub fn new(client: C, base: impl Into<String>, cache: &'a ResultCache<Resource>) -> Self {
        Self {
            client,
            base: base.into(),
            cache,
            ttl: default_ttl(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Fetches and parses `name`, serving a fresh cache entry when present.
    async fn load<T>(
        &self,
        name: &str,
        parse: impl FnOnce(&str) -> Result<T, DataError>,
        into_resource: impl FnOnce(T) -> Resource,
        from_resource: impl FnOnce(Resource) -> Option<T>,
    ) -> Result<T, DataError>
    where
        T: Clone,
    {
        let now = Utc::now();
        if let Some(value) = self.cache.fresh(name, now, self.ttl).and_then(from_resource) {
            debug!(resource = name, "Serving cached resource");
            return Ok(value);
        }

        let text = read_resource(&self.client, &resource_location(&self.base, name)).await?;
        let value = parse(&text)?;
        self.cache.put(name, into_resource(value.clone()), now);
        Ok(value)
    }

    #[tracing::instrument(skip(self), fields(base = %self.base))]
    pub async fn route_performance(&self) -> Vec<RouteRecord> {
        let loaded = self
            .load(
                ROUTE_PERFORMANCE,
                parse_route_performance,
                Resource::Routes,
                |r| match r {
                    Resource::Routes(v) => Some(v),
                    _ => None,
                },
            )
            .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "Route performance unavailable, using sample routes");
            fallback::sample_routes()
        })
    }

    #[tracing::instrument(skip(self), fields(base = %self.base))]
    pub async fn route_geometries(&self) -> GeometryMap {
        let loaded = self
            .load(
                ROUTE_GEOMETRIES,
                parse_route_geometries,
                Resource::Geometries,
                |r| match r {
                    Resource::Geometries(v) => Some(v),
                    _ => None,
                },
            )
            .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "Route geometries unavailable, using sample geometries");
            fallback::sample_geometries()
        })
    }

    #[tracing::instrument(skip(self), fields(base = %self.base))]
    pub async fn location_analysis(&self) -> Vec<LocationRecord> {
        let loaded = self
            .load(
                LOCATION_ANALYSIS,
                parse_location_analysis,
                Resource::Locations,
                |r| match r {
                    Resource::Locations(v) => Some(v),
                    _ => None,
                },
            )
            .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "Location analysis unavailable, using empty list");
            Vec::new()
        })
    }

    #[tracing::instrument(skip(self), fields(base = %self.base))]
    pub async fn summary_statistics(&self) -> SummaryStatistics {
        let loaded = self
            .load(
                SUMMARY_STATISTICS,
                parse_summary_statistics,
                Resource::Summary,
                |r| match r {
                    Resource::Summary(v) => Some(v),
                    _ => None,
                },
            )
            .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "Summary statistics unavailable, using defaults");
            SummaryStatistics::fallback()
        })
    }

    #[tracing::instrument(skip(self), fields(base = %self.base))]
    pub async fn delay_events(&self) -> Vec<DelayEvent> {
        let loaded = self
            .load(
                DELAY_EVENTS,
                parse_delay_events,
                Resource::Events,
                |r| match r {
                    Resource::Events(v) => Some(v),
                    _ => None,
                },
            )
            .await;

        loaded.unwrap_or_else(|e| {
            debug!(error = %e, "Delay events unavailable, statistics come from the summary");
            Vec::new()
        })
    }

    /// Issues every load together and waits for all of them.
    pub async fn load_all(&self) -> Dataset {
        let (routes, geometries, locations, summary, events) = tokio::join!(
            self.route_performance(),
            self.route_geometries(),
            self.location_analysis(),
            self.summary_statistics(),
            self.delay_events(),
        );

        info!(
            routes = routes.len(),
            geometries = geometries.len(),
            locations = locations.len(),
            events = events.len(),
            "Dataset loaded"
        );

        Dataset {
            routes,
            geometries,
            locations,
            summary,
            events,
        }
    }
}
