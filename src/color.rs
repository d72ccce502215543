//! Mapping of route metrics to map styling: colours and line weights.
//!
//! A metric is split by four breakpoints and each breakpoint carries a
//! colour; values between two breakpoints blend the neighbouring colours
//! channel by channel.

use std::fmt;

use serde::Serialize;

use crate::error::DataError;
use crate::models::RouteRecord;

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MalformedPayload`] for anything else.
    pub fn from_hex(hex: &str) -> Result<Self, DataError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(DataError::MalformedPayload(format!("invalid colour: {hex}")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| DataError::MalformedPayload(format!("invalid colour: {hex}")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Blends towards `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Green to red, for average delay.
pub const DELAY_COLORS: [Rgb; 4] = [
    Rgb::new(0x2e, 0xcc, 0x71),
    Rgb::new(0xf1, 0xc4, 0x0f),
    Rgb::new(0xe6, 0x7e, 0x22),
    Rgb::new(0xe7, 0x4c, 0x3c),
];

/// Light to dark blue, for delay frequency.
pub const FREQUENCY_COLORS: [Rgb; 4] = [
    Rgb::new(0xd6, 0xea, 0xf8),
    Rgb::new(0x85, 0xc1, 0xe9),
    Rgb::new(0x34, 0x98, 0xdb),
    Rgb::new(0x1b, 0x4f, 0x72),
];

/// Colour for `value` on a four-stop scale.
///
/// At or below the first breakpoint gives `colors[0]`, at or above the last
/// gives `colors[3]`; in between, the two surrounding colours are blended by
/// the value's position within its segment.
pub fn color_for(value: f64, breakpoints: &[f64; 4], colors: &[Rgb; 4]) -> Rgb {
    if value.is_nan() || value <= breakpoints[0] {
        return colors[0];
    }
    if value >= breakpoints[3] {
        return colors[3];
    }

    for i in 0..3 {
        let (lo, hi) = (breakpoints[i], breakpoints[i + 1]);
        if value >= lo && value < hi {
            let ratio = (value - lo) / (hi - lo);
            return colors[i].lerp(colors[i + 1], ratio);
        }
    }

    colors[3]
}

/// Breakpoints `[0, 0.3·max, 0.6·max, max]`.
pub fn breakpoints_from_max(max: f64) -> [f64; 4] {
    [0.0, 0.3 * max, 0.6 * max, max]
}

/// Breakpoints spread over `[min, max]` at 0, 30, 60 and 100 percent.
///
/// Equivalent to [`breakpoints_from_max`] whenever `min` is zero.
pub fn breakpoints_from_range(min: f64, max: f64) -> [f64; 4] {
    let span = max - min;
    [min, min + 0.3 * span, min + 0.6 * span, max]
}

/// Linear map of `value` from `[min, max]` onto `[min_weight, max_weight]`,
/// clamped at both ends. A degenerate domain maps to `min_weight`.
pub fn weight_for(value: f64, min: f64, max: f64, min_weight: f64, max_weight: f64) -> f64 {
    if !(max > min) || value.is_nan() {
        return min_weight;
    }
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    min_weight + ratio * (max_weight - min_weight)
}

/// Which route metric drives the map styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    #[default]
    Delay,
    Frequency,
}

impl VisualizationMode {
    /// The metric coloured in this mode.
    pub fn metric(self, route: &RouteRecord) -> f64 {
        match self {
            VisualizationMode::Delay => route.avg_delay_minutes,
            VisualizationMode::Frequency => route
                .delay_frequency
                .unwrap_or(route.delay_count as f64),
        }
    }

    pub fn colors(self) -> &'static [Rgb; 4] {
        match self {
            VisualizationMode::Delay => &DELAY_COLORS,
            VisualizationMode::Frequency => &FREQUENCY_COLORS,
        }
    }
}

impl std::str::FromStr for VisualizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delay" => Ok(VisualizationMode::Delay),
            "frequency" => Ok(VisualizationMode::Frequency),
            other => Err(format!("unknown visualization mode: {other}")),
        }
    }
}

/// Line weights used for the frequency view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

impl Default for WeightRange {
    fn default() -> Self {
        Self { min: 2.0, max: 8.0 }
    }
}

/// A legend row: the lower bound of a band and its colour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub from: f64,
    pub color: Rgb,
}

/// The scale for one route collection in one mode. Rebuild it whenever the
/// collection changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub mode: VisualizationMode,
    pub breakpoints: [f64; 4],
    pub colors: [Rgb; 4],
    count_min: f64,
    count_max: f64,
    weights: WeightRange,
}

impl ColorScale {
    /// Breakpoints span the observed `[min, max]` of the mode's metric.
    pub fn for_routes(
        routes: &[RouteRecord],
        mode: VisualizationMode,
        weights: WeightRange,
    ) -> Self {
        Self::build(routes, mode, weights, breakpoints_from_range)
    }

    /// Breakpoints anchored at zero: `[0, 0.3·max, 0.6·max, max]`.
    pub fn for_routes_from_zero(
        routes: &[RouteRecord],
        mode: VisualizationMode,
        weights: WeightRange,
    ) -> Self {
        Self::build(routes, mode, weights, |_, max| breakpoints_from_max(max))
    }

    fn build(
        routes: &[RouteRecord],
        mode: VisualizationMode,
        weights: WeightRange,
        breakpoints: impl Fn(f64, f64) -> [f64; 4],
    ) -> Self {
        let (min, max) = min_max(routes.iter().map(|r| mode.metric(r)));
        let (count_min, count_max) = min_max(routes.iter().map(|r| r.delay_count as f64));

        Self {
            mode,
            breakpoints: breakpoints(min, max),
            colors: *mode.colors(),
            count_min,
            count_max,
            weights,
        }
    }

    pub fn color(&self, route: &RouteRecord) -> Rgb {
        color_for(self.mode.metric(route), &self.breakpoints, &self.colors)
    }

    /// Line weight: scaled by delay count in the frequency view, the
    /// upper weight's midpoint otherwise.
    pub fn weight(&self, route: &RouteRecord) -> f64 {
        match self.mode {
            VisualizationMode::Frequency => weight_for(
                route.delay_count as f64,
                self.count_min,
                self.count_max,
                self.weights.min,
                self.weights.max,
            ),
            VisualizationMode::Delay => (self.weights.min + self.weights.max) / 2.0,
        }
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.breakpoints
            .iter()
            .zip(self.colors.iter())
            .map(|(from, color)| LegendEntry {
                from: *from,
                color: *color,
            })
            .collect()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((0.0, 0.0))
}
