//! Flat feature rows for analysis
//!
//! A decoded report is a tree: lists of weather groups and cloud layers,
//! nested wind and visibility records. [`flatten`] turns a METAR or a
//! resolved TAF forecast into a single row of named scalar columns with a
//! fixed set of names, so rows from many reports line up as a table.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::metar::Metar;
use crate::summaries::{rvr_max, rvr_min, summarize_clouds};
use crate::taf::Forecast;
use crate::types::*;

/// Weather groups kept by default when flattening
pub const DEFAULT_MAX_WEATHER: usize = 2;

/// A single column value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FeatureValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Integer(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Integer(i64::from(v))
    }
}

impl From<u32> for FeatureValue {
    fn from(v: u32) -> Self {
        FeatureValue::Integer(i64::from(v))
    }
}

impl From<u8> for FeatureValue {
    fn from(v: u8) -> Self {
        FeatureValue::Integer(i64::from(v))
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FeatureValue::Null, Into::into)
    }
}

/// Named columns in insertion order
///
/// Serializes as a JSON object whose keys keep the column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an existing column in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        let name = name.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Conditions shared by observations and forecasts
pub trait Conditions {
    fn station(&self) -> Option<&Station>;
    fn wind(&self) -> Option<&Wind>;
    fn visibility(&self) -> Option<&Visibility>;
    fn weather(&self) -> &[Weather];
    fn clouds(&self) -> &[Clouds];

    /// Columns only this kind of report has, appended after the shared ones
    fn specific_columns(&self, row: &mut FeatureRow);
}

impl Conditions for Metar {
    fn station(&self) -> Option<&Station> {
        Some(&self.station)
    }

    fn wind(&self) -> Option<&Wind> {
        self.wind.as_ref()
    }

    fn visibility(&self) -> Option<&Visibility> {
        self.visibility.as_ref()
    }

    fn weather(&self) -> &[Weather] {
        &self.weather
    }

    fn clouds(&self) -> &[Clouds] {
        &self.clouds
    }

    fn specific_columns(&self, row: &mut FeatureRow) {
        row.insert(
            "temperature_temperature",
            self.temperature.map(|t| t.temperature),
        );
        row.insert(
            "temperature_dewpoint",
            self.temperature.and_then(|t| t.dewpoint),
        );
        row.insert("pressure", self.pressure.and_then(|p| p.0));
        row.insert("runway_info_min", rvr_min(&self.runway_info));
        row.insert("runway_info_max", rvr_max(&self.runway_info));
    }
}

impl Conditions for Forecast {
    fn station(&self) -> Option<&Station> {
        None
    }

    fn wind(&self) -> Option<&Wind> {
        self.wind.as_ref()
    }

    fn visibility(&self) -> Option<&Visibility> {
        self.visibility.as_ref()
    }

    fn weather(&self) -> &[Weather] {
        &self.weather
    }

    fn clouds(&self) -> &[Clouds] {
        &self.clouds
    }

    fn specific_columns(&self, row: &mut FeatureRow) {
        row.insert("indicator", self.indicator.map(Indicator::code));
        row.insert("probability", self.probability.map(|p| p.0));
        row.insert("maxtemperature_value", self.max_temperature.map(|t| t.value));
        row.insert("mintemperature_value", self.min_temperature.map(|t| t.value));
    }
}

/// Flatten a report into one row
///
/// Only the first `max_weather` weather groups get their own columns; the
/// boolean flags look at every group.
pub fn flatten<R: Conditions + ?Sized>(report: &R, max_weather: usize) -> FeatureRow {
    let mut row = FeatureRow::new();

    row.insert("station", report.station().map(Station::code));

    let visibility = report.visibility();
    row.insert("visibility_cavok", visibility.is_some_and(|v| v.cavok));
    row.insert("visibility_distance", visibility.and_then(|v| v.distance));

    let clouds = summarize_clouds(report.clouds());
    row.insert("clouds_height", clouds.height);
    row.insert("clouds_amount", clouds.amount.map(CloudCover::code));
    row.insert("clouds_cloud", clouds.cloud.map(CloudType::code));

    let wind = report.wind();
    row.insert("wind_speed", wind.and_then(|w| w.speed));
    row.insert("wind_gust", wind.map(|w| w.gust));
    row.insert("wind_compass", wind.and_then(|w| w.compass).map(Compass::code));

    let weather = report.weather();
    for i in 0..max_weather {
        let group = weather.get(i);
        row.insert(
            format!("weather_{i}_intensity"),
            group.and_then(|w| w.intensity).map(Intensity::code),
        );
        row.insert(
            format!("weather_{i}_descriptor"),
            group.and_then(|w| w.descriptor).map(Descriptor::code),
        );
        row.insert(
            format!("weather_{i}_phenomena"),
            group.and_then(|w| w.phenomena.clone()),
        );
    }

    let flags = WeatherFlags::of(weather);
    row.insert("precipitation", flags.precipitation);
    row.insert("obscuration", flags.obscuration);
    row.insert("other", flags.other);
    row.insert("thunderstorms", flags.thunderstorms);
    row.insert("freezing", flags.freezing);
    row.insert("showers", flags.showers);
    row.insert("snow", flags.snow);
    row.insert("ice", flags.ice);
    row.insert("hail", flags.hail);
    row.insert("fog", flags.fog);
    row.insert("clouds", clouds.cloud.is_some());

    report.specific_columns(&mut row);
    row
}

/// Weather flags accumulated across every group of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherFlags {
    pub precipitation: bool,
    pub obscuration: bool,
    pub other: bool,
    pub thunderstorms: bool,
    pub freezing: bool,
    pub showers: bool,
    pub snow: bool,
    pub ice: bool,
    pub hail: bool,
    pub fog: bool,
}

impl WeatherFlags {
    pub fn of(weather: &[Weather]) -> Self {
        let mut flags = WeatherFlags::default();
        for group in weather {
            match group.descriptor {
                Some(Descriptor::Thunderstorm) => flags.thunderstorms = true,
                Some(Descriptor::Showers) => flags.showers = true,
                Some(Descriptor::Freezing) => flags.freezing = true,
                _ => {}
            }
            for code in group.phenomena_codes() {
                match PhenomenonGroup::of(code) {
                    Some(PhenomenonGroup::Precipitation) => flags.precipitation = true,
                    Some(PhenomenonGroup::Obscuration) => flags.obscuration = true,
                    Some(PhenomenonGroup::Other) => flags.other = true,
                    None => {}
                }
                match code {
                    "SN" | "SG" => flags.snow = true,
                    "IC" | "PL" => flags.ice = true,
                    "GR" | "GS" => flags.hail = true,
                    "FG" => flags.fog = true,
                    _ => {}
                }
            }
        }
        flags
    }
}
