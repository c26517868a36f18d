//! Core data types for decoded reports
//!
//! Quantities are normalised at decode time: metres, metres per second,
//! hPa and degrees Celsius. Report codes keep their encoded spelling when
//! serialized (`"VRB"`, `"BKN"`, `"TEMPO"`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an enum of fixed report codes with lookups in both directions.
macro_rules! report_codes {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $code)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

/// ICAO station identifier (four uppercase letters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Station(String);

impl Station {
    /// Wraps an identifier already matched by the station grammar.
    pub(crate) fn new(code: impl Into<String>) -> Self {
        Station(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Day of month and time of day, without month or year
///
/// Raw values are kept as encoded: hour 24 is legal and is left for
/// [`crate::anchor`] to resolve against a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl Timestamp {
    pub fn new(day: u8, hour: u8, minute: u8) -> Self {
        Timestamp { day, hour, minute }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}Z", self.day, self.hour, self.minute)
    }
}

report_codes! {
    /// 16-point compass, plus `VRB` for variable wind
    Compass {
        North => "N",
        NorthNorthEast => "NNE",
        NorthEast => "NE",
        EastNorthEast => "ENE",
        East => "E",
        EastSouthEast => "ESE",
        SouthEast => "SE",
        SouthSouthEast => "SSE",
        South => "S",
        SouthSouthWest => "SSW",
        SouthWest => "SW",
        WestSouthWest => "WSW",
        West => "W",
        WestNorthWest => "WNW",
        NorthWest => "NW",
        NorthNorthWest => "NNW",
        Variable => "VRB",
    }
}

impl Compass {
    /// Compass points clockwise from north, indexed by `round(degrees / 22.5) % 16`
    pub const POINTS: [Compass; 16] = [
        Compass::North,
        Compass::NorthNorthEast,
        Compass::NorthEast,
        Compass::EastNorthEast,
        Compass::East,
        Compass::EastSouthEast,
        Compass::SouthEast,
        Compass::SouthSouthEast,
        Compass::South,
        Compass::SouthSouthWest,
        Compass::SouthWest,
        Compass::WestSouthWest,
        Compass::West,
        Compass::WestNorthWest,
        Compass::NorthWest,
        Compass::NorthNorthWest,
    ];
}

/// Surface wind, speeds in m/s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// `None` when the speed was reported as `//`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// `None` when the direction was reported as `///`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compass: Option<Compass>,

    /// Zero when no gust group was reported
    #[serde(default)]
    pub gust: f64,
}

/// Extremes of a variable wind direction (`dddVddd`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDirection {
    pub direction_min: Compass,
    pub direction_max: Compass,
}

/// Prevailing visibility in metres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    /// Capped at 9999, `None` when reported as `////`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    pub cavok: bool,
}

impl Visibility {
    pub const MAX_DISTANCE: u32 = 9999;

    pub fn cavok() -> Self {
        Visibility {
            distance: Some(Self::MAX_DISTANCE),
            cavok: true,
        }
    }
}

report_codes! {
    /// Intensity or proximity qualifier of a weather group
    Intensity {
        Light => "-",
        Heavy => "+",
        Vicinity => "VC",
    }
}

report_codes! {
    /// Weather descriptors; at most one per group
    Descriptor {
        NoSignificantWeather => "NSW",
        Shallow => "MI",
        Partial => "PR",
        Patches => "BC",
        LowDrifting => "DR",
        Blowing => "BL",
        Showers => "SH",
        Thunderstorm => "TS",
        Freezing => "FZ",
    }
}

/// Precipitation phenomena codes
pub const PRECIPITATION: &[&str] = &["DZ", "RA", "SN", "SG", "IC", "PL", "GR", "GS", "UP"];

/// Obscuration phenomena codes
pub const OBSCURATION: &[&str] = &["BR", "FG", "FU", "DU", "SA", "HZ"];

/// Other phenomena codes
pub const OTHER_PHENOMENA: &[&str] = &["PY", "VA", "PO", "SQ", "FC", "SS", "DS"];

/// Family a phenomenon code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhenomenonGroup {
    Precipitation,
    Obscuration,
    Other,
}

impl PhenomenonGroup {
    pub fn of(code: &str) -> Option<Self> {
        if PRECIPITATION.contains(&code) {
            Some(PhenomenonGroup::Precipitation)
        } else if OBSCURATION.contains(&code) {
            Some(PhenomenonGroup::Obscuration)
        } else if OTHER_PHENOMENA.contains(&code) {
            Some(PhenomenonGroup::Other)
        } else {
            None
        }
    }
}

/// Present or forecast weather group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Weather {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Descriptor>,

    /// Phenomena codes concatenated in reported order, dominant first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomena: Option<String>,
}

impl Weather {
    /// Two-letter phenomenon codes in reported order
    pub fn phenomena_codes(&self) -> impl Iterator<Item = &str> + '_ {
        // pairs that are not valid UTF-8 on their own are skipped
        self.phenomena
            .as_deref()
            .unwrap_or("")
            .as_bytes()
            .chunks_exact(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
    }

    pub fn has_phenomenon(&self, code: &str) -> bool {
        self.phenomena_codes().any(|c| c == code)
    }
}

report_codes! {
    /// Cloud cover codes, including the sky-state codes that carry no height
    CloudCover {
        NoSignificantCloud => "NSC",
        NilCloudDetected => "NCD",
        SkyClear => "SKC",
        Clear => "CLR",
        NoObservation => "NOBS",
        Few => "FEW",
        Scattered => "SCT",
        Broken => "BKN",
        Overcast => "OVC",
        VerticalVisibility => "VV",
    }
}

impl CloudCover {
    /// Whether the code is a sky state rather than a layer amount
    pub fn is_sky_state(self) -> bool {
        matches!(
            self,
            CloudCover::NoSignificantCloud
                | CloudCover::NilCloudDetected
                | CloudCover::SkyClear
                | CloudCover::Clear
                | CloudCover::NoObservation
        )
    }

    /// Whether a layer of this cover constitutes a ceiling
    pub fn is_ceiling(self) -> bool {
        matches!(
            self,
            CloudCover::Broken | CloudCover::Overcast | CloudCover::VerticalVisibility
        )
    }
}

report_codes! {
    /// Significant convective cloud types
    CloudType {
        Cumulonimbus => "CB",
        ToweringCumulus => "TCU",
    }
}

/// A single cloud layer, height in metres above ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clouds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<CloudCover>,

    /// `None` for sky-state codes and for `///` heights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudType>,
}

report_codes! {
    /// RVR beyond the measurable range: above (`P`) or below (`M`)
    DistancePrefix {
        Above => "P",
        Below => "M",
    }
}

report_codes! {
    /// RVR tendency over the last ten minutes
    Tendency {
        Upward => "U",
        Downward => "D",
        NoChange => "N",
    }
}

/// Runway visual range, distances in metres
///
/// Either `distance` or the `distance_min`/`distance_max` pair is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayVisualRange {
    pub runway: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_prefix: Option<DistancePrefix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_min: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_max: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendency: Option<Tendency>,
}

impl RunwayVisualRange {
    /// Lower bound of the reported range
    pub fn lowest(&self) -> Option<u32> {
        self.distance.or(self.distance_min)
    }

    /// Upper bound of the reported range
    pub fn highest(&self) -> Option<u32> {
        self.distance.or(self.distance_max)
    }
}

/// Air temperature and dew point in °C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperature {
    pub temperature: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dewpoint: Option<i32>,
}

/// QNH in whole hPa, `None` when reported as `////`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pressure(pub Option<u32>);

report_codes! {
    /// Change indicator of a TAF group
    Indicator {
        From => "FM",
        At => "AT",
        Until => "TL",
        Becoming => "BECMG",
        Temporary => "TEMPO",
        Intermittent => "INTER",
    }
}

impl Indicator {
    /// `BECMG` and `FM` groups replace the prevailing conditions;
    /// every other group is a transient overlay.
    pub fn changes_baseline(self) -> bool {
        matches!(self, Indicator::Becoming | Indicator::From)
    }
}

/// Validity window; a missing start means "from now", a missing end
/// means open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
}

impl Validity {
    /// Indicator implied by the shape of the window
    pub fn implied_indicator(&self) -> Option<Indicator> {
        match (self.start_time, self.end_time) {
            (None, Some(_)) => Some(Indicator::Until),
            (Some(_), None) => Some(Indicator::From),
            (Some(start), Some(end)) if start == end => Some(Indicator::At),
            _ => None,
        }
    }
}

/// Probability of a change group, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Probability(pub u8);

/// Forecast maximum or minimum temperature (`TX`/`TN` groups)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureExtreme {
    pub value: i32,
    pub time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_code_lookup() {
        assert_eq!(Compass::from_code("VRB"), Some(Compass::Variable));
        assert_eq!(CloudCover::from_code("BKN"), Some(CloudCover::Broken));
        assert_eq!(Indicator::Becoming.code(), "BECMG");
        assert_eq!(Intensity::from_code("x"), None);
        for cover in CloudCover::ALL {
            assert_eq!(CloudCover::from_code(cover.code()), Some(*cover));
        }
    }

    #[test]
    fn test_vocabularies_are_disjoint() {
        for code in PRECIPITATION.iter().chain(OBSCURATION).chain(OTHER_PHENOMENA) {
            assert!(Descriptor::from_code(code).is_none(), "{code}");
        }
        let total = PRECIPITATION.len() + OBSCURATION.len() + OTHER_PHENOMENA.len();
        let mut all: Vec<_> = PRECIPITATION
            .iter()
            .chain(OBSCURATION)
            .chain(OTHER_PHENOMENA)
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_weather_phenomena_codes() {
        let weather = Weather {
            intensity: Some(Intensity::Light),
            descriptor: Some(Descriptor::Showers),
            phenomena: Some("RASN".to_string()),
        };
        let codes: Vec<_> = weather.phenomena_codes().collect();
        assert_eq!(codes, vec!["RA", "SN"]);
        assert!(weather.has_phenomenon("SN"));
        assert!(!weather.has_phenomenon("AS"));
    }

    #[test]
    fn test_implied_indicator() {
        let t1 = Timestamp::new(5, 14, 0);
        let t2 = Timestamp::new(5, 16, 0);
        let open_start = Validity {
            start_time: None,
            end_time: Some(t1),
        };
        let open_end = Validity {
            start_time: Some(t1),
            end_time: None,
        };
        let instant = Validity {
            start_time: Some(t1),
            end_time: Some(t1),
        };
        let window = Validity {
            start_time: Some(t1),
            end_time: Some(t2),
        };
        assert_eq!(open_start.implied_indicator(), Some(Indicator::Until));
        assert_eq!(open_end.implied_indicator(), Some(Indicator::From));
        assert_eq!(instant.implied_indicator(), Some(Indicator::At));
        assert_eq!(window.implied_indicator(), None);
    }

    #[test]
    fn test_phenomena_codes_with_foreign_text() {
        let weather: Weather = serde_json::from_str(r#"{"phenomena":"aé"}"#).unwrap();
        assert_eq!(weather.phenomena_codes().count(), 0);
        assert!(!weather.has_phenomenon("RA"));

        let weather: Weather = serde_json::from_str(r#"{"phenomena":"TSRAxé"}"#).unwrap();
        assert_eq!(weather.phenomena_codes().collect::<Vec<_>>(), vec!["TS", "RA"]);
    }

    #[test]
    fn test_serde_omits_absent_fields() {
        let clouds = Clouds {
            amount: Some(CloudCover::NoSignificantCloud),
            height: None,
            cloud: None,
        };
        assert_eq!(serde_json::to_string(&clouds).unwrap(), r#"{"amount":"NSC"}"#);

        let wind = Wind {
            speed: None,
            compass: Some(Compass::Variable),
            gust: 0.0,
        };
        assert_eq!(
            serde_json::to_string(&wind).unwrap(),
            r#"{"compass":"VRB","gust":0.0}"#
        );
    }
}
