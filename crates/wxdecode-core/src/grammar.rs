//! Per-field token grammars
//!
//! Every grammar is anchored on the whole token and returns `Ok(None)` when
//! the token does not have its shape. An `Err` only ever comes from a unit
//! code the pattern accepted but the conversion table does not know.
//!
//! Patterns are compiled once, on first use, and never mutated afterwards.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::*;
use crate::units::{compass, convert_distance, convert_pressure, convert_speed, UnitError};

/// Day of month, hour and minute: `DDHHMM`
const TIME_FORMAT: &str = r"(0[1-9]|[12][0-9]|3[01])([01][0-9]|2[0-4])([0-5][0-9]|60)";

/// Day of month and hour: `DDHH`
const HOUR_FORMAT: &str = r"(0[1-9]|[12][0-9]|3[01])([01][0-9]|2[0-4])";

/// Heading in degrees, 000 to 360
const DIRECTION_FORMAT: &str = r"0[0-9][0-9]|[12][0-9][0-9]|3[0-5][0-9]|360";

static STATION_RE: Lazy<Regex> = Lazy::new(|| anchored(r"[A-Z]{4}"));

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| anchored(&format!("{TIME_FORMAT}Z")));

static WIND_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(&format!(
        r"({DIRECTION_FORMAT}|VRB|///)P?([0-9]{{2,3}}|//)(?:GP?([0-9]{{2,3}}))?(KT|MPS|KPH)"
    ))
});

static VARIABLE_DIRECTION_RE: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("({DIRECTION_FORMAT})V({DIRECTION_FORMAT})")));

static VISIBILITY_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(r"(CAVOK)|([0-9]{4})|[PM]?([0-9]{1,2})?(?:([1357])/(2|4|8|16))?SM|(////)")
});

static WEATHER_RE: Lazy<Regex> = Lazy::new(|| {
    let descriptors = codes(Descriptor::ALL.iter().map(|d| d.code()));
    let phenomena = codes(
        PRECIPITATION
            .iter()
            .chain(OBSCURATION)
            .chain(OTHER_PHENOMENA)
            .copied(),
    );
    anchored(&format!(r"([-+]|VC)?({descriptors})?((?:{phenomena}){{0,3}})"))
});

static CLOUDS_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(r"(NSC|NCD|CLR|SKC|NOBS)|(VV|FEW|SCT|BKN|OVC|///)([0-9]{3}|///)(CB|TCU|///)?")
});

static RVR_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(r"R([0-9]{2}[LCR]?)/(?:[PM]?([0-9]{4})V)?([PM])?([0-9]{4})(FT)?/?([UDN])?")
});

static TEMPERATURE_RE: Lazy<Regex> = Lazy::new(|| anchored(r"(M?[0-9]{2})/(M?[0-9]{2}|XX)?"));

static PRESSURE_RE: Lazy<Regex> = Lazy::new(|| anchored(r"([QA])(////|[0-9]{4})"));

static VALIDITY_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(&format!(
        "(AT|FM|TL){TIME_FORMAT}|{HOUR_FORMAT}/{HOUR_FORMAT}"
    ))
});

static PROBABILITY_RE: Lazy<Regex> = Lazy::new(|| anchored(r"PROB([0-9]{2})"));

static TEMPERATURE_EXTREME_RE: Lazy<Regex> =
    Lazy::new(|| anchored(&format!(r"T([XN])(M?[0-9]{{2}})/{HOUR_FORMAT}Z")));

/// Compile a whole-token pattern from one of the literal tables above
fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})$")).unwrap_or_else(|e| panic!("invalid grammar: {e}"))
}

fn codes<'a>(codes: impl Iterator<Item = &'a str>) -> String {
    codes.collect::<Vec<_>>().join("|")
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// `M`-prefixed two digit temperature
fn signed_temperature(raw: &str) -> Option<i32> {
    match raw.strip_prefix('M') {
        Some(digits) => digits.parse::<i32>().ok().map(|v| -v),
        None => raw.parse().ok(),
    }
}

/// A value decodable from a single report token
pub trait Decode: Sized {
    fn decode(token: &str) -> Result<Option<Self>, UnitError>;
}

impl Decode for Station {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        Ok(STATION_RE.is_match(token).then(|| Station::new(token)))
    }
}

impl Decode for Timestamp {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        Ok(TIMESTAMP_RE.captures(token).and_then(|caps| {
            Some(Timestamp::new(
                number(&caps, 1)?,
                number(&caps, 2)?,
                number(&caps, 3)?,
            ))
        }))
    }
}

impl Decode for Wind {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = WIND_RE.captures(token) else {
            return Ok(None);
        };
        let unit = &caps[4];

        let speed = match number::<u16>(&caps, 2) {
            Some(knots) => Some(convert_speed(f64::from(knots), unit)?),
            None => None,
        };

        let compass = match &caps[1] {
            "VRB" => Some(Compass::Variable),
            "///" => None,
            heading => match heading.parse::<u16>() {
                Ok(degrees) => Some(compass(degrees)?),
                Err(_) => None,
            },
        };

        let gust = match number::<u16>(&caps, 3) {
            Some(gust) => convert_speed(f64::from(gust), unit)?,
            None => 0.0,
        };

        Ok(Some(Wind {
            speed,
            compass,
            gust,
        }))
    }
}

impl Decode for VariableDirection {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = VARIABLE_DIRECTION_RE.captures(token) else {
            return Ok(None);
        };
        let (Some(min), Some(max)) = (number::<u16>(&caps, 1), number::<u16>(&caps, 2)) else {
            return Ok(None);
        };
        Ok(Some(VariableDirection {
            direction_min: compass(min)?,
            direction_max: compass(max)?,
        }))
    }
}

impl Decode for Visibility {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = VISIBILITY_RE.captures(token) else {
            return Ok(None);
        };

        if caps.get(1).is_some() {
            return Ok(Some(Visibility::cavok()));
        }
        if caps.get(6).is_some() {
            return Ok(Some(Visibility {
                distance: None,
                cavok: false,
            }));
        }

        let distance = if let Some(metres) = number::<u32>(&caps, 2) {
            metres
        } else {
            let whole = number::<u32>(&caps, 3);
            let fraction = number::<u32>(&caps, 4).zip(number::<u32>(&caps, 5));
            if whole.is_none() && fraction.is_none() {
                // a bare "SM" carries no distance at all
                return Ok(None);
            }
            let mut miles = f64::from(whole.unwrap_or(0));
            if let Some((numerator, denominator)) = fraction {
                miles += f64::from(numerator) / f64::from(denominator);
            }
            convert_distance(miles, "SM")?
        };

        Ok(Some(Visibility {
            distance: Some(distance.min(Visibility::MAX_DISTANCE)),
            cavok: false,
        }))
    }
}

impl Decode for Weather {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = WEATHER_RE.captures(token) else {
            return Ok(None);
        };
        let descriptor = caps.get(2).and_then(|m| Descriptor::from_code(m.as_str()));
        let phenomena = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        if descriptor.is_none() && phenomena.is_none() {
            return Ok(None);
        }

        Ok(Some(Weather {
            intensity: caps.get(1).and_then(|m| Intensity::from_code(m.as_str())),
            descriptor,
            phenomena,
        }))
    }
}

impl Decode for Clouds {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = CLOUDS_RE.captures(token) else {
            return Ok(None);
        };

        if let Some(state) = caps.get(1) {
            return Ok(Some(Clouds {
                amount: CloudCover::from_code(state.as_str()),
                height: None,
                cloud: None,
            }));
        }

        let height = match number::<u32>(&caps, 3) {
            Some(hundreds) => Some(convert_distance(f64::from(hundreds * 100), "FT")?),
            None => None,
        };

        Ok(Some(Clouds {
            amount: caps.get(2).and_then(|m| CloudCover::from_code(m.as_str())),
            height,
            cloud: caps.get(4).and_then(|m| CloudType::from_code(m.as_str())),
        }))
    }
}

impl Decode for RunwayVisualRange {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = RVR_RE.captures(token) else {
            return Ok(None);
        };
        let unit = caps.get(5).map_or("M", |m| m.as_str());
        let Some(reported) = number::<u32>(&caps, 4) else {
            return Ok(None);
        };
        let reported = convert_distance(f64::from(reported), unit)?;

        let (distance, distance_min, distance_max) = match number::<u32>(&caps, 2) {
            Some(min) => (None, Some(convert_distance(f64::from(min), unit)?), Some(reported)),
            None => (Some(reported), None, None),
        };

        Ok(Some(RunwayVisualRange {
            runway: caps[1].to_string(),
            distance,
            distance_prefix: caps.get(3).and_then(|m| DistancePrefix::from_code(m.as_str())),
            distance_min,
            distance_max,
            tendency: caps.get(6).and_then(|m| Tendency::from_code(m.as_str())),
        }))
    }
}

impl Decode for Temperature {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = TEMPERATURE_RE.captures(token) else {
            return Ok(None);
        };
        let Some(temperature) = signed_temperature(&caps[1]) else {
            return Ok(None);
        };
        let dewpoint = caps
            .get(2)
            .filter(|m| m.as_str() != "XX")
            .and_then(|m| signed_temperature(m.as_str()));

        Ok(Some(Temperature {
            temperature,
            dewpoint,
        }))
    }
}

impl Decode for Pressure {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = PRESSURE_RE.captures(token) else {
            return Ok(None);
        };
        let unit = &caps[1];
        let hpa = match number::<u32>(&caps, 2) {
            Some(raw) if unit == "A" => Some(convert_pressure(f64::from(raw) / 100.0, unit)?),
            Some(raw) => Some(convert_pressure(f64::from(raw), unit)?),
            None => None,
        };
        Ok(Some(Pressure(hpa)))
    }
}

impl Decode for Validity {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        let Some(caps) = VALIDITY_RE.captures(token) else {
            return Ok(None);
        };

        let validity = match caps.get(1).map(|m| m.as_str()) {
            Some(kind) => {
                let time = Timestamp::new(
                    number(&caps, 2).unwrap_or_default(),
                    number(&caps, 3).unwrap_or_default(),
                    number(&caps, 4).unwrap_or_default(),
                );
                match kind {
                    "FM" => Validity {
                        start_time: Some(time),
                        end_time: None,
                    },
                    "TL" => Validity {
                        start_time: None,
                        end_time: Some(time),
                    },
                    _ => Validity {
                        start_time: Some(time),
                        end_time: Some(time),
                    },
                }
            }
            None => Validity {
                start_time: Some(Timestamp::new(
                    number(&caps, 5).unwrap_or_default(),
                    number(&caps, 6).unwrap_or_default(),
                    0,
                )),
                end_time: Some(Timestamp::new(
                    number(&caps, 7).unwrap_or_default(),
                    number(&caps, 8).unwrap_or_default(),
                    0,
                )),
            },
        };

        Ok(Some(validity))
    }
}

impl Decode for Probability {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        Ok(PROBABILITY_RE
            .captures(token)
            .and_then(|caps| number(&caps, 1))
            .map(Probability))
    }
}

impl Decode for Indicator {
    fn decode(token: &str) -> Result<Option<Self>, UnitError> {
        Ok(Indicator::from_code(token))
    }
}

/// Which end of the forecast temperature range a `TX`/`TN` group reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

impl TemperatureExtreme {
    /// Decode a `TX`/`TN` group, keeping it only when it reports `extreme`
    pub fn decode_extreme(token: &str, extreme: Extreme) -> Option<Self> {
        let caps = TEMPERATURE_EXTREME_RE.captures(token)?;
        let wanted = match extreme {
            Extreme::Max => "X",
            Extreme::Min => "N",
        };
        if &caps[1] != wanted {
            return None;
        }
        Some(TemperatureExtreme {
            value: signed_temperature(&caps[2])?,
            time: Timestamp::new(number(&caps, 3)?, number(&caps, 4)?, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: Decode>(token: &str) -> Option<T> {
        T::decode(token).unwrap()
    }

    #[test]
    fn test_station() {
        assert_eq!(decode::<Station>("LEGE").unwrap().code(), "LEGE");
        assert!(decode::<Station>("LEG").is_none());
        assert!(decode::<Station>("lege").is_none());
        assert!(decode::<Station>("METAR").is_none());
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(
            decode::<Timestamp>("050500Z"),
            Some(Timestamp::new(5, 5, 0))
        );
        assert_eq!(
            decode::<Timestamp>("312400Z"),
            Some(Timestamp::new(31, 24, 0))
        );
        assert!(decode::<Timestamp>("050500").is_none());
        assert!(decode::<Timestamp>("320500Z").is_none());
        assert!(decode::<Timestamp>("052500Z").is_none());
        // minute 60 is kept raw, like hour 24
        assert_eq!(
            decode::<Timestamp>("051060Z"),
            Some(Timestamp::new(5, 10, 60))
        );
        assert!(decode::<Timestamp>("050561Z").is_none());
    }

    #[test]
    fn test_wind_with_gust() {
        let wind = decode::<Wind>("35010G20KT").unwrap();
        assert_eq!(wind.speed, Some(5.14));
        assert_eq!(wind.gust, 10.29);
        assert_eq!(wind.compass, Some(Compass::North));
    }

    #[test]
    fn test_wind_variants() {
        let wind = decode::<Wind>("VRB04KT").unwrap();
        assert_eq!(wind.compass, Some(Compass::Variable));
        assert_eq!(wind.speed, Some(2.06));
        assert_eq!(wind.gust, 0.0);

        let wind = decode::<Wind>("/////KT").unwrap();
        assert_eq!(wind.compass, None);
        assert_eq!(wind.speed, None);

        let wind = decode::<Wind>("270P49MPS").unwrap();
        assert_eq!(wind.compass, Some(Compass::West));
        assert_eq!(wind.speed, Some(49.0));

        let wind = decode::<Wind>("09036GP50KPH").unwrap();
        assert_eq!(wind.speed, Some(10.0));
        assert_eq!(wind.gust, 13.89);

        assert!(decode::<Wind>("37010KT").is_none());
        assert!(decode::<Wind>("35010MPH").is_none());
        assert!(decode::<Wind>("35010").is_none());
    }

    #[test]
    fn test_variable_direction() {
        let vd = decode::<VariableDirection>("320V030").unwrap();
        assert_eq!(vd.direction_min, Compass::NorthWest);
        assert_eq!(vd.direction_max, Compass::NorthNorthEast);
        assert!(decode::<VariableDirection>("320V").is_none());
    }

    #[test]
    fn test_visibility() {
        assert_eq!(decode::<Visibility>("CAVOK"), Some(Visibility::cavok()));
        assert_eq!(
            decode::<Visibility>("0800").unwrap().distance,
            Some(800)
        );
        assert_eq!(decode::<Visibility>("1/2SM").unwrap().distance, Some(805));
        assert_eq!(decode::<Visibility>("3/4SM").unwrap().distance, Some(1207));
        assert_eq!(decode::<Visibility>("1SM").unwrap().distance, Some(1609));
        assert_eq!(decode::<Visibility>("11/2SM").unwrap().distance, Some(2414));
        assert_eq!(decode::<Visibility>("M1/4SM").unwrap().distance, Some(402));
        assert_eq!(decode::<Visibility>("P6SM").unwrap().distance, Some(9999));
        assert_eq!(decode::<Visibility>("10SM").unwrap().distance, Some(9999));

        let unknown = decode::<Visibility>("////").unwrap();
        assert_eq!(unknown.distance, None);
        assert!(!unknown.cavok);

        assert!(decode::<Visibility>("SM").is_none());
        assert!(decode::<Visibility>("080").is_none());
    }

    #[test]
    fn test_weather() {
        let weather = decode::<Weather>("-SHRA").unwrap();
        assert_eq!(weather.intensity, Some(Intensity::Light));
        assert_eq!(weather.descriptor, Some(Descriptor::Showers));
        assert_eq!(weather.phenomena.as_deref(), Some("RA"));

        let weather = decode::<Weather>("+TSRAGR").unwrap();
        assert_eq!(weather.intensity, Some(Intensity::Heavy));
        assert_eq!(weather.descriptor, Some(Descriptor::Thunderstorm));
        assert_eq!(weather.phenomena.as_deref(), Some("RAGR"));

        let weather = decode::<Weather>("VCSH").unwrap();
        assert_eq!(weather.intensity, Some(Intensity::Vicinity));
        assert_eq!(weather.phenomena, None);

        let weather = decode::<Weather>("NSW").unwrap();
        assert_eq!(weather.descriptor, Some(Descriptor::NoSignificantWeather));
    }

    #[test]
    fn test_weather_keeps_reported_order() {
        let weather = decode::<Weather>("SNRA").unwrap();
        assert_eq!(weather.phenomena.as_deref(), Some("SNRA"));
        let weather = decode::<Weather>("RASNBR").unwrap();
        assert_eq!(weather.phenomena.as_deref(), Some("RASNBR"));
    }

    #[test]
    fn test_weather_rejects() {
        assert!(decode::<Weather>("-").is_none());
        assert!(decode::<Weather>("RASNBRFG").is_none());
        assert!(decode::<Weather>("RATS").is_none());
        assert!(decode::<Weather>("LEGE").is_none());
        assert!(decode::<Weather>("").is_none());
    }

    #[test]
    fn test_clouds() {
        let layer = decode::<Clouds>("BKN025CB").unwrap();
        assert_eq!(layer.amount, Some(CloudCover::Broken));
        assert_eq!(layer.height, Some(762));
        assert_eq!(layer.cloud, Some(CloudType::Cumulonimbus));

        let layer = decode::<Clouds>("NSC").unwrap();
        assert_eq!(layer.amount, Some(CloudCover::NoSignificantCloud));
        assert_eq!(layer.height, None);

        let layer = decode::<Clouds>("VV///").unwrap();
        assert_eq!(layer.amount, Some(CloudCover::VerticalVisibility));
        assert_eq!(layer.height, None);

        let layer = decode::<Clouds>("//////TCU").unwrap();
        assert_eq!(layer.amount, None);
        assert_eq!(layer.height, None);
        assert_eq!(layer.cloud, Some(CloudType::ToweringCumulus));

        let layer = decode::<Clouds>("FEW000").unwrap();
        assert_eq!(layer.height, Some(0));

        assert!(decode::<Clouds>("BKN25").is_none());
        assert!(decode::<Clouds>("NSC015").is_none());
    }

    #[test]
    fn test_runway_visual_range() {
        let rvr = decode::<RunwayVisualRange>("R24/P2000N").unwrap();
        assert_eq!(rvr.runway, "24");
        assert_eq!(rvr.distance, Some(2000));
        assert_eq!(rvr.distance_prefix, Some(DistancePrefix::Above));
        assert_eq!(rvr.tendency, Some(Tendency::NoChange));
        assert_eq!(rvr.distance_min, None);

        let rvr = decode::<RunwayVisualRange>("R06L/0600V1000FT/U").unwrap();
        assert_eq!(rvr.runway, "06L");
        assert_eq!(rvr.distance, None);
        assert_eq!(rvr.distance_min, Some(183));
        assert_eq!(rvr.distance_max, Some(305));
        assert_eq!(rvr.tendency, Some(Tendency::Upward));

        let rvr = decode::<RunwayVisualRange>("R10/M0050").unwrap();
        assert_eq!(rvr.distance, Some(50));
        assert_eq!(rvr.distance_prefix, Some(DistancePrefix::Below));
        assert_eq!(rvr.tendency, None);

        assert!(decode::<RunwayVisualRange>("R1/0600").is_none());
    }

    #[test]
    fn test_temperature() {
        let t = decode::<Temperature>("M05/M12").unwrap();
        assert_eq!(t.temperature, -5);
        assert_eq!(t.dewpoint, Some(-12));

        let t = decode::<Temperature>("22/XX").unwrap();
        assert_eq!(t.temperature, 22);
        assert_eq!(t.dewpoint, None);

        let t = decode::<Temperature>("08/").unwrap();
        assert_eq!(t.dewpoint, None);

        assert!(decode::<Temperature>("8/5").is_none());
    }

    #[test]
    fn test_pressure() {
        assert_eq!(decode::<Pressure>("Q1013"), Some(Pressure(Some(1013))));
        assert_eq!(decode::<Pressure>("A2992"), Some(Pressure(Some(1013))));
        assert_eq!(decode::<Pressure>("Q////"), Some(Pressure(None)));
        assert!(decode::<Pressure>("Q101").is_none());
    }

    #[test]
    fn test_validity() {
        let v = decode::<Validity>("0506/0606").unwrap();
        assert_eq!(v.start_time, Some(Timestamp::new(5, 6, 0)));
        assert_eq!(v.end_time, Some(Timestamp::new(6, 6, 0)));

        let v = decode::<Validity>("0512/0524").unwrap();
        assert_eq!(v.end_time, Some(Timestamp::new(5, 24, 0)));

        let v = decode::<Validity>("FM051230").unwrap();
        assert_eq!(v.start_time, Some(Timestamp::new(5, 12, 30)));
        assert_eq!(v.end_time, None);

        let v = decode::<Validity>("TL051600").unwrap();
        assert_eq!(v.start_time, None);
        assert_eq!(v.end_time, Some(Timestamp::new(5, 16, 0)));

        let v = decode::<Validity>("AT051600").unwrap();
        assert_eq!(v.start_time, v.end_time);

        assert!(decode::<Validity>("FM0512").is_none());
        assert!(decode::<Validity>("0506/06").is_none());
        assert!(decode::<Validity>("0506/0606Z").is_none());
    }

    #[test]
    fn test_probability_and_indicator() {
        assert_eq!(decode::<Probability>("PROB30"), Some(Probability(30)));
        assert!(decode::<Probability>("PROB3").is_none());
        assert_eq!(decode::<Indicator>("TEMPO"), Some(Indicator::Temporary));
        assert_eq!(decode::<Indicator>("BECMG"), Some(Indicator::Becoming));
        assert!(decode::<Indicator>("FM051200").is_none());
    }

    #[test]
    fn test_temperature_extremes() {
        let max = TemperatureExtreme::decode_extreme("TX25/0514Z", Extreme::Max).unwrap();
        assert_eq!(max.value, 25);
        assert_eq!(max.time, Timestamp::new(5, 14, 0));
        let min = TemperatureExtreme::decode_extreme("TNM02/0606Z", Extreme::Min).unwrap();
        assert_eq!(min.value, -2);
        assert!(TemperatureExtreme::decode_extreme("TX25/0514Z", Extreme::Min).is_none());
    }
}
