//! TAF terminal forecasts
//!
//! A TAF is a header (`[PROV] TAF [AMD|COR] CCCC DDHHMMZ`) followed by the
//! prevailing forecast and any number of change groups. The body is cut in
//! front of every change marker and each piece is bound against
//! [`FORECAST_SCHEMA`] on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binder::{bind, sanitize, tokenize, FieldSpec, Grammar, Schema};
use crate::grammar::Decode;
use crate::types::*;
use crate::DecodeError;

/// Field order of a forecast segment
pub const FORECAST_SCHEMA: &Schema = &[
    FieldSpec::scalar("probability", Grammar::Probability),
    FieldSpec::scalar("indicator", Grammar::Indicator),
    FieldSpec::scalar("validity", Grammar::Validity),
    FieldSpec::scalar("wind", Grammar::Wind),
    FieldSpec::scalar("visibility", Grammar::Visibility),
    FieldSpec::repeated("weather", Grammar::Weather),
    FieldSpec::repeated("clouds", Grammar::Clouds),
    FieldSpec::scalar("max_temperature", Grammar::MaxTemperature),
    FieldSpec::scalar("min_temperature", Grammar::MinTemperature),
];

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:PROV )?TAF (?:(?:AMD|COR) )?([A-Z]{4}) ([0-9]{6}Z)(?: |$)")
        .unwrap_or_else(|e| panic!("invalid grammar: {e}"))
});

/// Change-group markers, most specific alternative first
static CHANGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:PROB[0-9]{2} (?:TEMPO|INTER)|PROB[0-9]{2}|TEMPO|INTER|BECMG|FM[0-9]{4}|AT[0-9]{4}|TL[0-9]{4})",
    )
    .unwrap_or_else(|e| panic!("invalid grammar: {e}"))
});

/// One forecast period: the prevailing conditions or a change group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<Probability>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<Indicator>,

    pub validity: Validity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weather: Vec<Weather>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clouds: Vec<Clouds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temperature: Option<TemperatureExtreme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_temperature: Option<TemperatureExtreme>,

    /// Tokens the decoder could not place
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
}

impl Forecast {
    /// Build a forecast around its validity window
    ///
    /// A missing indicator is inferred from the shape of the window.
    pub fn new(validity: Validity, indicator: Option<Indicator>) -> Self {
        Forecast {
            probability: None,
            indicator: indicator.or_else(|| validity.implied_indicator()),
            validity,
            wind: None,
            visibility: None,
            weather: Vec::new(),
            clouds: Vec::new(),
            max_temperature: None,
            min_temperature: None,
            unmatched: Vec::new(),
        }
    }

    /// Decode a single change-group segment
    pub fn from_text(segment: &str) -> Result<Self, DecodeError> {
        Self::decode_segment(segment, true)
    }

    /// Decode a segment, inferring a missing indicator only when asked to
    fn decode_segment(segment: &str, infer_indicator: bool) -> Result<Self, DecodeError> {
        let tokens = tokenize(segment);
        let mut binding = bind(FORECAST_SCHEMA, tokens.iter().map(String::as_str))?;

        let Some(validity) = binding.take::<Validity>("validity") else {
            return Err(DecodeError::MissingValidity(segment.trim().to_string()));
        };
        let indicator = binding.take::<Indicator>("indicator");
        let inferred = if infer_indicator {
            indicator.or_else(|| validity.implied_indicator())
        } else {
            indicator
        };

        Ok(Forecast {
            indicator: inferred,
            probability: binding.take("probability"),
            wind: binding.take("wind"),
            visibility: binding.take("visibility"),
            weather: binding.take_all("weather"),
            clouds: binding.take_all("clouds"),
            max_temperature: binding.take("max_temperature"),
            min_temperature: binding.take("min_temperature"),
            unmatched: binding.into_unmatched(),
            ..Forecast::new(validity, indicator)
        })
    }
}

/// Decoded TAF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taf {
    pub station: Station,
    pub time: Timestamp,
    /// Prevailing forecast first, change groups after it in report order
    pub forecasts: Vec<Forecast>,
}

impl Taf {
    /// Decode a raw bulletin
    ///
    /// Text that does not open with a TAF header is rejected outright.
    pub fn from_text(text: &str) -> Result<Self, DecodeError> {
        let sanitized = sanitize(text);
        let caps = HEADER_RE
            .captures(&sanitized)
            .ok_or_else(|| DecodeError::NotATaf(text.trim().to_string()))?;

        let station = Station::decode(&caps[1])?;
        let time = Timestamp::decode(&caps[2])?;
        let (Some(station), Some(time)) = (station, time) else {
            return Err(DecodeError::NotATaf(text.trim().to_string()));
        };

        let body = &sanitized[caps.get(0).map_or(0, |m| m.end())..];
        // the prevailing forecast never carries an inferred indicator
        let forecasts = segments(body)
            .into_iter()
            .enumerate()
            .map(|(index, segment)| Forecast::decode_segment(segment, index > 0))
            .collect::<Result<Vec<_>, _>>()?;

        if forecasts.is_empty() {
            return Err(DecodeError::EmptyTaf(station.code().to_string()));
        }

        debug!(%station, forecasts = forecasts.len(), "decoded TAF");
        Ok(Taf {
            station,
            time,
            forecasts,
        })
    }
}

/// Cut a TAF body in front of every change-group marker
///
/// Blank pieces (a body opening with a marker) are skipped.
pub fn segments(body: &str) -> Vec<&str> {
    let mut cuts: Vec<usize> = CHANGE_MARKER_RE.find_iter(body).map(|m| m.start()).collect();
    cuts.push(body.len());

    let mut pieces = Vec::with_capacity(cuts.len());
    let mut start = 0;
    for end in cuts {
        let piece = body[start..end].trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        start = end;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGE: &str = "TAF LEGE 050500Z 0506/0606 02008KT CAVOK BECMG 0514/0516 VRB04KT";

    #[test]
    fn test_two_segments() {
        let taf = Taf::from_text(LEGE).unwrap();
        assert_eq!(taf.station.code(), "LEGE");
        assert_eq!(taf.time, Timestamp::new(5, 5, 0));
        assert_eq!(taf.forecasts.len(), 2);

        let prevailing = &taf.forecasts[0];
        assert_eq!(prevailing.indicator, None);
        assert_eq!(prevailing.validity.start_time, Some(Timestamp::new(5, 6, 0)));
        assert_eq!(prevailing.validity.end_time, Some(Timestamp::new(6, 6, 0)));
        let wind = prevailing.wind.as_ref().unwrap();
        assert_eq!(wind.compass, Some(Compass::NorthNorthEast));
        assert_eq!(wind.speed, Some(4.12));
        assert!(prevailing.visibility.unwrap().cavok);

        let becmg = &taf.forecasts[1];
        assert_eq!(becmg.indicator, Some(Indicator::Becoming));
        assert_eq!(becmg.validity.start_time, Some(Timestamp::new(5, 14, 0)));
        assert_eq!(becmg.validity.end_time, Some(Timestamp::new(5, 16, 0)));
        let wind = becmg.wind.as_ref().unwrap();
        assert_eq!(wind.compass, Some(Compass::Variable));
        assert_eq!(wind.speed, Some(2.06));
        assert!(becmg.visibility.is_none());
    }

    #[test]
    fn test_segments_markers() {
        let body = "0506/0606 02008KT CAVOK PROB30 TEMPO 0510/0512 4000 BR FM051800 27015KT TL0600 BECMG 0520/0522 NSC";
        let pieces = segments(body);
        assert_eq!(
            pieces,
            vec![
                "0506/0606 02008KT CAVOK",
                "PROB30 TEMPO 0510/0512 4000 BR",
                "FM051800 27015KT",
                "TL0600",
                "BECMG 0520/0522 NSC",
            ]
        );
    }

    #[test]
    fn test_segments_less_common_markers() {
        let body = "0506/0606 02008KT CAVOK INTER 0508/0510 3000 PROB40 INTER 0512/0514 TSRA PROB30 0516/0518 BR AT0520 NSC";
        assert_eq!(
            segments(body),
            vec![
                "0506/0606 02008KT CAVOK",
                "INTER 0508/0510 3000",
                "PROB40 INTER 0512/0514 TSRA",
                "PROB30 0516/0518 BR",
                "AT0520 NSC",
            ]
        );
    }

    #[test]
    fn test_split_miles_in_from_group() {
        let taf = Taf::from_text(
            "TAF KJFK 051130Z 0512/0618 18010KT P6SM SCT040 FM052000 22015KT 1 1/2SM -SN BKN010",
        )
        .unwrap();
        let from = &taf.forecasts[1];
        assert_eq!(from.visibility.unwrap().distance, Some(2414));
        assert_eq!(from.weather[0].phenomena.as_deref(), Some("SN"));
        assert!(from.unmatched.is_empty());
    }

    #[test]
    fn test_prevailing_window_is_never_inferred() {
        let taf = Taf::from_text("TAF LEGE 050500Z 0506/0506 02008KT CAVOK TEMPO 0510/0510 4000")
            .unwrap();
        assert_eq!(taf.forecasts[0].indicator, None);
        assert_eq!(taf.forecasts[1].indicator, Some(Indicator::Temporary));
        assert_eq!(
            Forecast::from_text("0506/0506 02008KT").unwrap().indicator,
            Some(Indicator::At)
        );
    }

    #[test]
    fn test_probability_tempo_is_one_group() {
        let taf = Taf::from_text(
            "TAF AMD LPPT 051100Z 0512/0618 32010KT 9999 FEW020 PROB40 TEMPO 0512/0516 3000 -RA",
        )
        .unwrap();
        assert_eq!(taf.forecasts.len(), 2);
        let tempo = &taf.forecasts[1];
        assert_eq!(tempo.probability, Some(Probability(40)));
        assert_eq!(tempo.indicator, Some(Indicator::Temporary));
        assert_eq!(tempo.visibility.unwrap().distance, Some(3000));
        assert_eq!(tempo.weather[0].intensity, Some(Intensity::Light));
    }

    #[test]
    fn test_from_group_infers_indicator() {
        let taf = Taf::from_text(
            "TAF KJFK 051130Z 0512/0618 18010KT P6SM SCT040 FM052000 22015G25KT 5SM -SHRA BKN030",
        )
        .unwrap();
        let from = &taf.forecasts[1];
        assert_eq!(from.indicator, Some(Indicator::From));
        assert_eq!(from.validity.start_time, Some(Timestamp::new(5, 20, 0)));
        assert_eq!(from.validity.end_time, None);
        assert_eq!(from.visibility.unwrap().distance, Some(8047));
    }

    #[test]
    fn test_multiline_bulletin_with_extremes() {
        let taf = Taf::from_text(
            "PROV TAF EGLL 051700Z 0518/0624 24012KT 9999 SCT030\n  TX15/0614Z TN06/0605Z\n  TEMPO 0518/0522 RA=",
        )
        .unwrap();
        let prevailing = &taf.forecasts[0];
        assert_eq!(prevailing.max_temperature.unwrap().value, 15);
        assert_eq!(prevailing.min_temperature.unwrap().value, 6);
        assert_eq!(prevailing.validity.end_time, Some(Timestamp::new(6, 24, 0)));
        assert_eq!(taf.forecasts[1].weather[0].phenomena.as_deref(), Some("RA"));
    }

    #[test]
    fn test_header_is_mandatory() {
        let err = Taf::from_text("LEGE 050500Z 0506/0606 02008KT CAVOK").unwrap_err();
        assert!(matches!(err, DecodeError::NotATaf(_)));
        assert!(err.to_string().contains("LEGE 050500Z"));

        assert!(Taf::from_text("METAR LEGE 050500Z 02008KT").is_err());
        assert!(Taf::from_text("TAF LEGE 0505Z 0506/0606").is_err());
    }

    #[test]
    fn test_forecast_without_validity_fails() {
        assert!(matches!(
            Forecast::from_text("BECMG 27015KT"),
            Err(DecodeError::MissingValidity(_))
        ));
        assert!(matches!(
            Taf::from_text("TAF LEGE 050500Z NIL"),
            Err(DecodeError::MissingValidity(_))
        ));
        assert!(matches!(
            Taf::from_text("TAF LEGE 050500Z"),
            Err(DecodeError::EmptyTaf(_))
        ));
    }
}
