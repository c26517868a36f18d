//! METAR surface observations

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binder::{bind, sanitize, tokenize, FieldSpec, Grammar, Schema};
use crate::types::*;
use crate::DecodeError;

/// Field order of a METAR body; the station doubles as the header
pub const METAR_SCHEMA: &Schema = &[
    FieldSpec::scalar("station", Grammar::Station),
    FieldSpec::scalar("time", Grammar::Timestamp),
    FieldSpec::scalar("wind", Grammar::Wind),
    FieldSpec::scalar("variable_direction", Grammar::VariableDirection),
    FieldSpec::scalar("visibility", Grammar::Visibility),
    FieldSpec::repeated("runway_info", Grammar::RunwayVisualRange),
    FieldSpec::repeated("weather", Grammar::Weather),
    FieldSpec::repeated("clouds", Grammar::Clouds),
    FieldSpec::scalar("temperature", Grammar::Temperature),
    FieldSpec::scalar("pressure", Grammar::Pressure),
];

/// Decoded METAR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metar {
    pub station: Station,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_direction: Option<VariableDirection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runway_info: Vec<RunwayVisualRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weather: Vec<Weather>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clouds: Vec<Clouds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<Pressure>,

    /// Tokens the decoder could not place
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
}

impl Metar {
    /// Decode a raw observation line
    pub fn from_text(text: &str) -> Result<Self, DecodeError> {
        let sanitized = sanitize(text);
        let tokens = tokenize(&sanitized);
        let mut binding = bind(METAR_SCHEMA, tokens.iter().map(String::as_str))?;

        let station = binding
            .take::<Station>("station")
            .ok_or_else(|| DecodeError::MissingStation(sanitized.clone()))?;

        let metar = Metar {
            time: binding.take("time"),
            wind: binding.take("wind"),
            variable_direction: binding.take("variable_direction"),
            visibility: binding.take("visibility"),
            runway_info: binding.take_all("runway_info"),
            weather: binding.take_all("weather"),
            clouds: binding.take_all("clouds"),
            temperature: binding.take("temperature"),
            pressure: binding.take("pressure"),
            unmatched: binding.into_unmatched(),
            station,
        };
        debug!(
            station = %metar.station,
            unmatched = metar.unmatched.len(),
            "decoded METAR"
        );
        Ok(metar)
    }
}
