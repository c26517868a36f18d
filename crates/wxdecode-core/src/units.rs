//! Unit conversion utilities
//!
//! Everything decoded from a report is normalised here: speeds to m/s,
//! distances to metres, pressures to hPa and headings to compass points.

use crate::types::Compass;

/// Unit conversion error
///
/// Grammars only hand over unit codes their patterns accept, so any of
/// these surfacing means a grammar table and this module disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown speed unit {0}. Speed unit must be KT, KPH or MPS")]
    UnknownSpeedUnit(String),

    #[error("Unknown distance unit {0}. Distance unit must be FT, SM or M")]
    UnknownDistanceUnit(String),

    #[error("Unknown pressure unit {0}. Pressure unit must be A or Q")]
    UnknownPressureUnit(String),

    #[error("Wind direction must be within 0..=360 degrees, got {0}")]
    DirectionOutOfRange(u16),
}

/// Speed units found in wind groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedUnit {
    Knots,
    MetersPerSecond,
    KilometersPerHour,
}

impl SpeedUnit {
    pub fn from_code(code: &str) -> Result<Self, UnitError> {
        match code {
            "KT" => Ok(SpeedUnit::Knots),
            "MPS" => Ok(SpeedUnit::MetersPerSecond),
            "KPH" => Ok(SpeedUnit::KilometersPerHour),
            other => Err(UnitError::UnknownSpeedUnit(other.to_string())),
        }
    }

    /// Multiplier to metres per second
    pub fn factor(self) -> f64 {
        match self {
            SpeedUnit::Knots => 0.514444,
            SpeedUnit::MetersPerSecond => 1.0,
            SpeedUnit::KilometersPerHour => 0.277778,
        }
    }
}

/// Distance units found in visibility, cloud and RVR groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceUnit {
    Feet,
    StatuteMiles,
    Meters,
}

impl DistanceUnit {
    pub fn from_code(code: &str) -> Result<Self, UnitError> {
        match code {
            "FT" => Ok(DistanceUnit::Feet),
            "SM" => Ok(DistanceUnit::StatuteMiles),
            "M" => Ok(DistanceUnit::Meters),
            other => Err(UnitError::UnknownDistanceUnit(other.to_string())),
        }
    }

    /// Multiplier to metres
    pub fn factor(self) -> f64 {
        match self {
            DistanceUnit::Feet => 0.3048,
            DistanceUnit::StatuteMiles => 1609.34,
            DistanceUnit::Meters => 1.0,
        }
    }
}

/// Pressure group prefixes: `Q` (hPa) and `A` (inches of mercury)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PressureUnit {
    Hectopascals,
    InchesOfMercury,
}

impl PressureUnit {
    pub fn from_code(code: &str) -> Result<Self, UnitError> {
        match code {
            "Q" => Ok(PressureUnit::Hectopascals),
            "A" => Ok(PressureUnit::InchesOfMercury),
            other => Err(UnitError::UnknownPressureUnit(other.to_string())),
        }
    }
}

/// Convert a speed to metres per second, rounded to 2 decimals
pub fn convert_speed(speed: f64, unit: &str) -> Result<f64, UnitError> {
    let unit = SpeedUnit::from_code(unit)?;
    Ok(round_to(speed * unit.factor(), 2))
}

/// Convert a distance to whole metres
pub fn convert_distance(distance: f64, unit: &str) -> Result<u32, UnitError> {
    let unit = DistanceUnit::from_code(unit)?;
    Ok((distance * unit.factor()).round() as u32)
}

/// Convert a pressure to whole hPa
///
/// Inches of mercury are expected as a decimal value (29.92, not 2992).
pub fn convert_pressure(pressure: f64, unit: &str) -> Result<u32, UnitError> {
    let hpa = match PressureUnit::from_code(unit)? {
        PressureUnit::Hectopascals => pressure,
        PressureUnit::InchesOfMercury => pressure / 0.02953,
    };
    Ok(hpa.round() as u32)
}

/// Map a heading in degrees onto the 16-point compass
pub fn compass(degrees: u16) -> Result<Compass, UnitError> {
    if degrees > 360 {
        return Err(UnitError::DirectionOutOfRange(degrees));
    }
    let index = (f64::from(degrees) / 22.5).round() as usize % 16;
    Ok(Compass::POINTS[index])
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
