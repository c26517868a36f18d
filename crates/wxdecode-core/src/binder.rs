//! Declarative token-to-field binding
//!
//! A report body is a run of whitespace separated tokens. Each report type
//! declares an ordered [`Schema`]; [`bind`] walks the tokens once, handing
//! every token to the first field at or after the cursor whose grammar
//! accepts it. There is no lookahead and no backtracking: schema order
//! decides ambiguous tokens, and once the cursor has passed a field that
//! field stays as it is. Tokens no remaining field accepts are dropped and
//! reported back in [`Binding::unmatched`].

use std::mem;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::grammar::{Decode, Extreme};
use crate::types::*;
use crate::units::UnitError;

/// Closed registry of field grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Station,
    Timestamp,
    Wind,
    VariableDirection,
    Visibility,
    Weather,
    Clouds,
    RunwayVisualRange,
    Temperature,
    Pressure,
    Validity,
    Probability,
    Indicator,
    MaxTemperature,
    MinTemperature,
}

/// A value produced by one of the grammars
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Station(Station),
    Timestamp(Timestamp),
    Wind(Wind),
    VariableDirection(VariableDirection),
    Visibility(Visibility),
    Weather(Weather),
    Clouds(Clouds),
    RunwayVisualRange(RunwayVisualRange),
    Temperature(Temperature),
    Pressure(Pressure),
    Validity(Validity),
    Probability(Probability),
    Indicator(Indicator),
    MaxTemperature(TemperatureExtreme),
    MinTemperature(TemperatureExtreme),
}

impl Grammar {
    pub fn decode(self, token: &str) -> Result<Option<FieldValue>, UnitError> {
        Ok(match self {
            Grammar::Station => Station::decode(token)?.map(FieldValue::Station),
            Grammar::Timestamp => Timestamp::decode(token)?.map(FieldValue::Timestamp),
            Grammar::Wind => Wind::decode(token)?.map(FieldValue::Wind),
            Grammar::VariableDirection => {
                VariableDirection::decode(token)?.map(FieldValue::VariableDirection)
            }
            Grammar::Visibility => Visibility::decode(token)?.map(FieldValue::Visibility),
            Grammar::Weather => Weather::decode(token)?.map(FieldValue::Weather),
            Grammar::Clouds => Clouds::decode(token)?.map(FieldValue::Clouds),
            Grammar::RunwayVisualRange => {
                RunwayVisualRange::decode(token)?.map(FieldValue::RunwayVisualRange)
            }
            Grammar::Temperature => Temperature::decode(token)?.map(FieldValue::Temperature),
            Grammar::Pressure => Pressure::decode(token)?.map(FieldValue::Pressure),
            Grammar::Validity => Validity::decode(token)?.map(FieldValue::Validity),
            Grammar::Probability => Probability::decode(token)?.map(FieldValue::Probability),
            Grammar::Indicator => Indicator::decode(token)?.map(FieldValue::Indicator),
            Grammar::MaxTemperature => {
                TemperatureExtreme::decode_extreme(token, Extreme::Max).map(FieldValue::MaxTemperature)
            }
            Grammar::MinTemperature => {
                TemperatureExtreme::decode_extreme(token, Extreme::Min).map(FieldValue::MinTemperature)
            }
        })
    }
}

/// Cardinality of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Bound at most once; the cursor moves past it when bound
    Scalar(Grammar),
    /// Bound any number of times; the cursor stays on it when bound
    Repeated(Grammar),
}

impl Field {
    pub fn grammar(self) -> Grammar {
        match self {
            Field::Scalar(grammar) | Field::Repeated(grammar) => grammar,
        }
    }
}

/// A named schema entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field: Field,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str, grammar: Grammar) -> Self {
        FieldSpec {
            name,
            field: Field::Scalar(grammar),
        }
    }

    pub const fn repeated(name: &'static str, grammar: Grammar) -> Self {
        FieldSpec {
            name,
            field: Field::Repeated(grammar),
        }
    }
}

/// Ordered field declarations of a record
pub type Schema = [FieldSpec];

#[derive(Debug, Clone, PartialEq, Default)]
enum Slot {
    #[default]
    Empty,
    Scalar(FieldValue),
    Repeated(Vec<FieldValue>),
}

/// Extraction of a concrete value from a [`FieldValue`]
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Option<Self>;
}

macro_rules! from_field_value {
    ($($ty:ty => $($variant:ident)|+;)+) => {
        $(
            impl FromFieldValue for $ty {
                fn from_field_value(value: FieldValue) -> Option<Self> {
                    match value {
                        $(FieldValue::$variant(v) => Some(v),)+
                        _ => None,
                    }
                }
            }
        )+
    };
}

from_field_value! {
    Station => Station;
    Timestamp => Timestamp;
    Wind => Wind;
    VariableDirection => VariableDirection;
    Visibility => Visibility;
    Weather => Weather;
    Clouds => Clouds;
    RunwayVisualRange => RunwayVisualRange;
    Temperature => Temperature;
    Pressure => Pressure;
    Validity => Validity;
    Probability => Probability;
    Indicator => Indicator;
    TemperatureExtreme => MaxTemperature | MinTemperature;
}

/// Result of binding a token run against a schema
#[derive(Debug, Clone)]
pub struct Binding<'s> {
    schema: &'s Schema,
    slots: Vec<Slot>,
    unmatched: Vec<String>,
}

impl<'s> Binding<'s> {
    fn new(schema: &'s Schema) -> Self {
        Binding {
            schema,
            slots: vec![Slot::Empty; schema.len()],
            unmatched: Vec::new(),
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|spec| spec.name == name)
    }

    /// Take the scalar bound to `name`, if any
    pub fn take<T: FromFieldValue>(&mut self, name: &str) -> Option<T> {
        let index = self.index_of(name)?;
        match mem::take(&mut self.slots[index]) {
            Slot::Scalar(value) => T::from_field_value(value),
            _ => None,
        }
    }

    /// Take every value bound to the repeated field `name`, in token order
    pub fn take_all<T: FromFieldValue>(&mut self, name: &str) -> Vec<T> {
        let Some(index) = self.index_of(name) else {
            return Vec::new();
        };
        match mem::take(&mut self.slots[index]) {
            Slot::Repeated(values) => values.into_iter().filter_map(T::from_field_value).collect(),
            _ => Vec::new(),
        }
    }

    /// Tokens that no remaining field accepted, in token order
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn into_unmatched(self) -> Vec<String> {
        self.unmatched
    }
}

/// Bind `tokens` onto `schema`
///
/// Never fails on token content; an error means a grammar produced a unit
/// code the conversion tables reject.
pub fn bind<'s, 't, I>(schema: &'s Schema, tokens: I) -> Result<Binding<'s>, UnitError>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut binding = Binding::new(schema);
    let mut cursor = 0;

    for token in tokens {
        let mut bound = false;

        for (index, spec) in schema.iter().enumerate().skip(cursor) {
            let Some(value) = spec.field.grammar().decode(token)? else {
                continue;
            };
            trace!(token, field = spec.name, "bound token");

            match spec.field {
                Field::Scalar(_) => {
                    binding.slots[index] = Slot::Scalar(value);
                    cursor = index + 1;
                }
                Field::Repeated(_) => {
                    match &mut binding.slots[index] {
                        Slot::Repeated(values) => values.push(value),
                        slot => *slot = Slot::Repeated(vec![value]),
                    }
                    cursor = index;
                }
            }
            bound = true;
            break;
        }

        if !bound {
            debug!(token, "dropped unmatched token");
            binding.unmatched.push(token.to_string());
        }
    }

    Ok(binding)
}

/// Collapse whitespace runs (newlines included) and strip the `=` terminator
pub fn sanitize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('=')
        .trim_end()
        .to_string()
}

static WHOLE_MILES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{1,2}$").unwrap_or_else(|e| panic!("invalid grammar: {e}"))
});

static FRACTION_MILES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1357]/(2|4|8|16)SM$").unwrap_or_else(|e| panic!("invalid grammar: {e}"))
});

/// Split text into tokens, joining a whole-mile token with the fraction
/// that follows it (`1 1/2SM` becomes `11/2SM`)
pub fn tokenize(text: &str) -> Vec<String> {
    let mut joined: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        if FRACTION_MILES_RE.is_match(token) {
            if let Some(previous) = joined.last_mut() {
                if WHOLE_MILES_RE.is_match(previous) {
                    previous.push_str(token);
                    continue;
                }
            }
        }
        joined.push(token.to_string());
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &Schema = &[
        FieldSpec::scalar("station", Grammar::Station),
        FieldSpec::repeated("clouds", Grammar::Clouds),
        FieldSpec::scalar("temperature", Grammar::Temperature),
    ];

    #[test]
    fn test_repeated_field_accumulates() {
        let mut binding = bind(SCHEMA, ["LEGE", "FEW015", "BKN025", "12/08"]).unwrap();
        assert_eq!(binding.take::<Station>("station").unwrap().code(), "LEGE");
        let clouds: Vec<Clouds> = binding.take_all("clouds");
        assert_eq!(clouds.len(), 2);
        assert_eq!(clouds[1].amount, Some(CloudCover::Broken));
        assert_eq!(
            binding.take::<Temperature>("temperature").unwrap().temperature,
            12
        );
        assert!(binding.unmatched().is_empty());
    }

    #[test]
    fn test_unmatched_token_is_dropped() {
        let mut binding = bind(SCHEMA, ["LEGE", "NOSIG", "FEW015"]).unwrap();
        assert_eq!(binding.unmatched(), ["NOSIG"]);
        assert_eq!(binding.take_all::<Clouds>("clouds").len(), 1);
        assert!(binding.take::<Temperature>("temperature").is_none());
    }

    #[test]
    fn test_scalar_is_bound_once() {
        let mut binding = bind(SCHEMA, ["LEGE", "LPPT"]).unwrap();
        assert_eq!(binding.take::<Station>("station").unwrap().code(), "LEGE");
        assert_eq!(binding.unmatched(), ["LPPT"]);
    }

    #[test]
    fn test_cursor_never_moves_back() {
        // binding the temperature first leaves the clouds unreachable
        let mut binding = bind(SCHEMA, ["LEGE", "12/08", "FEW015"]).unwrap();
        assert!(binding.take_all::<Clouds>("clouds").is_empty());
        assert_eq!(binding.unmatched(), ["FEW015"]);
    }

    #[test]
    fn test_unbound_fields_keep_defaults() {
        let mut binding = bind(SCHEMA, std::iter::empty()).unwrap();
        assert!(binding.take::<Station>("station").is_none());
        assert!(binding.take_all::<Clouds>("clouds").is_empty());
        assert!(binding.take::<Clouds>("unknown").is_none());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  LEGE\n050500Z \t 02008KT=\n"), "LEGE 050500Z 02008KT");
        assert_eq!(sanitize("LEGE ="), "LEGE");
    }

    #[test]
    fn test_tokenize_joins_split_miles() {
        assert_eq!(tokenize("22015KT 1 1/2SM -SN"), vec!["22015KT", "11/2SM", "-SN"]);
        assert_eq!(tokenize("2 3/4SM"), vec!["23/4SM"]);
        // a lone fraction or a whole number without one stays as it is
        assert_eq!(tokenize("1/2SM BR"), vec!["1/2SM", "BR"]);
        assert_eq!(tokenize("9999 1 FEW015"), vec!["9999", "1", "FEW015"]);
    }
}
