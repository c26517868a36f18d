//! Forecast propagation
//!
//! Turns the flat list of a TAF's forecasts into fully resolved periods.
//! The first forecast is the baseline. Every later group inherits whatever
//! it does not state from the baseline in force at that point. `BECMG` and
//! `FM` groups then become the new baseline, closing the previous one at
//! their own start and taking over its end; every other group is a
//! transient overlay that leaves the baseline alone.
//!
//! The input is never modified; the output has one resolved forecast per
//! input forecast, in input order.

use tracing::trace;

use crate::taf::{Forecast, Taf};
use crate::types::Indicator;

/// Resolve `forecasts` against their running baseline
pub fn propagate_forecasts(forecasts: &[Forecast]) -> Vec<Forecast> {
    let Some((prevailing, changes)) = forecasts.split_first() else {
        return Vec::new();
    };

    let mut resolved = Vec::with_capacity(forecasts.len());
    resolved.push(prevailing.clone());
    let mut baseline = 0;

    for change in changes {
        let mut current = overlay(&resolved[baseline], change);

        if change.indicator.is_some_and(Indicator::changes_baseline) {
            current.validity.end_time = resolved[baseline].validity.end_time;
            resolved[baseline].validity.end_time = current.validity.start_time;
            trace!(
                baseline,
                end = ?resolved[baseline].validity.end_time,
                "closed baseline"
            );
            resolved.push(current);
            baseline = resolved.len() - 1;
        } else {
            resolved.push(current);
        }
    }

    resolved
}

/// Fields stated by `change` replace the baseline's; everything else is
/// inherited. Validity, indicator and probability always describe the
/// change group itself.
fn overlay(baseline: &Forecast, change: &Forecast) -> Forecast {
    Forecast {
        probability: change.probability,
        indicator: change.indicator,
        validity: change.validity,
        wind: change.wind.clone().or_else(|| baseline.wind.clone()),
        visibility: change.visibility.or(baseline.visibility),
        weather: if change.weather.is_empty() {
            baseline.weather.clone()
        } else {
            change.weather.clone()
        },
        clouds: if change.clouds.is_empty() {
            baseline.clouds.clone()
        } else {
            change.clouds.clone()
        },
        max_temperature: change.max_temperature.or(baseline.max_temperature),
        min_temperature: change.min_temperature.or(baseline.min_temperature),
        unmatched: change.unmatched.clone(),
    }
}

impl Taf {
    /// A copy of this TAF with every forecast resolved
    pub fn propagate(&self) -> Taf {
        Taf {
            station: self.station.clone(),
            time: self.time,
            forecasts: propagate_forecasts(&self.forecasts),
        }
    }
}
