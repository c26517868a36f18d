//! Batch decoding of raw reports
//!
//! Reports in a batch are independent, so decoding fans out over the rayon
//! thread pool. Results always come back in input order.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::anchor::{anchor, anchor_validity};
use crate::features::{flatten, FeatureRow, FeatureValue, DEFAULT_MAX_WEATHER};
use crate::metar::Metar;
use crate::taf::Taf;
use crate::DecodeError;

/// A report type that can be decoded from raw text
pub trait Report: Sized + Send {
    /// Human readable report type
    const KIND: &'static str;

    fn decode(text: &str) -> Result<Self, DecodeError>;
}

impl Report for Metar {
    const KIND: &'static str = "METAR";

    fn decode(text: &str) -> Result<Self, DecodeError> {
        Metar::from_text(text)
    }
}

impl Report for Taf {
    const KIND: &'static str = "TAF";

    fn decode(text: &str) -> Result<Self, DecodeError> {
        Taf::from_text(text)
    }
}

/// Decode every text in parallel, one result per text in input order
pub fn decode_all<R, S>(texts: &[S]) -> Vec<Result<R, DecodeError>>
where
    R: Report,
    S: AsRef<str> + Sync,
{
    texts.par_iter().map(|text| R::decode(text.as_ref())).collect()
}

/// What to do with a report that fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the batch on the first invalid report
    Raise,
    /// Log the report and leave it out
    #[default]
    Ignore,
}

/// A raw report together with its release time (ISO-8601)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReport {
    pub report: String,
    pub time: String,
}

impl RawReport {
    pub fn new(report: impl Into<String>, time: impl Into<String>) -> Self {
        RawReport {
            report: report.into(),
            time: time.into(),
        }
    }

    /// Release time; a time without offset is taken as UTC
    pub fn release_time(&self) -> Result<DateTime<Utc>, DecodeError> {
        let time = self.time.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(time) {
            return Ok(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(time, format).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| DecodeError::InvalidTime(self.time.clone()))
    }
}

/// Turns batches of raw reports into feature rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processor {
    pub policy: ErrorPolicy,
    /// Resolve TAF change groups against their baseline before flattening
    pub propagate: bool,
    pub max_weather: usize,
}

impl Default for Processor {
    fn default() -> Self {
        Processor {
            policy: ErrorPolicy::default(),
            propagate: true,
            max_weather: DEFAULT_MAX_WEATHER,
        }
    }
}

impl Processor {
    pub fn new(policy: ErrorPolicy) -> Self {
        Processor {
            policy,
            ..Self::default()
        }
    }

    /// One row per METAR, stamped with its release time
    pub fn metars(&self, items: &[RawReport]) -> Result<Vec<FeatureRow>, DecodeError> {
        self.run::<Metar, _>(items, |item, metar| {
            let mut row = flatten(&metar, self.max_weather);
            row.insert("time", item.time.as_str());
            Ok(vec![row])
        })
    }

    /// One row per forecast period of every TAF
    ///
    /// Validity windows and temperature extremes are anchored to calendar
    /// instants against the release time.
    pub fn tafs(&self, items: &[RawReport]) -> Result<Vec<FeatureRow>, DecodeError> {
        self.run::<Taf, _>(items, |item, taf| {
            let released = item.release_time()?;
            let taf = if self.propagate { taf.propagate() } else { taf };

            Ok(taf
                .forecasts
                .iter()
                .map(|forecast| {
                    let mut row = flatten(forecast, self.max_weather);
                    let (start, end) = anchor_validity(&forecast.validity, released);
                    row.insert("station", taf.station.code());
                    row.insert("time", item.time.as_str());
                    row.insert("validity_start_time", iso(start));
                    row.insert("validity_end_time", iso(end));
                    row.insert(
                        "maxtemperature_time",
                        iso(forecast.max_temperature.and_then(|t| anchor(t.time, released))),
                    );
                    row.insert(
                        "mintemperature_time",
                        iso(forecast.min_temperature.and_then(|t| anchor(t.time, released))),
                    );
                    row
                })
                .collect())
        })
    }

    fn run<R, F>(&self, items: &[RawReport], rows: F) -> Result<Vec<FeatureRow>, DecodeError>
    where
        R: Report,
        F: Fn(&RawReport, R) -> Result<Vec<FeatureRow>, DecodeError> + Sync,
    {
        let results: Vec<_> = items
            .par_iter()
            .map(|item| R::decode(&item.report).and_then(|report| rows(item, report)))
            .collect();

        let mut output = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(mut batch) => output.append(&mut batch),
                Err(error) => match self.policy {
                    ErrorPolicy::Raise => {
                        return Err(DecodeError::InvalidReport {
                            kind: R::KIND,
                            report: item.report.clone(),
                            source: Box::new(error),
                        });
                    }
                    ErrorPolicy::Ignore => {
                        warn!(kind = R::KIND, report = %item.report, %error, "skipping invalid report");
                        skipped += 1;
                    }
                },
            }
        }

        debug!(kind = R::KIND, rows = output.len(), skipped, "processed batch");
        Ok(output)
    }
}

fn iso(time: Option<DateTime<Utc>>) -> FeatureValue {
    time.map(|t| t.to_rfc3339()).into()
}

/// Flatten a batch of METARs with default settings
pub fn process_metars(
    items: &[RawReport],
    policy: ErrorPolicy,
) -> Result<Vec<FeatureRow>, DecodeError> {
    Processor::new(policy).metars(items)
}

/// Propagate and flatten a batch of TAFs with default settings
pub fn process_tafs(items: &[RawReport], policy: ErrorPolicy) -> Result<Vec<FeatureRow>, DecodeError> {
    Processor::new(policy).tafs(items)
}
