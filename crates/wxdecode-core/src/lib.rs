//! Decoding of METAR observations and TAF forecasts
//!
//! Raw reports are split into tokens and each token is bound to a typed
//! field through a declarative schema (see [`binder`]). Quantities are
//! normalised to SI units while decoding. On top of the decoded records the
//! crate offers TAF forecast propagation, cloud and runway summaries,
//! calendar anchoring of report timestamps and flat feature rows for
//! downstream analysis.

pub mod anchor;
pub mod binder;
pub mod features;
pub mod grammar;
pub mod metar;
pub mod pipeline;
pub mod propagation;
pub mod summaries;
pub mod taf;
pub mod types;
pub mod units;

pub use anchor::*;
pub use features::*;
pub use metar::*;
pub use pipeline::*;
pub use propagation::*;
pub use summaries::*;
pub use taf::*;
pub use types::*;
pub use units::*;

/// Errors raised while decoding a report
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("The report '{0}' does not look like a TAF")]
    NotATaf(String),

    #[error("Forecast without validity period: '{0}'")]
    MissingValidity(String),

    #[error("No station identifier in '{0}'")]
    MissingStation(String),

    #[error("TAF for {0} has no forecast")]
    EmptyTaf(String),

    #[error("Invalid release time '{0}'")]
    InvalidTime(String),

    #[error("'{report}' is not a valid {kind}")]
    InvalidReport {
        kind: &'static str,
        report: String,
        #[source]
        source: Box<DecodeError>,
    },

    #[error(transparent)]
    Unit(#[from] UnitError),
}
