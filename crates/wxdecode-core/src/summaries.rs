//! Summaries of cloud layers and runway visual ranges
//!
//! Reports can carry several cloud layers and one RVR group per runway.
//! These helpers reduce them to single values.

use crate::types::{CloudCover, CloudType, Clouds, RunwayVisualRange};

/// Ceiling reported when no layer constitutes one, in metres
pub const CEILING_UNLIMITED: u32 = 10_000;

/// Rank of a cover code; higher is more extensive
///
/// All "no cloud" sky states share one rank, and a missing observation
/// ranks below them.
pub fn cover_rank(cover: CloudCover) -> u8 {
    match cover {
        CloudCover::NoObservation => 0,
        CloudCover::SkyClear
        | CloudCover::Clear
        | CloudCover::NoSignificantCloud
        | CloudCover::NilCloudDetected => 1,
        CloudCover::Few => 2,
        CloudCover::Scattered => 3,
        CloudCover::Broken => 4,
        CloudCover::Overcast => 5,
        CloudCover::VerticalVisibility => 6,
    }
}

/// Rank of a convective cloud type; higher is more dangerous
pub fn cloud_type_rank(cloud: CloudType) -> u8 {
    match cloud {
        CloudType::ToweringCumulus => 1,
        CloudType::Cumulonimbus => 2,
    }
}

/// Lowest BKN, OVC or VV layer
///
/// `None` when a ceiling layer has an unknown height, since the ceiling
/// cannot be told then. [`CEILING_UNLIMITED`] when no layer is a ceiling.
pub fn clouds_ceiling(layers: &[Clouds]) -> Option<u32> {
    let mut ceiling = CEILING_UNLIMITED;
    for layer in layers {
        if !layer.amount.is_some_and(CloudCover::is_ceiling) {
            continue;
        }
        ceiling = ceiling.min(layer.height?);
    }
    Some(ceiling)
}

/// Most extensive cover among the layers; the first one wins on ties
pub fn clouds_amount(layers: &[Clouds]) -> Option<CloudCover> {
    layers
        .iter()
        .filter_map(|layer| layer.amount)
        .fold(None, |best, cover| match best {
            Some(b) if cover_rank(b) >= cover_rank(cover) => Some(b),
            _ => Some(cover),
        })
}

/// Most dangerous convective cloud type among the layers
pub fn clouds_most_dangerous(layers: &[Clouds]) -> Option<CloudType> {
    layers
        .iter()
        .filter_map(|layer| layer.cloud)
        .max_by_key(|cloud| cloud_type_rank(*cloud))
}

/// The three cloud summaries folded into a single layer
pub fn summarize_clouds(layers: &[Clouds]) -> Clouds {
    Clouds {
        amount: clouds_amount(layers),
        height: clouds_ceiling(layers),
        cloud: clouds_most_dangerous(layers),
    }
}

/// Lowest runway visual range across all runways
pub fn rvr_min(ranges: &[RunwayVisualRange]) -> Option<u32> {
    ranges.iter().filter_map(RunwayVisualRange::lowest).min()
}

/// Highest runway visual range across all runways
pub fn rvr_max(ranges: &[RunwayVisualRange]) -> Option<u32> {
    ranges.iter().filter_map(RunwayVisualRange::highest).max()
}
