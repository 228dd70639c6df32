//! Covering intervals of GenBank feature locations.

use gb_io::seq::Feature;

/// Smallest `[start, end)` interval covering every part of the feature,
/// ignoring strand. `None` for locations without usable coordinates.
pub fn feature_bounds(feature: &Feature) -> Option<(u64, u64)> {
    let (from, to) = feature.location.find_bounds().ok()?;
    let start = u64::try_from(from.min(to)).ok()?;
    let end = u64::try_from(from.max(to)).ok()?;
    Some((start, end))
}
