use thiserror::Error;

use crate::providers::montevideo::Stop;

/// Raised when the requested stop id does not belong to the variant.
#[derive(Debug, Error)]
#[error("stop {stop_id} not found on variant {variant}")]
pub struct StopNotFound {
    pub variant: i64,
    pub stop_id: i64,
}

/// Returns the stops of the variant that are upstream of (and including) the
/// target stop, ordered by ascending ordinal. The target stop is always last.
///
/// The input set may arrive in any order; ordinals are unique within a
/// variant so the sort is total.
pub fn upstream_stops(
    mut stops: Vec<Stop>,
    variant: i64,
    target_stop_id: i64,
) -> Result<Vec<Stop>, StopNotFound> {
    stops.sort_by_key(|s| s.ordinal);

    let target_ordinal = stops
        .iter()
        .find(|s| s.stop_id == target_stop_id)
        .map(|s| s.ordinal)
        .ok_or(StopNotFound {
            variant,
            stop_id: target_stop_id,
        })?;

    stops.retain(|s| s.ordinal <= target_ordinal);
    Ok(stops)
}
