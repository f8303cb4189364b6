//! Crossing detection over a vehicle's position history.
//!
//! Given the fix history of a bus (most recent first) and two reference
//! points, a single pass over the fixes finds the timestamps at which the bus
//! was last within tolerance of each point. The elapsed time between those
//! two passages is the travel-time estimate the ETA query is built on.

use thiserror::Error;

use crate::core::geo::{haversine_distance, Point};
use crate::core::CROSSING_TOLERANCE_METERS;
use crate::history::Fix;

/// Sentinel seeding the distance-to-destination variable in legacy mode,
/// just outside tolerance so the first fix can never trigger the gate.
const LEGACY_DISTANCE_SEED: f64 = 100.0;

/// How an origin crossing is detected during the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingGate {
    /// Each crossing is gated on its own freshly computed distance.
    Symmetric,
    /// Reproduces the historical deployment: the origin crossing is recorded
    /// when the previous iteration's distance to the destination point was
    /// within tolerance. Kept selectable for behavioral compatibility.
    Legacy,
}

/// Timestamps (epoch seconds) at which the vehicle passed each reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossings {
    pub origin_ts: i64,
    pub destination_ts: i64,
}

/// The scan never found a fix within tolerance of one or both points.
#[derive(Debug, Error)]
#[error("bus {bus_id}: no crossing found within {CROSSING_TOLERANCE_METERS} m of both points")]
pub struct IncompleteHistory {
    pub bus_id: String,
}

/// Scans fixes (ordered most recent first) for passages near `from` and `to`.
///
/// Returns `None` when either crossing was never observed.
pub fn detect_crossings(
    fixes: &[Fix],
    from: Point,
    to: Point,
    gate: CrossingGate,
) -> Option<Crossings> {
    let mut origin_ts: Option<i64> = None;
    let mut destination_ts: Option<i64> = None;
    let mut prev_dist_to_destination = LEGACY_DISTANCE_SEED;

    for fix in fixes {
        let at = fix.position();

        let origin_hit = match gate {
            CrossingGate::Symmetric => {
                haversine_distance(from, at) < CROSSING_TOLERANCE_METERS
            }
            CrossingGate::Legacy => prev_dist_to_destination < CROSSING_TOLERANCE_METERS,
        };
        if origin_hit {
            origin_ts = Some(fix.timestamp);
        }

        prev_dist_to_destination = haversine_distance(to, at);
        if prev_dist_to_destination < CROSSING_TOLERANCE_METERS {
            destination_ts = Some(fix.timestamp);
        }
    }

    Some(Crossings {
        origin_ts: origin_ts?,
        destination_ts: destination_ts?,
    })
}

/// Elapsed whole seconds between the two crossings of a bus's history.
pub fn elapsed_between(
    bus_id: &str,
    fixes: &[Fix],
    from: Point,
    to: Point,
    gate: CrossingGate,
) -> Result<i64, IncompleteHistory> {
    let crossings = detect_crossings(fixes, from, to, gate).ok_or_else(|| IncompleteHistory {
        bus_id: bus_id.to_string(),
    })?;
    Ok(recombined_elapsed(crossings))
}

/// Decomposes the absolute timestamp difference into days, hours, minutes and
/// seconds, then reconstitutes total seconds. Numerically identical to the
/// direct difference; the decomposition is the wire-compatible form the
/// original deployment reported.
fn recombined_elapsed(crossings: Crossings) -> i64 {
    let total = (crossings.origin_ts - crossings.destination_ts).abs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    days * 86_400 + hours * 3_600 + minutes * 60 + seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference points roughly 1 km apart along a Montevideo avenue.
    const POINT_A: Point = Point {
        lat: -34.9000,
        lon: -56.1600,
    };
    const POINT_B: Point = Point {
        lat: -34.9090,
        lon: -56.1600,
    };
    // Far from both reference points.
    const ELSEWHERE: Point = Point {
        lat: -34.9500,
        lon: -56.2200,
    };

    fn fix_at(point: Point, timestamp: i64) -> Fix {
        Fix {
            bus_id: "bus-145".to_string(),
            variant: 8870,
            latitude: point.lat,
            longitude: point.lon,
            timestamp,
        }
    }

    #[test]
    fn detects_crossings_in_descending_history() {
        // Most recent first: outside both at 300, near B at 200, near A at 100.
        let fixes = vec![
            fix_at(ELSEWHERE, 300),
            fix_at(POINT_B, 200),
            fix_at(POINT_A, 100),
        ];

        for gate in [CrossingGate::Symmetric, CrossingGate::Legacy] {
            let crossings = detect_crossings(&fixes, POINT_A, POINT_B, gate).unwrap();
            assert_eq!(crossings.origin_ts, 100);
            assert_eq!(crossings.destination_ts, 200);

            let elapsed = elapsed_between("bus-145", &fixes, POINT_A, POINT_B, gate).unwrap();
            assert_eq!(elapsed, 100);
        }
    }

    #[test]
    fn incomplete_history_when_origin_never_crossed() {
        let fixes = vec![fix_at(POINT_B, 200), fix_at(ELSEWHERE, 100)];
        let err =
            elapsed_between("bus-145", &fixes, POINT_A, POINT_B, CrossingGate::Symmetric)
                .unwrap_err();
        assert_eq!(err.bus_id, "bus-145");
    }

    #[test]
    fn incomplete_history_when_destination_never_crossed() {
        let fixes = vec![fix_at(POINT_A, 200), fix_at(ELSEWHERE, 100)];
        assert!(detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Symmetric).is_none());
    }

    #[test]
    fn empty_history_is_incomplete() {
        assert!(detect_crossings(&[], POINT_A, POINT_B, CrossingGate::Symmetric).is_none());
    }

    #[test]
    fn legacy_gate_records_origin_from_previous_destination_distance() {
        // The fix at 200 is far from A, but the fix before it (at 300) was
        // within tolerance of B. The legacy gate records an origin crossing
        // at 200 anyway; the symmetric gate does not.
        let fixes = vec![fix_at(POINT_B, 300), fix_at(ELSEWHERE, 200)];

        let legacy = detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Legacy).unwrap();
        assert_eq!(legacy.origin_ts, 200);
        assert_eq!(legacy.destination_ts, 300);

        assert!(detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Symmetric).is_none());
    }

    #[test]
    fn legacy_gate_misses_genuine_origin_crossing() {
        // The fix at 200 is within tolerance of A, but its predecessor was
        // nowhere near B, so the legacy gate never fires for it.
        let fixes = vec![
            fix_at(ELSEWHERE, 300),
            fix_at(POINT_A, 200),
            fix_at(POINT_B, 100),
        ];

        assert!(detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Legacy).is_none());

        let symmetric =
            detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Symmetric).unwrap();
        assert_eq!(symmetric.origin_ts, 200);
        assert_eq!(symmetric.destination_ts, 100);
    }

    #[test]
    fn later_matches_overwrite_earlier_ones_in_scan_order() {
        // Two fixes near A: the scan keeps overwriting, so the chronologically
        // oldest one (last in the most-recent-first order) ends up recorded.
        let fixes = vec![
            fix_at(POINT_A, 400),
            fix_at(POINT_B, 300),
            fix_at(POINT_A, 100),
        ];
        let crossings =
            detect_crossings(&fixes, POINT_A, POINT_B, CrossingGate::Symmetric).unwrap();
        assert_eq!(crossings.origin_ts, 100);
        assert_eq!(crossings.destination_ts, 300);
    }

    #[test]
    fn decomposition_matches_direct_subtraction_beyond_24_hours() {
        // 2 days, 3 hours, 4 minutes, 5 seconds
        let span = 2 * 86_400 + 3 * 3_600 + 4 * 60 + 5;
        let crossings = Crossings {
            origin_ts: 1_700_000_000 + span,
            destination_ts: 1_700_000_000,
        };
        assert_eq!(recombined_elapsed(crossings), span);

        // and with the crossings reversed
        let reversed = Crossings {
            origin_ts: 1_700_000_000,
            destination_ts: 1_700_000_000 + span,
        };
        assert_eq!(recombined_elapsed(reversed), span);
    }

    #[test]
    fn decomposition_handles_sub_minute_spans() {
        let crossings = Crossings {
            origin_ts: 1_700_000_042,
            destination_ts: 1_700_000_000,
        };
        assert_eq!(recombined_elapsed(crossings), 42);
    }
}
