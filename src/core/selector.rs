use serde::Serialize;
use utoipa::ToSchema;

use crate::core::geo::Point;
use crate::providers::orion::BusEntity;

/// A bus tentatively selected as "next at the target stop", tagged with the
/// ordinal of the upstream stop it was reported near.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Candidate {
    pub bus_id: String,
    pub stop_ordinal: i64,
    pub position: Point,
}

/// Reduces per-stop live-position results into the best current candidate.
///
/// `per_stop` must be ordered by ascending stop ordinal (the upstream scan
/// order). Each stop contributes at most one candidate: the first vehicle in
/// its result, which the live service ranks nearest. The candidate from the
/// highest ordinal wins - a bus reported near a stop closer to the target is
/// a better estimate of "next" than one still further upstream.
///
/// Returns `None` when no stop had any matching vehicle; that is a normal
/// outcome ("no bus currently trackable"), not an error.
pub fn select_candidate(per_stop: &[(i64, Vec<BusEntity>)]) -> Option<Candidate> {
    per_stop
        .iter()
        .filter_map(|(ordinal, buses)| {
            let bus = buses.first()?;
            Some(Candidate {
                bus_id: bus.id.clone(),
                stop_ordinal: *ordinal,
                position: bus.position()?,
            })
        })
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::orion::BusEntity;

    fn bus(id: &str, lat: f64, lon: f64) -> BusEntity {
        BusEntity::with_position(id, 8870, lat, lon)
    }

    #[test]
    fn highest_ordinal_wins() {
        let per_stop = vec![
            (3, vec![bus("bus-x", -34.90, -56.18)]),
            (4, vec![]),
            (5, vec![bus("bus-y", -34.89, -56.17)]),
        ];
        let candidate = select_candidate(&per_stop).unwrap();
        assert_eq!(candidate.bus_id, "bus-y");
        assert_eq!(candidate.stop_ordinal, 5);
    }

    #[test]
    fn all_empty_is_none_found() {
        let per_stop = vec![(1, vec![]), (2, vec![]), (3, vec![])];
        assert!(select_candidate(&per_stop).is_none());
    }

    #[test]
    fn empty_stops_contribute_nothing() {
        let per_stop = vec![
            (1, vec![]),
            (2, vec![bus("bus-a", -34.91, -56.19)]),
            (3, vec![]),
        ];
        let candidate = select_candidate(&per_stop).unwrap();
        assert_eq!(candidate.bus_id, "bus-a");
        assert_eq!(candidate.stop_ordinal, 2);
    }

    #[test]
    fn first_ranked_vehicle_taken_per_stop() {
        // The live service orders results by its own proximity ranking; only
        // the first entry of a stop's result becomes a candidate.
        let per_stop = vec![(
            7,
            vec![bus("nearest", -34.90, -56.16), bus("further", -34.95, -56.20)],
        )];
        let candidate = select_candidate(&per_stop).unwrap();
        assert_eq!(candidate.bus_id, "nearest");
    }

    #[test]
    fn candidate_carries_reported_position() {
        let per_stop = vec![(2, vec![bus("bus-a", -34.8765, -56.1234)])];
        let candidate = select_candidate(&per_stop).unwrap();
        assert_eq!(candidate.position.lat, -34.8765);
        assert_eq!(candidate.position.lon, -56.1234);
    }
}
