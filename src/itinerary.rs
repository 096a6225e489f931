//! Pairs a physical route variant with the stop itinerary it serves.

use tracing::warn;

use crate::extremities::{Extremities, extremities};
use crate::geometry::haversine_distance;
use crate::model::Stop;

/// An itinerary's endpoints, ready to be compared against a shape's.
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryCandidate {
    pub itinerary_id: String,
    pub extremities: Extremities,
}

/// Distinct itinerary ids in first-seen order.
pub fn itinerary_ids(stops: &[Stop]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for stop in stops {
        if !ids.contains(&stop.itinerary_id) {
            ids.push(stop.itinerary_id.clone());
        }
    }
    ids
}

/// Extremities for every itinerary of `stops`, in first-seen order.
///
/// An itinerary whose endpoints are ambiguous cannot be compared reliably and
/// is left out with a warning.
pub fn candidates(stops: &[Stop]) -> Vec<ItineraryCandidate> {
    itinerary_ids(stops)
        .into_iter()
        .filter_map(|itinerary_id| match extremities(stops, &itinerary_id) {
            Ok(extremities) => Some(ItineraryCandidate {
                itinerary_id,
                extremities,
            }),
            Err(e) => {
                warn!(itinerary_id = %itinerary_id, reason = %e, "Itinerary excluded from matching");
                None
            }
        })
        .collect()
}

/// Returns the first candidate whose start and end both lie within
/// `tolerance_meters` of the shape's start and end.
///
/// Greedy: candidates are tried in slice order and the first hit wins, even if
/// a later one is closer.
pub fn match_itinerary<'a>(
    shape: &Extremities,
    candidates: &'a [ItineraryCandidate],
    tolerance_meters: f64,
) -> Option<&'a str> {
    candidates
        .iter()
        .find(|c| {
            haversine_distance(shape.start, c.extremities.start) <= tolerance_meters
                && haversine_distance(shape.end, c.extremities.end) <= tolerance_meters
        })
        .map(|c| c.itinerary_id.as_str())
}
