//! Merges one route variant's shape with its itinerary's stops.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::UnifyError;
use crate::extremities::extremities;
use crate::geometry::{is_degenerate, point_to_segment_distance};
use crate::itinerary::{candidates, match_itinerary};
use crate::model::{Coord, ShapePoint, Stop, UnifiedPoint, renumber};

/// Distances closer than this are treated as a tie between segments.
const TIE_TOLERANCE_METERS: f64 = 1e-6;

/// Result of unifying one route variant.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedRoute {
    pub route_id: i64,
    pub itinerary_id: String,
    pub direction: String,
    /// Trimmed to the first and last stop, `order` dense from 0.
    pub points: Vec<UnifiedPoint>,
    /// Zero-length segments left out of the nearest-segment search.
    pub degenerate_segments: usize,
}

/// A usable shape segment, identified by the order of its starting point.
struct Segment {
    start_order: i64,
    a: Coord,
    b: Coord,
}

/// Unifies the shape of `route_id` with the itinerary whose endpoints match it.
///
/// Every stop of that itinerary is inserted after the starting point of its
/// nearest shape segment, the merged sequence is sorted by insertion order and
/// stop number, then cut down to the span between the first and last stop.
pub fn unify_route(
    line_number: &str,
    route_id: i64,
    shape_points: &[ShapePoint],
    stops: &[Stop],
    tolerance_meters: f64,
) -> Result<UnifiedRoute, UnifyError> {
    let mut shape: Vec<&ShapePoint> = shape_points
        .iter()
        .filter(|p| p.route_id == route_id)
        .collect();
    if shape.is_empty() {
        return Err(UnifyError::EmptyInput {
            what: "shape point",
            id: route_id.to_string(),
        });
    }
    shape.sort_by_key(|p| p.order);

    let shape_extremities = extremities(shape_points, &route_id.to_string())?;
    let itinerary_candidates = candidates(stops);
    let itinerary_id = match_itinerary(&shape_extremities, &itinerary_candidates, tolerance_meters)
        .ok_or(UnifyError::UnmatchedItinerary {
            route_id,
            tolerance_meters,
        })?
        .to_string();
    debug!(line = line_number, route_id, itinerary_id = %itinerary_id, "Itinerary matched");

    let mut matched: Vec<&Stop> = stops
        .iter()
        .filter(|s| s.itinerary_id == itinerary_id)
        .collect();
    matched.sort_by_key(|s| s.order);
    let Some(first_stop) = matched.first() else {
        return Err(UnifyError::EmptyInput {
            what: "stop",
            id: itinerary_id,
        });
    };
    let direction = itinerary_direction(line_number, route_id, first_stop, &matched);

    let (segments, degenerate_segments) = usable_segments(line_number, route_id, &shape);
    if segments.is_empty() {
        return Err(UnifyError::NoUsableSegment { route_id });
    }

    // (insertion order, point)
    let mut merged: Vec<(i64, UnifiedPoint)> = Vec::with_capacity(shape.len() + matched.len());
    for p in &shape {
        merged.push((
            p.order,
            UnifiedPoint {
                line_number: line_number.to_string(),
                order: 0,
                latitude: p.latitude,
                longitude: p.longitude,
                point_type: None,
                stop_number: None,
                stop_name: None,
                direction: direction.clone(),
            },
        ));
    }
    for stop in &matched {
        let insert_at =
            nearest_segment(&segments, stop.coord()).ok_or(UnifyError::NoUsableSegment { route_id })?;
        merged.push((
            insert_at,
            UnifiedPoint {
                line_number: line_number.to_string(),
                order: 0,
                latitude: stop.latitude,
                longitude: stop.longitude,
                point_type: Some(stop.stop_type.clone()),
                stop_number: Some(stop.number.clone()),
                stop_name: Some(stop.name.clone()),
                direction: direction.clone(),
            },
        ));
    }

    // Stable, and `None < Some`, so shape points lead stops sharing their order.
    merged.sort_by(|(x_order, x), (y_order, y)| {
        x_order
            .cmp(y_order)
            .then_with(|| x.stop_number.cmp(&y.stop_number))
    });
    let mut points: Vec<UnifiedPoint> = merged.into_iter().map(|(_, p)| p).collect();
    renumber(&mut points);

    let stop_numbers: HashSet<&str> = matched.iter().map(|s| s.number.as_str()).collect();
    let points = trim_to_stops(points, &stop_numbers);

    Ok(UnifiedRoute {
        route_id,
        itinerary_id,
        direction,
        points,
        degenerate_segments,
    })
}

fn usable_segments(line_number: &str, route_id: i64, shape: &[&ShapePoint]) -> (Vec<Segment>, usize) {
    let mut segments = Vec::with_capacity(shape.len().saturating_sub(1));
    let mut degenerate = 0;
    for pair in shape.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if is_degenerate(a.coord(), b.coord()) {
            let e = UnifyError::DegenerateSegment {
                from_order: a.order,
                to_order: b.order,
            };
            debug!(line = line_number, route_id, reason = %e, "Segment excluded");
            degenerate += 1;
            continue;
        }
        segments.push(Segment {
            start_order: a.order,
            a: a.coord(),
            b: b.coord(),
        });
    }
    (segments, degenerate)
}

/// Order of the starting point of the segment nearest to `stop`. Ties keep the
/// earlier segment.
fn nearest_segment(segments: &[Segment], stop: Coord) -> Option<i64> {
    let mut best: Option<(i64, f64)> = None;
    for segment in segments {
        let Some(distance) = point_to_segment_distance(segment.a, segment.b, stop) else {
            continue;
        };
        match best {
            Some((_, best_distance)) if distance >= best_distance - TIE_TOLERANCE_METERS => {}
            _ => best = Some((segment.start_order, distance)),
        }
    }
    best.map(|(order, _)| order)
}

fn itinerary_direction(line_number: &str, route_id: i64, first: &Stop, stops: &[&Stop]) -> String {
    let mut others: Vec<&str> = stops
        .iter()
        .map(|s| s.direction.as_str())
        .filter(|d| *d != first.direction)
        .collect();
    others.sort_unstable();
    others.dedup();
    if !others.is_empty() {
        warn!(
            line = line_number,
            route_id,
            itinerary_id = %first.itinerary_id,
            chosen = %first.direction,
            others = ?others,
            "Stops of one itinerary disagree on direction"
        );
    }
    first.direction.clone()
}

/// Drops leading and trailing points that are not one of `stop_numbers`, then
/// renumbers densely. Applying it twice changes nothing.
pub fn trim_to_stops(points: Vec<UnifiedPoint>, stop_numbers: &HashSet<&str>) -> Vec<UnifiedPoint> {
    let is_stop = |p: &UnifiedPoint| {
        p.stop_number
            .as_deref()
            .is_some_and(|n| stop_numbers.contains(n))
    };
    let Some(first) = points.iter().position(is_stop) else {
        return Vec::new();
    };
    let last = points.iter().rposition(is_stop).unwrap_or(first);

    let mut trimmed: Vec<UnifiedPoint> = points
        .into_iter()
        .skip(first)
        .take(last - first + 1)
        .collect();
    renumber(&mut trimmed);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::haversine_distance;

    // Roughly 100 m of latitude.
    const STEP: f64 = 0.000_899_3;
    const LAT0: f64 = -25.43;
    const LON0: f64 = -49.27;

    fn shape_point(route_id: i64, order: i64, lat: f64, lon: f64) -> ShapePoint {
        ShapePoint {
            line_number: "303".to_string(),
            route_id,
            order,
            latitude: lat,
            longitude: lon,
        }
    }

    fn straight_shape(route_id: i64, n: i64) -> Vec<ShapePoint> {
        (0..n)
            .map(|i| shape_point(route_id, i, LAT0 + i as f64 * STEP, LON0))
            .collect()
    }

    fn stop(itinerary_id: &str, order: i64, number: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            line_number: "303".to_string(),
            itinerary_id: itinerary_id.to_string(),
            group: String::new(),
            number: number.to_string(),
            name: format!("Stop {number}"),
            stop_type: "Plataforma".to_string(),
            order,
            direction: "Centro".to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    fn assert_dense(points: &[UnifiedPoint]) {
        for (idx, p) in points.iter().enumerate() {
            assert_eq!(p.order, idx);
        }
    }

    #[test]
    fn test_two_stops_trim_outer_shape() {
        let shape = straight_shape(1, 5);
        let stops = vec![
            stop("77", 0, "A", LAT0 + 0.4 * STEP, LON0 + 0.00002),
            stop("77", 1, "B", LAT0 + 2.6 * STEP, LON0 - 0.00002),
        ];

        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        assert_eq!(route.itinerary_id, "77");
        assert_eq!(route.direction, "Centro");
        assert_eq!(route.degenerate_segments, 0);

        let kinds: Vec<Option<&str>> = route
            .points
            .iter()
            .map(|p| p.stop_number.as_deref())
            .collect();
        assert_eq!(kinds, vec![Some("A"), None, None, Some("B")]);
        assert_dense(&route.points);

        assert_eq!(route.points[1].latitude, shape[1].latitude);
        assert_eq!(route.points[2].latitude, shape[2].latitude);
        assert_eq!(route.points[0].stop_name.as_deref(), Some("Stop A"));
        assert_eq!(route.points[0].point_type.as_deref(), Some("Plataforma"));
        assert!(route.points.iter().all(|p| p.direction == "Centro"));
    }

    #[test]
    fn test_unmatched_itinerary() {
        let shape = straight_shape(1, 5);
        let stops = vec![
            stop("77", 0, "A", LAT0 - 5.0 * STEP, LON0),
            stop("77", 1, "B", LAT0 + 9.0 * STEP, LON0),
        ];
        let err = unify_route("303", 1, &shape, &stops, 200.0).unwrap_err();
        assert_eq!(
            err,
            UnifyError::UnmatchedItinerary {
                route_id: 1,
                tolerance_meters: 200.0
            }
        );
    }

    #[test]
    fn test_empty_shape_is_an_error() {
        let stops = vec![stop("77", 0, "A", LAT0, LON0)];
        let err = unify_route("303", 1, &straight_shape(2, 3), &stops, 200.0).unwrap_err();
        assert!(matches!(err, UnifyError::EmptyInput { what: "shape point", .. }));
    }

    #[test]
    fn test_equidistant_stop_takes_earlier_segment() {
        let shape = vec![
            shape_point(1, 0, 0.0, 0.0),
            shape_point(1, 1, 0.0, 0.001),
            shape_point(1, 2, 0.0, 0.002),
        ];
        let s = Coord::new(0.0005, 0.001);
        let segments = vec![
            Segment {
                start_order: 0,
                a: shape[0].coord(),
                b: shape[1].coord(),
            },
            Segment {
                start_order: 1,
                a: shape[1].coord(),
                b: shape[2].coord(),
            },
        ];
        let d0 = point_to_segment_distance(segments[0].a, segments[0].b, s).unwrap();
        let d1 = point_to_segment_distance(segments[1].a, segments[1].b, s).unwrap();
        assert!((d0 - d1).abs() <= TIE_TOLERANCE_METERS);
        assert_eq!(nearest_segment(&segments, s), Some(0));

        // Through the full path: the stop sits between orders 0 and 1 and the
        // trim leaves it alone.
        let stops = vec![stop("5", 0, "X", s.latitude, s.longitude)];
        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        assert_eq!(route.points.len(), 1);
        assert_eq!(route.points[0].stop_number.as_deref(), Some("X"));
    }

    #[test]
    fn test_stops_on_same_segment_sorted_by_number() {
        let shape = straight_shape(1, 3);
        let stops = vec![
            stop("8", 0, "200", LAT0 + 0.2 * STEP, LON0),
            stop("8", 1, "150", LAT0 + 0.6 * STEP, LON0),
            stop("8", 2, "300", LAT0 + 1.8 * STEP, LON0),
        ];
        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        let numbers: Vec<Option<&str>> = route
            .points
            .iter()
            .map(|p| p.stop_number.as_deref())
            .collect();
        assert_eq!(numbers, vec![Some("150"), Some("200"), None, Some("300")]);
        assert_dense(&route.points);
    }

    #[test]
    fn test_degenerate_segment_excluded() {
        let mut shape = straight_shape(1, 4);
        // Duplicate vertex: orders 0..=4 with 1 and 2 at the same place.
        let duplicate = shape_point(1, 2, shape[1].latitude, shape[1].longitude);
        shape.insert(2, duplicate);
        for (idx, p) in shape.iter_mut().enumerate() {
            p.order = idx as i64;
        }
        let stops = vec![
            stop("8", 0, "A", LAT0 + 0.5 * STEP, LON0),
            stop("8", 1, "B", LAT0 + 2.5 * STEP, LON0),
        ];
        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        assert_eq!(route.degenerate_segments, 1);
        assert_eq!(route.points.first().unwrap().stop_number.as_deref(), Some("A"));
        assert_eq!(route.points.last().unwrap().stop_number.as_deref(), Some("B"));
        assert_dense(&route.points);
    }

    #[test]
    fn test_single_point_shape_has_no_segment() {
        let shape = vec![shape_point(1, 0, LAT0, LON0)];
        let stops = vec![stop("8", 0, "A", LAT0, LON0)];
        let err = unify_route("303", 1, &shape, &stops, 200.0).unwrap_err();
        assert_eq!(err, UnifyError::NoUsableSegment { route_id: 1 });
    }

    #[test]
    fn test_conflicting_direction_uses_first_stop() {
        let shape = straight_shape(1, 4);
        let mut stops = vec![
            stop("8", 1, "B", LAT0 + 2.5 * STEP, LON0),
            stop("8", 0, "A", LAT0 + 0.5 * STEP, LON0),
        ];
        stops[0].direction = "Bairro".to_string();
        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        assert_eq!(route.direction, "Centro");
        assert!(route.points.iter().all(|p| p.direction == "Centro"));
    }

    #[test]
    fn test_picks_matching_itinerary_among_several() {
        let shape = straight_shape(1, 5);
        let end = LAT0 + 4.0 * STEP;
        let stops = vec![
            // Opposite direction: endpoints swapped.
            stop("back", 0, "Z", end, LON0),
            stop("back", 1, "Y", LAT0, LON0),
            stop("fwd", 0, "A", LAT0 + 0.1 * STEP, LON0),
            stop("fwd", 1, "B", end - 0.1 * STEP, LON0),
        ];
        let route = unify_route("303", 1, &shape, &stops, 200.0).unwrap();
        assert_eq!(route.itinerary_id, "fwd");
        assert!(route.points.iter().all(|p| p.stop_number.as_deref() != Some("Z")));
        let d = haversine_distance(route.points[0].coord(), stops[2].coord());
        assert!(d < 1e-9);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let shape = straight_shape(1, 6);
        let stops = vec![
            stop("8", 0, "A", LAT0 + 1.5 * STEP, LON0),
            stop("8", 1, "B", LAT0 + 3.5 * STEP, LON0),
        ];
        let route = unify_route("303", 1, &shape, &stops, 400.0).unwrap();
        let numbers: HashSet<&str> = ["A", "B"].into_iter().collect();
        let again = trim_to_stops(route.points.clone(), &numbers);
        assert_eq!(again, route.points);
        assert!(route.points.first().unwrap().is_stop());
        assert!(route.points.last().unwrap().is_stop());
    }

    #[test]
    fn test_trim_without_stops_is_empty() {
        let p = UnifiedPoint {
            line_number: "303".to_string(),
            order: 0,
            latitude: 0.0,
            longitude: 0.0,
            point_type: None,
            stop_number: None,
            stop_name: None,
            direction: "Centro".to_string(),
        };
        let numbers: HashSet<&str> = HashSet::new();
        assert!(trim_to_stops(vec![p.clone(), p], &numbers).is_empty());
    }
}
