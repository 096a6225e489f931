//! Distances between stops and route shapes.
//!
//! Segments are projected in a locally planar (latitude, longitude) frame,
//! which holds at city scale; the resulting distances are great-circle.

use geo::{Distance, Haversine, Point};

use crate::model::Coord;

/// Squared length, in degrees², below which a segment counts as a point.
const DEGENERATE_LENGTH_SQ: f64 = 1e-18;

/// Where the foot of the perpendicular from a point falls relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// The foot lies on the segment.
    Enclosed(Coord),
    /// The foot lies on the line beyond one of the endpoints.
    Outside,
}

/// Great-circle distance in meters.
pub fn haversine_distance(a: Coord, b: Coord) -> f64 {
    Haversine.distance(to_point(a), to_point(b))
}

fn to_point(c: Coord) -> Point<f64> {
    Point::new(c.longitude, c.latitude)
}

/// Returns true when `a` and `b` are too close to define a direction.
pub fn is_degenerate(a: Coord, b: Coord) -> bool {
    let dlat = b.latitude - a.latitude;
    let dlon = b.longitude - a.longitude;
    dlat * dlat + dlon * dlon < DEGENERATE_LENGTH_SQ
}

/// Projects `s` onto the segment `a`-`b` with a dot product, so horizontal and
/// vertical segments need no special casing. `None` for a degenerate segment.
pub fn project(a: Coord, b: Coord, s: Coord) -> Option<Projection> {
    if is_degenerate(a, b) {
        return None;
    }
    let dlat = b.latitude - a.latitude;
    let dlon = b.longitude - a.longitude;
    let t = ((s.latitude - a.latitude) * dlat + (s.longitude - a.longitude) * dlon)
        / (dlat * dlat + dlon * dlon);

    if (0.0..=1.0).contains(&t) {
        Some(Projection::Enclosed(Coord::new(
            a.latitude + t * dlat,
            a.longitude + t * dlon,
        )))
    } else {
        Some(Projection::Outside)
    }
}

/// Distance in meters between `s` and the segment `a`-`b`.
///
/// When the perpendicular foot lies on the segment this is the great-circle
/// distance to the foot, otherwise the distance to the nearer endpoint.
/// Returns `None` if `a` and `b` coincide.
pub fn point_to_segment_distance(a: Coord, b: Coord, s: Coord) -> Option<f64> {
    let distance = match project(a, b, s)? {
        Projection::Enclosed(foot) => haversine_distance(s, foot),
        Projection::Outside => haversine_distance(s, a).min(haversine_distance(s, b)),
    };
    Some(distance)
}
