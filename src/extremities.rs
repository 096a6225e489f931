//! First and last point of an ordered table slice.

use crate::error::{Boundary, UnifyError};
use crate::model::{Coord, ShapePoint, Stop};

/// A row that belongs to an ordered sequence identified by a key.
pub trait Sequenced {
    /// Key of the sequence the row belongs to (route or itinerary).
    fn sequence_key(&self) -> String;
    fn order(&self) -> i64;
    fn coord(&self) -> Coord;
}

impl Sequenced for ShapePoint {
    fn sequence_key(&self) -> String {
        self.route_id.to_string()
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn coord(&self) -> Coord {
        ShapePoint::coord(self)
    }
}

impl Sequenced for Stop {
    fn sequence_key(&self) -> String {
        self.itinerary_id.clone()
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn coord(&self) -> Coord {
        Stop::coord(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremities {
    pub start: Coord,
    pub end: Coord,
}

/// Finds the rows with minimum and maximum `order` among those whose key
/// equals `id` (compared as strings, so route ids and itinerary ids share one
/// path). Exactly one row must hold each boundary.
pub fn extremities<T: Sequenced>(table: &[T], id: &str) -> Result<Extremities, UnifyError> {
    let rows: Vec<&T> = table.iter().filter(|r| r.sequence_key() == id).collect();

    let (Some(min), Some(max)) = (
        rows.iter().map(|r| r.order()).min(),
        rows.iter().map(|r| r.order()).max(),
    ) else {
        return Err(UnifyError::EmptyInput {
            what: "sequence",
            id: id.to_string(),
        });
    };

    Ok(Extremities {
        start: unique_at(&rows, id, min, Boundary::Start)?,
        end: unique_at(&rows, id, max, Boundary::End)?,
    })
}

fn unique_at<T: Sequenced>(
    rows: &[&T],
    id: &str,
    order: i64,
    boundary: Boundary,
) -> Result<Coord, UnifyError> {
    let mut at = rows.iter().filter(|r| r.order() == order);
    let first = at.next().map(|r| r.coord());
    let extra = at.count();
    match first {
        Some(coord) if extra == 0 => Ok(coord),
        _ => Err(UnifyError::AmbiguousExtremity {
            id: id.to_string(),
            boundary,
            order,
            count: extra + 1,
        }),
    }
}
