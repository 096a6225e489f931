//! Records exchanged between the feed, the unifier and the table store.

use serde::{Deserialize, Serialize};

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One vertex of a route variant's polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    pub line_number: String,
    pub route_id: i64,
    /// 0-based position along the variant; defines the polyline direction.
    pub order: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl ShapePoint {
    pub fn coord(&self) -> Coord {
        Coord::new(self.latitude, self.longitude)
    }
}

/// A passenger stop as listed in one itinerary of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub line_number: String,
    pub itinerary_id: String,
    pub group: String,
    pub number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub stop_type: String,
    pub order: i64,
    pub direction: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Stop {
    pub fn coord(&self) -> Coord {
        Coord::new(self.latitude, self.longitude)
    }
}

/// Line catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub line_number: String,
    pub name: String,
    pub fare_card_only: Option<String>,
    pub service_category: Option<String>,
    pub color: Option<String>,
}

/// A point of a unified route: either pure shape geometry or a stop placed on
/// the shape. The stop fields are all set or all empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPoint {
    pub line_number: String,
    pub order: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub point_type: Option<String>,
    pub stop_number: Option<String>,
    pub stop_name: Option<String>,
    pub direction: String,
}

impl UnifiedPoint {
    pub fn is_stop(&self) -> bool {
        self.stop_number.is_some()
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.latitude, self.longitude)
    }
}

/// Rewrites `order` densely from 0 in slice order.
pub fn renumber(points: &mut [UnifiedPoint]) {
    for (idx, point) in points.iter_mut().enumerate() {
        point.order = idx;
    }
}
