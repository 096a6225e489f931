//! Unifies every route variant of a line and stitches the results together.

use tracing::{info, warn};

use crate::error::UnifyError;
use crate::model::{ShapePoint, Stop, UnifiedPoint, renumber};
use crate::unify::unify_route;

/// A route variant that could not be unified.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedVariant {
    pub route_id: i64,
    pub reason: UnifyError,
}

/// Outcome of unifying one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineUnification {
    pub line_number: String,
    /// Concatenation of every unified variant, `order` dense across the line.
    pub points: Vec<UnifiedPoint>,
    pub unified_variants: usize,
    pub skipped: Vec<SkippedVariant>,
    pub degenerate_segments: usize,
}

/// Distinct route ids in first-seen order.
pub fn route_ids(shape_points: &[ShapePoint]) -> Vec<i64> {
    let mut ids = Vec::new();
    for p in shape_points {
        if !ids.contains(&p.route_id) {
            ids.push(p.route_id);
        }
    }
    ids
}

/// Runs [`unify_route`] for each route variant of the line, best effort: a
/// variant that fails is logged and skipped, never fatal to the line.
pub fn unify_line(
    line_number: &str,
    shape_points: &[ShapePoint],
    stops: &[Stop],
    tolerance_meters: f64,
) -> LineUnification {
    let mut result = LineUnification {
        line_number: line_number.to_string(),
        ..Default::default()
    };

    for route_id in route_ids(shape_points) {
        match unify_route(line_number, route_id, shape_points, stops, tolerance_meters) {
            Ok(route) => {
                result.unified_variants += 1;
                result.degenerate_segments += route.degenerate_segments;
                result.points.extend(route.points);
            }
            Err(reason) => {
                warn!(
                    line = line_number,
                    route_id,
                    kind = reason.kind(),
                    reason = %reason,
                    "Route variant skipped"
                );
                result.skipped.push(SkippedVariant { route_id, reason });
            }
        }
    }
    renumber(&mut result.points);

    info!(
        line = line_number,
        unified = result.unified_variants,
        skipped = result.skipped.len(),
        points = result.points.len(),
        "Line unified"
    );
    result
}
