use std::fmt;

/// Which end of an ordered table an extremity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "start"),
            Boundary::End => write!(f, "end"),
        }
    }
}

/// Reasons a single route variant cannot be unified. None of these abort a
/// line; the orchestrator logs and skips the variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UnifyError {
    #[error("{count} rows of '{id}' share the {boundary} order {order}")]
    AmbiguousExtremity {
        id: String,
        boundary: Boundary,
        order: i64,
        count: usize,
    },
    #[error("no itinerary has both endpoints within {tolerance_meters} m of route {route_id}")]
    UnmatchedItinerary { route_id: i64, tolerance_meters: f64 },
    #[error("no {what} rows for '{id}'")]
    EmptyInput { what: &'static str, id: String },
    #[error("shape points at orders {from_order} and {to_order} coincide")]
    DegenerateSegment { from_order: i64, to_order: i64 },
    #[error("every segment of route {route_id} is degenerate or missing")]
    NoUsableSegment { route_id: i64 },
}

impl UnifyError {
    /// Short stable label, used as a counter key in run statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            UnifyError::AmbiguousExtremity { .. } => "ambiguous_extremity",
            UnifyError::UnmatchedItinerary { .. } => "unmatched_itinerary",
            UnifyError::EmptyInput { .. } => "empty_input",
            UnifyError::DegenerateSegment { .. } => "degenerate_segment",
            UnifyError::NoUsableSegment { .. } => "no_usable_segment",
        }
    }
}
