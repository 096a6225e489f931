use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnifyError;
use crate::line::LineUnification;

/// Summary of one unification run, appended to the run history table.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub tolerance_meters: f64,

    // lines
    pub lines_requested: usize,
    pub lines_unified: usize,
    pub lines_failed: usize,

    // route variants
    pub variants_unified: usize,
    pub variants_skipped: usize,
    pub skipped_ambiguous_extremity: usize,
    pub skipped_unmatched_itinerary: usize,
    pub skipped_empty_input: usize,
    pub skipped_no_usable_segment: usize,
    pub degenerate_segments: usize,

    pub points: usize,
}

impl RunStats {
    pub fn new(lines_requested: usize, tolerance_meters: f64) -> Self {
        RunStats {
            timestamp: Utc::now(),
            tolerance_meters,
            lines_requested,
            ..Default::default()
        }
    }

    /// Folds one line's outcome into the totals. A line counts as unified when
    /// at least one of its variants was.
    pub fn record_line(&mut self, line: &LineUnification) {
        if line.unified_variants > 0 {
            self.lines_unified += 1;
        } else {
            self.lines_failed += 1;
        }
        self.variants_unified += line.unified_variants;
        self.variants_skipped += line.skipped.len();
        self.degenerate_segments += line.degenerate_segments;
        self.points += line.points.len();

        for skipped in &line.skipped {
            match skipped.reason {
                UnifyError::AmbiguousExtremity { .. } => self.skipped_ambiguous_extremity += 1,
                UnifyError::UnmatchedItinerary { .. } => self.skipped_unmatched_itinerary += 1,
                UnifyError::EmptyInput { .. } => self.skipped_empty_input += 1,
                UnifyError::NoUsableSegment { .. } => self.skipped_no_usable_segment += 1,
                // Only ever excluded per segment, never returned for a variant.
                UnifyError::DegenerateSegment { .. } => self.degenerate_segments += 1,
            }
        }
    }

    /// A line whose rows could not be fetched at all.
    pub fn record_failed_line(&mut self) {
        self.lines_failed += 1;
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn line_success_pct(&self) -> f64 {
        Self::pct(self.lines_unified, self.lines_requested)
    }

    pub fn variant_success_pct(&self) -> f64 {
        Self::pct(
            self.variants_unified,
            self.variants_unified + self.variants_skipped,
        )
    }
}
