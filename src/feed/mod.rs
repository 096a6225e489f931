//! Sources of line, shape and stop records.

pub mod raw;
mod table_dir;
mod urbs;

pub use table_dir::TableDirFeed;
pub use urbs::{DEFAULT_BASE_URL, UrbsFeed};

use anyhow::Result;

use crate::model::{Line, ShapePoint, Stop};

/// Provides the records a unification run consumes, one line at a time.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// The line catalogue.
    async fn lines(&self) -> Result<Vec<Line>>;

    /// All shape points of every route variant of `line_number`.
    async fn shape_points(&self, line_number: &str) -> Result<Vec<ShapePoint>>;

    /// All stops of every itinerary of `line_number`.
    async fn stops(&self, line_number: &str) -> Result<Vec<Stop>>;
}
