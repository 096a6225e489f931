//! Destinations for the tables a run produces.

mod csv;
mod s3;

pub use self::csv::CsvTableStore;
pub use self::s3::S3TableStore;

use anyhow::Result;
use serde::Serialize;

pub const LINES_TABLE: &str = "lines";
pub const SHAPES_TABLE: &str = "shapes";
pub const STOPS_TABLE: &str = "stops";
pub const ROUTES_UNIFIED_TABLE: &str = "routes_unified";
pub const RUNS_TABLE: &str = "unify_runs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop whatever the table held before.
    Replace,
    /// Keep existing rows and add these after them.
    Append,
}

/// Persists named tables of serializable rows.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    /// Writes `rows` to `table` and returns how many were written.
    async fn write_table<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
        mode: WriteMode,
    ) -> Result<usize>;
}
