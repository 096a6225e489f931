use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{TableStore, WriteMode};
use crate::output::{append_rows, write_rows};

/// One `<table>.csv` file per table inside a directory.
pub struct CsvTableStore {
    dir: PathBuf,
}

impl CsvTableStore {
    /// Creates the directory if it doesn't exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }
}

#[async_trait]
impl TableStore for CsvTableStore {
    #[tracing::instrument(skip(self, rows), fields(row_count = rows.len()))]
    async fn write_table<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
        mode: WriteMode,
    ) -> Result<usize> {
        let path = self.table_path(table);
        let written = match mode {
            WriteMode::Replace => write_rows(&path, rows),
            WriteMode::Append => append_rows(&path, rows),
        }
        .with_context(|| format!("failed to write {}", path.display()))?;

        info!(path = %path.display(), written, ?mode, "Table written");
        Ok(written)
    }
}
