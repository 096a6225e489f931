//! CSV serialization of output rows.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Appends rows to a CSV file, writing the header only if the file is new.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = rows.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    serialize_rows(writer, rows)
}

/// Replaces the contents of a CSV file with `rows`.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    serialize_rows(WriterBuilder::new().from_writer(file), rows)
}

/// Encodes rows as a CSV document with a header line.
pub fn to_csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish CSV buffer: {}", e.error()))
}

fn serialize_rows<W: Write, T: Serialize>(mut writer: csv::Writer<W>, rows: &[T]) -> Result<usize> {
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
