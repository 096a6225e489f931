use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use super::FeedSource;
use crate::model::{Line, ShapePoint, Stop};
use crate::store::{LINES_TABLE, SHAPES_TABLE, STOPS_TABLE};

/// Offline feed over the CSV tables written by a snapshot.
///
/// The tables are read once when opened; every request returns owned copies
/// of the rows of one line.
pub struct TableDirFeed {
    lines: Vec<Line>,
    shape_points: Vec<ShapePoint>,
    stops: Vec<Stop>,
}

impl TableDirFeed {
    /// Reads `shapes.csv` and `stops.csv` (required) and `lines.csv` (optional)
    /// from `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let lines_path = table_path(&dir, LINES_TABLE);
        let lines = if lines_path.exists() {
            read_table(&lines_path)?
        } else {
            Vec::new()
        };
        let shape_points = read_table(&table_path(&dir, SHAPES_TABLE))?;
        let stops = read_table(&table_path(&dir, STOPS_TABLE))?;

        info!(
            dir = %dir.display(),
            lines = lines.len(),
            shape_points = shape_points.len(),
            stops = stops.len(),
            "Snapshot tables loaded"
        );
        Ok(Self {
            lines,
            shape_points,
            stops,
        })
    }

    /// Distinct line numbers seen in the shape table, in first-seen order.
    /// Used when the snapshot carries no line catalogue.
    fn lines_from_shapes(&self) -> Vec<Line> {
        let mut numbers: Vec<&str> = Vec::new();
        for p in &self.shape_points {
            if !numbers.contains(&p.line_number.as_str()) {
                numbers.push(&p.line_number);
            }
        }
        numbers
            .into_iter()
            .map(|n| Line {
                line_number: n.to_string(),
                name: String::new(),
                fare_card_only: None,
                service_category: None,
                color: None,
            })
            .collect()
    }
}

fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.csv"))
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("bad row in {}", path.display()))?;
        rows.push(record);
    }
    Ok(rows)
}

#[async_trait]
impl FeedSource for TableDirFeed {
    async fn lines(&self) -> Result<Vec<Line>> {
        if self.lines.is_empty() {
            return Ok(self.lines_from_shapes());
        }
        Ok(self.lines.clone())
    }

    async fn shape_points(&self, line_number: &str) -> Result<Vec<ShapePoint>> {
        Ok(self
            .shape_points
            .iter()
            .filter(|p| p.line_number == line_number)
            .cloned()
            .collect())
    }

    async fn stops(&self, line_number: &str) -> Result<Vec<Stop>> {
        Ok(self
            .stops
            .iter()
            .filter(|s| s.line_number == line_number)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_reads_and_filters_by_line() {
        let dir = temp_dir("route_unifier_test_table_dir");
        fs::write(
            dir.join("shapes.csv"),
            "line_number,route_id,order,latitude,longitude\n\
             022,1,0,-25.1,-49.1\n\
             022,1,1,-25.2,-49.2\n\
             203,7,0,-25.3,-49.3\n",
        )
        .unwrap();
        fs::write(
            dir.join("stops.csv"),
            "line_number,itinerary_id,group,number,name,type,order,direction,latitude,longitude\n\
             022,10,,150,Praça Rui Barbosa,Plataforma,0,Centro,-25.1,-49.1\n\
             203,20,,151,Tubo,Estação tubo,0,Bairro,-25.3,-49.3\n",
        )
        .unwrap();

        let feed = TableDirFeed::open(&dir).unwrap();
        assert_eq!(feed.shape_points("022").await.unwrap().len(), 2);
        let stops = feed.stops("203").await.unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stop_type, "Estação tubo");

        let lines = feed.lines().await.unwrap();
        let numbers: Vec<&str> = lines.iter().map(|l| l.line_number.as_str()).collect();
        assert_eq!(numbers, vec!["022", "203"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_shapes_table_is_an_error() {
        let dir = temp_dir("route_unifier_test_table_dir_missing");
        let err = TableDirFeed::open(&dir).err().unwrap();
        assert!(err.to_string().contains("shapes.csv"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
