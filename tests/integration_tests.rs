use route_unifier::batch::unify_lines;
use route_unifier::config::UnifyConfig;
use route_unifier::feed::raw::{self, RawLine, RawShapePoint, RawStop};
use route_unifier::feed::{FeedSource, TableDirFeed};
use route_unifier::line::unify_line;
use route_unifier::model::{Line, ShapePoint, Stop};
use route_unifier::store::{
    CsvTableStore, LINES_TABLE, ROUTES_UNIFIED_TABLE, SHAPES_TABLE, STOPS_TABLE, TableStore,
    WriteMode,
};
use std::fs;
use std::sync::Arc;

fn fixture_lines() -> Vec<Line> {
    let raw: Vec<RawLine> =
        serde_json::from_str(include_str!("fixtures/linhas.json")).expect("Failed to parse lines");
    raw::lines(raw)
}

fn fixture_shape() -> Vec<ShapePoint> {
    let raw: Vec<RawShapePoint> =
        serde_json::from_str(include_str!("fixtures/shape_022.json")).expect("Failed to parse shape");
    raw::shape_points("022", raw)
}

fn fixture_stops() -> Vec<Stop> {
    let raw: Vec<RawStop> =
        serde_json::from_str(include_str!("fixtures/pontos_022.json")).expect("Failed to parse stops");
    raw::stops("022", raw)
}

#[test]
fn test_feed_payload_unifies_both_directions() {
    let line = unify_line("022", &fixture_shape(), &fixture_stops(), 200.0);

    assert_eq!(line.unified_variants, 2);
    assert!(line.skipped.is_empty());

    let numbers: Vec<Option<&str>> = line.points.iter().map(|p| p.stop_number.as_deref()).collect();
    assert_eq!(
        numbers,
        vec![
            Some("110011"),
            None,
            None,
            None,
            Some("110012"),
            Some("120021"),
            None,
            None,
            None,
            Some("120022"),
        ]
    );
    assert!(line.points[..5].iter().all(|p| p.direction == "Centro"));
    assert!(line.points[5..].iter().all(|p| p.direction == "Bairro"));
    for (idx, p) in line.points.iter().enumerate() {
        assert_eq!(p.order, idx);
    }
}

#[test]
fn test_tight_tolerance_skips_everything() {
    // Both itineraries end ~150 m from their shape's last vertex.
    let line = unify_line("022", &fixture_shape(), &fixture_stops(), 100.0);
    assert_eq!(line.unified_variants, 0);
    assert_eq!(line.skipped.len(), 2);
    assert!(line.points.is_empty());
}

#[tokio::test]
async fn test_snapshot_then_batch_unify() {
    let dir = std::env::temp_dir().join("route_unifier_integration_snapshot");
    let _ = fs::remove_dir_all(&dir);
    let store = CsvTableStore::new(&dir).unwrap();

    store.write_table(LINES_TABLE, &fixture_lines(), WriteMode::Replace).await.unwrap();
    store.write_table(SHAPES_TABLE, &fixture_shape(), WriteMode::Replace).await.unwrap();
    store.write_table(STOPS_TABLE, &fixture_stops(), WriteMode::Replace).await.unwrap();

    let source: Arc<dyn FeedSource> = Arc::new(TableDirFeed::open(&dir).unwrap());
    let lines: Vec<String> = source
        .lines()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.line_number)
        .collect();
    assert_eq!(lines, vec!["022", "203"]);

    let outcome = unify_lines(source, lines, UnifyConfig::default(), 2).await;
    // 203 has no shape in the snapshot.
    assert_eq!(outcome.stats.lines_unified, 1);
    assert_eq!(outcome.stats.lines_failed, 1);
    assert_eq!(outcome.stats.variants_unified, 2);
    assert_eq!(outcome.points.len(), 10);

    store
        .write_table(ROUTES_UNIFIED_TABLE, &outcome.points, WriteMode::Replace)
        .await
        .unwrap();
    let written = fs::read_to_string(store.table_path(ROUTES_UNIFIED_TABLE)).unwrap();
    assert_eq!(written.lines().count(), 11);
    assert!(written.contains("Rua Padre Anchieta, 1200"));

    fs::remove_dir_all(&dir).unwrap();
}
