//! Fan-out/fan-in over lines.
//!
//! Each line is fetched and unified in its own task; results are gathered
//! back in the order the lines were requested.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info};

use crate::config::UnifyConfig;
use crate::feed::FeedSource;
use crate::line::{LineUnification, unify_line};
use crate::model::UnifiedPoint;
use crate::stats::RunStats;

/// Everything a batch run produced.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Unified points of every line, lines in request order.
    pub points: Vec<UnifiedPoint>,
    pub stats: RunStats,
}

/// Unifies `lines` using at most `concurrency` tasks at a time.
///
/// A line whose rows can't be fetched is logged and counted as failed.
#[tracing::instrument(skip(source, lines, config), fields(line_count = lines.len(), tolerance = config.tolerance_meters))]
pub async fn unify_lines(
    source: Arc<dyn FeedSource>,
    lines: Vec<String>,
    config: UnifyConfig,
    concurrency: usize,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(lines.len());

    for line in &lines {
        let sem = semaphore.clone();
        let source = source.clone();
        let line = line.clone();
        let line_span = tracing::info_span!("unify_line", line = %line);

        let task = tokio::spawn(
            async move { process_line(&sem, source.as_ref(), &line, config.tolerance_meters).await }
                .instrument(line_span),
        );
        tasks.push(task);
    }

    let mut stats = RunStats::new(lines.len(), config.tolerance_meters);
    let mut points = Vec::new();
    for (line, task) in lines.iter().zip(tasks) {
        match task.await {
            Ok(Ok(unified)) => {
                stats.record_line(&unified);
                points.extend(unified.points);
            }
            Ok(Err(e)) => {
                error!(line = %line, error = format!("{e:#}"), "Line failed");
                stats.record_failed_line();
            }
            Err(e) => {
                error!(line = %line, error = %e, "Line task aborted");
                stats.record_failed_line();
            }
        }
    }

    info!(
        lines_unified = stats.lines_unified,
        lines_failed = stats.lines_failed,
        variants_unified = stats.variants_unified,
        variants_skipped = stats.variants_skipped,
        points = stats.points,
        line_success_pct = format!("{:.1}", stats.line_success_pct()),
        "Batch finished"
    );
    BatchOutcome { points, stats }
}

async fn process_line(
    semaphore: &Semaphore,
    source: &dyn FeedSource,
    line: &str,
    tolerance_meters: f64,
) -> Result<LineUnification> {
    let _permit = semaphore.acquire().await?;

    let shape_points = source
        .shape_points(line)
        .await
        .context("failed to fetch shape points")?;
    let stops = source.stops(line).await.context("failed to fetch stops")?;

    Ok(unify_line(line, &shape_points, &stops, tolerance_meters))
}
