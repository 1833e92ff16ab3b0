//! Per-screenshot classifier fan-out
//!
//! Launches one vision request per screenshot under a semaphore cap,
//! gathers all results, and re-sorts them by capture instant (completion
//! order carries no meaning). A failing image becomes an error entry in
//! the report; it never fails the batch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use worklens_timeline::{AnalysisReport, TimelineEntry};
use worklens_vision::{capture_timestamp, local_clock_time, OpenAiClient};

use crate::config::Config;

/// Classifies a folder of screenshots with the vision model.
pub struct Classifier {
    client: Arc<OpenAiClient>,
    model: String,
    utc_offset_hours: i32,
    utc_offset_minutes: i32,
    max_concurrent: usize,
    image_range: Option<(usize, usize)>,
}

impl Classifier {
    pub fn new(client: Arc<OpenAiClient>, config: &Config) -> Self {
        Self {
            client,
            model: config.vision_model.clone(),
            utc_offset_hours: config.utc_offset_hours,
            utc_offset_minutes: config.utc_offset_minutes,
            max_concurrent: config.max_concurrent_requests,
            image_range: config.image_range,
        }
    }

    /// Classify every screenshot in `folder` and write the report to
    /// `results_file`.
    pub async fn analyze_screenshots(
        &self,
        folder: &Path,
        results_file: &Path,
    ) -> Result<AnalysisReport> {
        let images = list_screenshots(folder).await?;
        let total_screenshots = images.len();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let started = Instant::now();

        let tasks: Vec<_> = images
            .into_iter()
            .enumerate()
            .filter(|(ordinal, _)| in_range(*ordinal, self.image_range))
            .map(|(_, name)| self.classify_one(folder.join(&name), name, semaphore.clone()))
            .collect();

        info!(
            "classifying {} of {} screenshots (cap {})",
            tasks.len(),
            total_screenshots,
            self.max_concurrent
        );

        let mut results = join_all(tasks).await;
        // Completion order is arbitrary; restore capture order. Entries
        // without a parseable capture instant sort first, stably.
        results.sort_by_key(|(captured, _)| *captured);
        let timeline: Vec<TimelineEntry> = results.into_iter().map(|(_, entry)| entry).collect();

        let report = AnalysisReport {
            timeline,
            total_screenshots,
            processing_time: format!("{:.2} seconds", started.elapsed().as_secs_f64()),
            last_updated: Utc::now().to_rfc3339(),
        };

        if let Some(parent) = results_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(results_file, json)
            .await
            .with_context(|| format!("writing {}", results_file.display()))?;

        info!(
            "classification finished in {} ({} entries)",
            report.processing_time,
            report.timeline.len()
        );
        Ok(report)
    }

    /// Classify a single screenshot under the shared semaphore.
    ///
    /// Returns the capture instant (for re-sorting) alongside the entry.
    async fn classify_one(
        &self,
        path: PathBuf,
        filename: String,
        semaphore: Arc<Semaphore>,
    ) -> (Option<DateTime<Utc>>, TimelineEntry) {
        let captured = capture_timestamp(&filename);
        let time_from_start = captured
            .and_then(|ts| local_clock_time(ts, self.utc_offset_hours, self.utc_offset_minutes));

        let _permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                // Only possible if the semaphore is closed, which we never do.
                return (
                    captured,
                    failed_entry(time_from_start, filename, "classifier shut down".to_string()),
                );
            }
        };

        match self.request_classification(&path).await {
            Ok(analysis) => {
                debug!("classified {filename}");
                (
                    captured,
                    TimelineEntry::Classified {
                        time_from_start,
                        analysis,
                    },
                )
            }
            Err(e) => {
                warn!("failed to classify {filename}: {e:#}");
                (captured, failed_entry(time_from_start, filename, format!("{e:#}")))
            }
        }
    }

    async fn request_classification(&self, path: &Path) -> Result<String> {
        let jpeg = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let analysis = self.client.classify_screenshot(&self.model, &jpeg).await?;
        Ok(analysis)
    }
}

fn failed_entry(
    time_from_start: Option<String>,
    filename: String,
    error: String,
) -> TimelineEntry {
    TimelineEntry::Failed {
        time_from_start,
        filename,
        error,
        processed_at: Utc::now().to_rfc3339(),
    }
}

/// List `*.jpg` filenames in a folder, lexically sorted. The fixed-width
/// timestamp encoding makes lexical order chronological.
async fn list_screenshots(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .with_context(|| format!("listing {}", folder.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".jpg") {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Inclusive ordinal range filter; no range means everything.
fn in_range(ordinal: usize, range: Option<(usize, usize)>) -> bool {
    match range {
        Some((start, end)) => ordinal >= start && ordinal <= end,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_filter_is_inclusive() {
        assert!(in_range(0, None));
        assert!(in_range(5, Some((5, 10))));
        assert!(in_range(10, Some((5, 10))));
        assert!(!in_range(4, Some((5, 10))));
        assert!(!in_range(11, Some((5, 10))));
    }

    #[test]
    fn results_sort_by_capture_instant_with_unknowns_first() {
        let entry = |time: Option<&str>| TimelineEntry::Classified {
            time_from_start: time.map(str::to_string),
            analysis: "{}".to_string(),
        };
        let mut results = vec![
            (capture_timestamp("20240115103005000.jpg"), entry(Some("16:00:05"))),
            (None, entry(None)),
            (capture_timestamp("20240115103000000.jpg"), entry(Some("16:00:00"))),
        ];
        results.sort_by_key(|(captured, _)| *captured);

        assert!(results[0].0.is_none());
        assert_eq!(
            results[1].1.time_from_start(),
            Some("16:00:00")
        );
        assert_eq!(
            results[2].1.time_from_start(),
            Some("16:00:05")
        );
    }

    #[tokio::test]
    async fn screenshot_listing_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("worklens-list-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for name in [
            "20240115103005000.jpg",
            "20240115103000000.jpg",
            "notes.txt",
        ] {
            tokio::fs::write(dir.join(name), b"x").await.unwrap();
        }

        let names = list_screenshots(&dir).await.unwrap();
        assert_eq!(
            names,
            vec![
                "20240115103000000.jpg".to_string(),
                "20240115103005000.jpg".to_string(),
            ]
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
