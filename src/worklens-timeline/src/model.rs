//! Data shapes shared across the pipeline stages
//!
//! All of these serialize to the wire layout the artifact consumers
//! expect, so field names follow the JSON contract rather than being
//! abbreviated.

use serde::{Deserialize, Serialize};

/// One per-screenshot result in the analysis report.
///
/// A screenshot either produced a model classification or an error
/// record; the two shapes share only the derived local clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineEntry {
    /// Successful classification. `analysis` is the raw model reply,
    /// possibly wrapped in a markdown code fence.
    Classified {
        time_from_start: Option<String>,
        analysis: String,
    },
    /// Per-image failure. The batch continues; this entry is excluded
    /// from every derived view.
    Failed {
        time_from_start: Option<String>,
        filename: String,
        error: String,
        processed_at: String,
    },
}

impl TimelineEntry {
    /// Local clock time ("HH:MM:SS") derived from the filename, if any.
    pub fn time_from_start(&self) -> Option<&str> {
        match self {
            TimelineEntry::Classified { time_from_start, .. }
            | TimelineEntry::Failed { time_from_start, .. } => time_from_start.as_deref(),
        }
    }
}

/// Full classification run for one submission (`analysis/{id}.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timeline: Vec<TimelineEntry>,
    pub total_screenshots: usize,
    pub processing_time: String,
    pub last_updated: String,
}

/// Parsed form of one entry's `analysis` payload.
///
/// Both fields are required: an entry missing either is treated as a
/// parse failure and skipped from every derived view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub activity: String,
    pub open_windows: Vec<WindowObservation>,
}

/// One open application/window the model saw in a screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowObservation {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub action: String,
    /// Human-typed prompt text, present only when an authored input box
    /// was visibly captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Metadata attached identically to every derived artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_screenshots: usize,
    pub processing_time: String,
    pub last_updated: String,
    /// Detected sampling interval in seconds.
    pub time_interval: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_unit: Option<String>,
}

impl Metadata {
    /// Build artifact metadata from a report plus the detected interval.
    pub fn from_report(report: &AnalysisReport, time_interval: i64) -> Self {
        Self {
            total_screenshots: report.total_screenshots,
            processing_time: report.processing_time.clone(),
            last_updated: report.last_updated.clone(),
            time_interval,
            duration_unit: None,
        }
    }
}

/// One prompt captured from a window observation, with its sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub time_from_start: Option<String>,
    pub prompt: String,
}

/// Raw (or model-merged) prompt timeline artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTimeline {
    pub prompts_timeline: Vec<PromptEntry>,
    pub metadata: Metadata,
}

/// One (time, app, action) triple in the deduplicated timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppActionEntry {
    pub time: Option<String>,
    pub app: String,
    pub action: String,
}

impl AppActionEntry {
    /// Dedup key: adjacent entries with the same app and action collapse.
    pub fn same_observation(&self, other: &AppActionEntry) -> bool {
        self.app == other.app && self.action == other.action
    }
}

/// App/action timeline artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppActionTimeline {
    pub app_actions_timeline: Vec<AppActionEntry>,
    pub metadata: Metadata,
}

/// Activity duration artifact. The map is ordered: top five activities
/// descending by duration, then an optional "Other" bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpentReport {
    pub activity_durations: serde_json::Map<String, serde_json::Value>,
    pub metadata: Metadata,
}

/// One narrative block in the model-summarized timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBlock {
    pub activity: String,
    pub time: Option<String>,
    pub details: Vec<String>,
}
