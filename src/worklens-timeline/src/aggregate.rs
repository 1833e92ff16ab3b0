//! Timeline aggregation
//!
//! Consumes an ordered classification report and produces the derived
//! views: per-activity duration totals, the raw prompt timeline, and the
//! consecutively-deduplicated app/action timeline. Entries whose payload
//! fails to parse are skipped with a warning and excluded from every
//! view; aggregation itself never fails.

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::model::{
    AnalysisReport, AppActionEntry, AppActionTimeline, Classification, Metadata, PromptEntry,
    PromptTimeline, TimeSpentReport, TimelineEntry,
};

/// Fallback sampling interval when it cannot be detected.
const DEFAULT_INTERVAL_SECS: i64 = 5;

/// How many activities keep their own duration bucket; the rest are
/// summed into "Other".
const TOP_ACTIVITY_COUNT: usize = 5;

/// Aggregated views of one submission's classification run.
#[derive(Debug, Clone)]
pub struct TimelineAnalysis {
    /// (activity, accumulated seconds), in first-seen order.
    pub activity_seconds: Vec<(String, i64)>,
    pub prompts: Vec<PromptEntry>,
    pub app_actions: Vec<AppActionEntry>,
    pub metadata: Metadata,
}

impl TimelineAnalysis {
    /// Activity durations in minutes: top five descending, remainder
    /// summed into "Other" (omitted when there is no remainder).
    pub fn time_spent_report(&self) -> TimeSpentReport {
        let mut minutes: Vec<(String, f64)> = self
            .activity_seconds
            .iter()
            .map(|(activity, secs)| (activity.clone(), round2(*secs as f64 / 60.0)))
            .collect();
        // Stable sort: ties keep first-seen order.
        minutes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut activity_durations = Map::new();
        for (activity, mins) in minutes.iter().take(TOP_ACTIVITY_COUNT) {
            activity_durations.insert(activity.clone(), json_number(*mins));
        }
        let other: f64 = minutes.iter().skip(TOP_ACTIVITY_COUNT).map(|(_, m)| *m).sum();
        if other > 0.0 {
            activity_durations.insert("Other".to_string(), json_number(round2(other)));
        }

        let mut metadata = self.metadata.clone();
        metadata.duration_unit = Some("minutes".to_string());

        TimeSpentReport {
            activity_durations,
            metadata,
        }
    }

    pub fn prompt_timeline(&self) -> PromptTimeline {
        PromptTimeline {
            prompts_timeline: self.prompts.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn app_action_timeline(&self) -> AppActionTimeline {
        AppActionTimeline {
            app_actions_timeline: self.app_actions.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Detect the sampling interval from the first two parseable clock times.
///
/// Parses the full "HH:MM:SS" value (not just the seconds digits, so a
/// pair straddling a minute boundary still measures correctly) and falls
/// back to 5 seconds when fewer than two entries parse or the difference
/// is not positive.
pub fn detect_interval(timeline: &[TimelineEntry]) -> i64 {
    let mut times = timeline
        .iter()
        .filter_map(|entry| entry.time_from_start())
        .filter_map(parse_clock_seconds);

    match (times.next(), times.next()) {
        (Some(first), Some(second)) if second > first => {
            let interval = second - first;
            debug!("detected sampling interval of {interval}s");
            interval
        }
        _ => {
            debug!("could not detect sampling interval, assuming {DEFAULT_INTERVAL_SECS}s");
            DEFAULT_INTERVAL_SECS
        }
    }
}

/// Seconds since midnight for an "HH:MM:SS" string.
fn parse_clock_seconds(clock: &str) -> Option<i64> {
    let mut parts = clock.splitn(3, ':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Strip an optional markdown code fence from a model reply.
pub fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

/// Aggregate a classification report into the derived timeline views.
///
/// Walks the timeline once in report order. Failed entries and entries
/// whose fenced JSON does not parse into a [`Classification`] contribute
/// to nothing; everything else feeds all three views.
pub fn aggregate(report: &AnalysisReport) -> TimelineAnalysis {
    let interval = detect_interval(&report.timeline);

    let mut activity_counts: Vec<(String, i64)> = Vec::new();
    let mut prompts: Vec<PromptEntry> = Vec::new();
    let mut app_actions: Vec<AppActionEntry> = Vec::new();

    for entry in &report.timeline {
        let (time_from_start, analysis) = match entry {
            TimelineEntry::Classified {
                time_from_start,
                analysis,
            } => (time_from_start, analysis),
            TimelineEntry::Failed { filename, .. } => {
                debug!("skipping error entry for {filename}");
                continue;
            }
        };

        let classification: Classification =
            match serde_json::from_str(strip_code_fence(analysis)) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping timeline entry with unparseable analysis: {e}");
                    continue;
                }
            };

        match activity_counts
            .iter()
            .position(|(activity, _)| *activity == classification.activity)
        {
            Some(pos) => activity_counts[pos].1 += 1,
            None => activity_counts.push((classification.activity.clone(), 1)),
        }

        for window in &classification.open_windows {
            if let Some(prompt) = window.prompt.as_deref() {
                if !prompt.is_empty() {
                    prompts.push(PromptEntry {
                        time_from_start: time_from_start.clone(),
                        prompt: prompt.to_string(),
                    });
                }
            }

            let candidate = AppActionEntry {
                time: time_from_start.clone(),
                app: window.app.clone(),
                action: window.action.clone(),
            };
            // Dedup against the immediately preceding emitted entry only;
            // non-adjacent repeats are preserved.
            let duplicate = app_actions
                .last()
                .is_some_and(|previous| previous.same_observation(&candidate));
            if !duplicate {
                app_actions.push(candidate);
            }
        }
    }

    let activity_seconds = activity_counts
        .into_iter()
        .map(|(activity, count)| (activity, count * interval))
        .collect();

    TimelineAnalysis {
        activity_seconds,
        prompts,
        app_actions,
        metadata: Metadata::from_report(report, interval),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn json_number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classified(time: &str, activity: &str, windows: Value) -> TimelineEntry {
        TimelineEntry::Classified {
            time_from_start: Some(time.to_string()),
            analysis: json!({ "activity": activity, "open_windows": windows }).to_string(),
        }
    }

    fn report(timeline: Vec<TimelineEntry>) -> AnalysisReport {
        AnalysisReport {
            total_screenshots: timeline.len(),
            timeline,
            processing_time: "1.00 seconds".to_string(),
            last_updated: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn interval_from_first_two_entries() {
        let entries = vec![
            classified("00:00:05", "Coding", json!([])),
            classified("00:00:10", "Coding", json!([])),
        ];
        assert_eq!(detect_interval(&entries), 5);
    }

    #[test]
    fn interval_defaults_with_fewer_than_two_entries() {
        assert_eq!(detect_interval(&[]), 5);
        let one = vec![classified("00:00:05", "Coding", json!([]))];
        assert_eq!(detect_interval(&one), 5);
    }

    #[test]
    fn interval_survives_minute_boundary() {
        let entries = vec![
            classified("10:14:55", "Coding", json!([])),
            classified("10:15:05", "Coding", json!([])),
        ];
        assert_eq!(detect_interval(&entries), 10);
    }

    #[test]
    fn interval_defaults_on_unparseable_times() {
        let entries = vec![
            classified("garbage", "Coding", json!([])),
            classified("also bad", "Coding", json!([])),
        ];
        assert_eq!(detect_interval(&entries), 5);
    }

    #[test]
    fn fence_stripping() {
        assert_eq!(
            strip_code_fence("```json\n{\"a\":1}\n```"),
            "{\"a\":1}"
        );
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[test]
    fn activity_durations_match_count_times_interval() {
        let entries = vec![
            classified("00:00:05", "Coding", json!([])),
            classified("00:00:10", "Coding", json!([])),
            classified("00:00:15", "Reading Documentation", json!([])),
        ];
        let analysis = aggregate(&report(entries));

        let total: i64 = analysis.activity_seconds.iter().map(|(_, s)| s).sum();
        assert_eq!(total, 3 * 5);
        assert_eq!(
            analysis.activity_seconds,
            vec![
                ("Coding".to_string(), 10),
                ("Reading Documentation".to_string(), 5),
            ]
        );
    }

    #[test]
    fn minutes_are_rounded_to_two_decimals() {
        let entries = vec![
            classified("00:00:05", "Coding", json!([])),
            classified("00:00:10", "Coding", json!([])),
            classified("00:00:15", "Reading Documentation", json!([])),
        ];
        let spent = aggregate(&report(entries)).time_spent_report();

        assert_eq!(spent.activity_durations["Coding"], json!(0.17));
        assert_eq!(spent.activity_durations["Reading Documentation"], json!(0.08));
        assert!(!spent.activity_durations.contains_key("Other"));
        assert_eq!(spent.metadata.duration_unit.as_deref(), Some("minutes"));
        assert_eq!(spent.metadata.time_interval, 5);
    }

    #[test]
    fn top_five_plus_other() {
        let mut entries = Vec::new();
        let mut time = 0;
        // Seven distinct activities with descending occurrence counts.
        for (activity, count) in [
            ("Coding", 7),
            ("Testing", 6),
            ("Google Search", 5),
            ("Reading Documentation", 4),
            ("Interacting with AI Chatbot", 3),
            ("Creating Document", 2),
            ("Watching video tutorial", 1),
        ] {
            for _ in 0..count {
                time += 5;
                entries.push(classified(&format!("00:{:02}:{:02}", time / 60, time % 60), activity, json!([])));
            }
        }
        let spent = aggregate(&report(entries)).time_spent_report();

        assert_eq!(spent.activity_durations.len(), 6);
        let keys: Vec<&String> = spent.activity_durations.keys().collect();
        assert_eq!(keys[0], "Coding");
        assert_eq!(keys[5], "Other");
        // 2 + 1 occurrences at 5s each: 15s = 0.25 minutes.
        assert_eq!(spent.activity_durations["Other"], json!(0.25));
    }

    #[test]
    fn no_other_bucket_for_five_or_fewer_activities() {
        let entries = vec![
            classified("00:00:05", "Coding", json!([])),
            classified("00:00:10", "Testing", json!([])),
            classified("00:00:15", "Google Search", json!([])),
            classified("00:00:20", "Reading Documentation", json!([])),
            classified("00:00:25", "Other stuff", json!([])),
        ];
        let spent = aggregate(&report(entries)).time_spent_report();
        assert_eq!(spent.activity_durations.len(), 5);
        assert!(!spent.activity_durations.contains_key("Other"));
    }

    #[test]
    fn adjacent_app_actions_deduplicate_but_nonadjacent_survive() {
        let window_a = json!([{ "app": "VS Code", "action": "editing main.rs" }]);
        let window_b = json!([{ "app": "Chrome", "action": "reading docs" }]);
        let entries = vec![
            classified("00:00:05", "Coding", window_a.clone()),
            classified("00:00:10", "Coding", window_a.clone()),
            classified("00:00:15", "Reading Documentation", window_b),
            classified("00:00:20", "Coding", window_a),
        ];
        let analysis = aggregate(&report(entries));

        assert_eq!(analysis.app_actions.len(), 3);
        for pair in analysis.app_actions.windows(2) {
            assert!(!pair[0].same_observation(&pair[1]));
        }
        // A, B, A is not collapsed to A, B.
        assert_eq!(analysis.app_actions[0].app, "VS Code");
        assert_eq!(analysis.app_actions[1].app, "Chrome");
        assert_eq!(analysis.app_actions[2].app, "VS Code");
    }

    #[test]
    fn prompts_are_collected_in_order_without_dedup() {
        let entries = vec![
            classified(
                "00:00:05",
                "Interacting with AI Chatbot",
                json!([{ "app": "ChatGPT", "action": "asking", "prompt": "fix my borrow error" }]),
            ),
            classified(
                "00:00:10",
                "Coding",
                json!([
                    { "app": "VS Code", "action": "editing" },
                    { "app": "Copilot", "action": "chatting", "prompt": "write a test" },
                ]),
            ),
            classified(
                "00:00:15",
                "Interacting with AI Chatbot",
                json!([{ "app": "ChatGPT", "action": "asking", "prompt": "fix my borrow error" }]),
            ),
            // Empty prompt text is not collected.
            classified(
                "00:00:20",
                "Coding",
                json!([{ "app": "VS Code", "action": "editing", "prompt": "" }]),
            ),
        ];
        let analysis = aggregate(&report(entries));

        let prompts: Vec<&str> = analysis.prompts.iter().map(|p| p.prompt.as_str()).collect();
        assert_eq!(
            prompts,
            vec!["fix my borrow error", "write a test", "fix my borrow error"]
        );
        assert_eq!(analysis.prompts[1].time_from_start.as_deref(), Some("00:00:10"));
    }

    #[test]
    fn malformed_entry_is_excluded_from_every_view() {
        let window = json!([{ "app": "VS Code", "action": "editing", "prompt": "help" }]);
        let entries = vec![
            classified("00:00:05", "Coding", window.clone()),
            TimelineEntry::Classified {
                time_from_start: Some("00:00:10".to_string()),
                analysis: "not json at all".to_string(),
            },
            classified("00:00:15", "Testing", window),
        ];
        let analysis = aggregate(&report(entries));

        let total: i64 = analysis.activity_seconds.iter().map(|(_, s)| s).sum();
        assert_eq!(total, 2 * 5);
        assert_eq!(analysis.prompts.len(), 2);
        // Both windows are identical but not adjacent in the parsed
        // stream, so dedup still collapses them.
        assert_eq!(analysis.app_actions.len(), 1);
    }

    #[test]
    fn failed_entries_contribute_nothing() {
        let entries = vec![
            classified("00:00:05", "Coding", json!([])),
            TimelineEntry::Failed {
                time_from_start: Some("00:00:10".to_string()),
                filename: "20240101000010000.jpg".to_string(),
                error: "request timed out".to_string(),
                processed_at: "2025-01-01T00:00:00Z".to_string(),
            },
        ];
        let analysis = aggregate(&report(entries));
        assert_eq!(analysis.activity_seconds, vec![("Coding".to_string(), 5)]);
    }

    #[test]
    fn entry_missing_open_windows_is_skipped_entirely() {
        let entries = vec![
            TimelineEntry::Classified {
                time_from_start: Some("00:00:05".to_string()),
                analysis: json!({ "activity": "Coding" }).to_string(),
            },
            classified("00:00:10", "Testing", json!([])),
        ];
        let analysis = aggregate(&report(entries));
        assert_eq!(analysis.activity_seconds, vec![("Testing".to_string(), 5)]);
    }

    #[test]
    fn fenced_analysis_payload_parses() {
        let fenced = format!(
            "```json\n{}\n```",
            json!({ "activity": "Coding", "open_windows": [] })
        );
        let entries = vec![TimelineEntry::Classified {
            time_from_start: Some("00:00:05".to_string()),
            analysis: fenced,
        }];
        let analysis = aggregate(&report(entries));
        assert_eq!(analysis.activity_seconds, vec![("Coding".to_string(), 5)]);
    }

    #[test]
    fn timeline_entry_wire_shapes_roundtrip() {
        let classified_json = json!({
            "time_from_start": "00:00:05",
            "analysis": "{\"activity\":\"Coding\",\"open_windows\":[]}"
        });
        let entry: TimelineEntry = serde_json::from_value(classified_json).unwrap();
        assert!(matches!(entry, TimelineEntry::Classified { .. }));

        let failed_json = json!({
            "time_from_start": null,
            "filename": "shot.jpg",
            "error": "boom",
            "processed_at": "2025-01-01T00:00:00Z"
        });
        let entry: TimelineEntry = serde_json::from_value(failed_json).unwrap();
        assert!(matches!(entry, TimelineEntry::Failed { .. }));
    }
}
