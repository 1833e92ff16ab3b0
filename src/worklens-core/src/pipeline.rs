//! Pipeline orchestration
//!
//! One `Pipeline` per process: acquisition, classification, aggregation,
//! refinement and publishing for a single submission identifier per run.
//! Concurrent runs for the same submission are not protected against;
//! callers must not overlap them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use worklens_storage::ObjectStorage;
use worklens_timeline::{aggregate, refine};
use worklens_vision::{ChatCompletion, OpenAiClient};

use crate::classifier::Classifier;
use crate::config::Config;

/// What one pipeline run produced; renders as the response status line.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub screenshots: usize,
    pub entries: usize,
    pub uploaded: usize,
    pub failed_uploads: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analyzed {} screenshots ({} timeline entries), uploaded {} artifacts",
            self.screenshots, self.entries, self.uploaded
        )?;
        if self.failed_uploads > 0 {
            write!(f, ", {} uploads failed (local files kept)", self.failed_uploads)?;
        }
        Ok(())
    }
}

/// The full analysis pipeline with its explicitly constructed collaborators.
pub struct Pipeline {
    config: Config,
    storage: ObjectStorage,
    classifier: Classifier,
    prompt_merger: ChatCompletion,
    action_summarizer: ChatCompletion,
}

impl Pipeline {
    pub fn new(config: Config, storage: ObjectStorage) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(
            &config.openai_api_key,
            &config.openai_base_url,
        )?);

        let classifier = Classifier::new(client.clone(), &config);
        let prompt_merger = ChatCompletion::new(client.clone(), &config.merge_model)
            .json_object()
            .max_tokens(10_000)
            .temperature(0.0);
        // Reasoning models reject sampling parameters, so none are set.
        let action_summarizer = ChatCompletion::new(client, &config.summary_model);

        Ok(Self {
            config,
            storage,
            classifier,
            prompt_merger,
            action_summarizer,
        })
    }

    /// Run the whole pipeline for one submission.
    pub async fn run(
        &self,
        submission_id: &str,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<RunSummary> {
        info!("starting pipeline for submission {submission_id}");

        // Acquisition. Failures here abort the run before any model call.
        let screenshots_dir = self.config.screenshots_dir(submission_id);
        let screenshots = self
            .storage
            .download_screenshots(
                &self.config.screenshot_bucket,
                &self.config.screenshot_prefix(submission_id),
                &screenshots_dir,
            )
            .await
            .context("downloading screenshots")?;

        // Classification fan-out.
        let report = self
            .classifier
            .analyze_screenshots(&screenshots_dir, &self.config.analysis_file(submission_id))
            .await
            .context("classifying screenshots")?;

        // Aggregation into the derived views.
        let analysis = aggregate(&report);

        let artifacts_dir = self.config.artifacts_dir(submission_id);
        tokio::fs::create_dir_all(&artifacts_dir)
            .await
            .with_context(|| format!("creating {}", artifacts_dir.display()))?;
        let stem = format!("{assignment_id}_{user_id}");

        let raw_prompts = analysis.prompt_timeline();
        let app_actions = analysis.app_action_timeline();
        write_artifact(
            &artifacts_dir.join(format!("{stem}_time_spent.json")),
            &analysis.time_spent_report(),
        )
        .await?;
        write_artifact(
            &artifacts_dir.join(format!("{stem}_raw_prompts.json")),
            &raw_prompts,
        )
        .await?;
        write_artifact(
            &artifacts_dir.join(format!("{stem}_app_actions.json")),
            &app_actions,
        )
        .await?;

        // Refinement; both calls fall back to their input on failure.
        let merged = refine::merge_prompts(&self.prompt_merger, &raw_prompts).await;
        write_artifact(&artifacts_dir.join(format!("{stem}_ai_prompt.json")), &merged).await?;

        let summary = refine::summarize_actions(&self.action_summarizer, &app_actions).await;
        write_artifact(
            &artifacts_dir.join(format!("{stem}_timeline_summary.json")),
            &summary,
        )
        .await?;

        // Publish, then clean up local intermediates only when every
        // artifact made it out.
        let upload = self
            .storage
            .upload_artifacts(
                &artifacts_dir,
                &self.config.artifact_bucket,
                &self.config.artifact_prefix,
            )
            .await
            .context("uploading artifacts")?;

        if upload.is_complete() {
            worklens_storage::remove_local_artifacts(&self.config.data_dir, submission_id).await;
        } else {
            warn!(
                "{} of {} artifact uploads failed; keeping local files under {}",
                upload.failed,
                upload.failed + upload.uploaded,
                artifacts_dir.display()
            );
        }

        let summary = RunSummary {
            screenshots,
            entries: report.timeline.len(),
            uploaded: upload.uploaded,
            failed_uploads: upload.failed,
        };
        info!("pipeline finished for submission {submission_id}: {summary}");
        Ok(summary)
    }
}

#[async_trait]
impl worklens_web::SubmissionAnalyzer for Pipeline {
    async fn analyze(
        &self,
        submission_id: &str,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<String> {
        let summary = self.run(submission_id, assignment_id, user_id).await?;
        Ok(summary.to_string())
    }
}

async fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_renders_failures_only_when_present() {
        let clean = RunSummary {
            screenshots: 12,
            entries: 12,
            uploaded: 5,
            failed_uploads: 0,
        };
        assert_eq!(
            clean.to_string(),
            "analyzed 12 screenshots (12 timeline entries), uploaded 5 artifacts"
        );

        let partial = RunSummary {
            failed_uploads: 2,
            uploaded: 3,
            ..clean
        };
        assert!(partial.to_string().ends_with("2 uploads failed (local files kept)"));
    }
}
