//! Shared application state

use async_trait::async_trait;
use std::sync::Arc;

/// Seam between the web layer and the pipeline: anything that can run a
/// full analysis for one submission.
#[async_trait]
pub trait SubmissionAnalyzer: Send + Sync {
    /// Run the pipeline for one submission; the returned string is the
    /// human-readable status line for the response body.
    async fn analyze(
        &self,
        submission_id: &str,
        assignment_id: &str,
        user_id: &str,
    ) -> anyhow::Result<String>;
}

/// Shared state across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn SubmissionAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn SubmissionAnalyzer>) -> Self {
        Self { analyzer }
    }
}
