//! HTTP route handlers

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the analysis trigger.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub submission_id: String,
    pub assignment_id: String,
    pub user_id: String,
}

/// GET /analyze
///
/// Runs the pipeline to completion within the request. The response body
/// is a plain-text status line either way; the status code tells success
/// from failure.
pub async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeQuery>,
) -> Result<String, ApiError> {
    if params.submission_id.is_empty() {
        return Err(ApiError::BadRequest("submission_id must not be empty".to_string()));
    }

    info!(
        "analysis requested for submission {} (assignment {}, user {})",
        params.submission_id, params.assignment_id, params.user_id
    );

    match state
        .analyzer
        .analyze(&params.submission_id, &params.assignment_id, &params.user_id)
        .await
    {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!("pipeline failed for submission {}: {e:#}", params.submission_id);
            Err(ApiError::Pipeline(e))
        }
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
