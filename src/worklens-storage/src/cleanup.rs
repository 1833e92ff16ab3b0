//! Local intermediate cleanup
//!
//! Removes a submission's working directories after a fully successful
//! publish. Every failure here is logged and swallowed; cleanup never
//! fails the pipeline.

use std::path::Path;
use tracing::{debug, warn};

/// Delete a submission's local intermediates: the downloaded screenshots,
/// the derived artifacts, and the classification report.
///
/// The caller decides *when* this runs (only after every artifact
/// uploaded successfully); this function just removes what exists.
pub async fn remove_local_artifacts(data_dir: &Path, submission_id: &str) {
    let dirs = [
        data_dir.join("screenshots").join(submission_id),
        data_dir.join("timeline_analysis").join(submission_id),
    ];

    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("removed {}", dir.display()),
            Err(e) => warn!("failed to remove {}: {e}", dir.display()),
        }
    }

    let report = data_dir
        .join("analysis")
        .join(format!("{submission_id}.json"));
    if report.exists() {
        match tokio::fs::remove_file(&report).await {
            Ok(()) => debug!("removed {}", report.display()),
            Err(e) => warn!("failed to remove {}: {e}", report.display()),
        }
    }
}
