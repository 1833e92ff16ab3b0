//! worklens-storage - Object storage layer for Worklens
//!
//! Downloads a submission's screenshots from S3 and publishes the derived
//! JSON artifacts back. The client is constructed explicitly and passed
//! in; nothing here is a process-global.

mod cleanup;
mod error;

pub use cleanup::remove_local_artifacts;
pub use error::{Result, StorageError};

use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one artifact upload pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
}

impl UploadReport {
    /// True when every artifact made it to remote storage. Local cleanup
    /// is gated on this.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// S3-backed object storage for screenshots and artifacts.
pub struct ObjectStorage {
    client: aws_sdk_s3::Client,
}

impl ObjectStorage {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS environment (credentials,
    /// region) the way the CLI and service entry points do.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }

    /// Download every screenshot under `prefix` into `dest_dir`.
    ///
    /// Only keys that end in `.jpg` and start with the prefix are taken.
    /// Returns the number of objects downloaded; an empty listing is a
    /// no-op with a diagnostic, not an error. Listing or download
    /// failures propagate to the caller.
    pub async fn download_screenshots(
        &self,
        bucket: &str,
        prefix: &str,
        dest_dir: &Path,
    ) -> Result<usize> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::S3(e.to_string()))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    if key.ends_with(".jpg") && key.starts_with(prefix) {
                        keys.push(key.to_string());
                    }
                }
            }
        }

        if keys.is_empty() {
            info!("no screenshots found under s3://{bucket}/{prefix}");
            return Ok(0);
        }

        tokio::fs::create_dir_all(dest_dir).await?;

        for key in &keys {
            let file_name = key.rsplit('/').next().unwrap_or(key);
            let local_path = dest_dir.join(file_name);

            let object = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| StorageError::S3(e.to_string()))?;
            let bytes = object
                .body
                .collect()
                .await
                .map_err(|e| StorageError::S3(e.to_string()))?
                .into_bytes();

            tokio::fs::write(&local_path, &bytes).await?;
            debug!("downloaded s3://{bucket}/{key} -> {}", local_path.display());
        }

        info!(
            "downloaded {} screenshots to {}",
            keys.len(),
            dest_dir.display()
        );
        Ok(keys.len())
    }

    /// Upload every `.json` file in `local_dir` to
    /// `s3://{bucket}/{remote_prefix}/{file_name}`.
    ///
    /// Individual upload failures are logged and counted; the pass
    /// continues with the remaining files. Only listing the directory can
    /// fail this call outright.
    pub async fn upload_artifacts(
        &self,
        local_dir: &Path,
        bucket: &str,
        remote_prefix: &str,
    ) -> Result<UploadReport> {
        let mut report = UploadReport::default();
        let mut entries = tokio::fs::read_dir(local_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let key = format!("{remote_prefix}/{file_name}");

            let body = match ByteStream::from_path(&path).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("failed to read {}: {e}", path.display());
                    report.failed += 1;
                    continue;
                }
            };

            match self
                .client
                .put_object()
                .bucket(bucket)
                .key(&key)
                .body(body)
                .send()
                .await
            {
                Ok(_) => {
                    info!("uploaded {} -> s3://{bucket}/{key}", path.display());
                    report.uploaded += 1;
                }
                Err(e) => {
                    warn!("failed to upload {} to s3://{bucket}/{key}: {e}", path.display());
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_report_completeness() {
        let clean = UploadReport {
            uploaded: 5,
            failed: 0,
        };
        assert!(clean.is_complete());

        let partial = UploadReport {
            uploaded: 4,
            failed: 1,
        };
        assert!(!partial.is_complete());

        // An empty pass is complete; there was nothing to lose.
        assert!(UploadReport::default().is_complete());
    }
}
