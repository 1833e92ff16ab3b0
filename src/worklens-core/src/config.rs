//! Configuration management
//!
//! Everything the pipeline needs comes from the environment (after an
//! optional `.env` load in main): model names, buckets, the fixed local
//! offset for clock times, and the classifier's concurrency cap. Numeric
//! variables that fail to parse are errors, not silent defaults.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";
const DEFAULT_MERGE_MODEL: &str = "gpt-4o";
const DEFAULT_SUMMARY_MODEL: &str = "o1-preview";
const DEFAULT_ARTIFACT_BUCKET: &str = "authcast-assignments";
const DEFAULT_ARTIFACT_PREFIX: &str = "analysis";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI-compatible API credential.
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub vision_model: String,
    pub merge_model: String,
    pub summary_model: String,

    /// Bucket holding the uploaded screenshots.
    pub screenshot_bucket: String,
    /// Bucket and prefix the derived artifacts are published to.
    pub artifact_bucket: String,
    pub artifact_prefix: String,

    /// Fixed local offset for clock-time display.
    pub utc_offset_hours: i32,
    pub utc_offset_minutes: i32,

    /// Cap on concurrent in-flight classification requests.
    pub max_concurrent_requests: usize,
    /// Optional inclusive ordinal range of screenshots to classify.
    pub image_range: Option<(usize, usize)>,

    /// Root of the local working directories.
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            vision_model: env_or("WORKLENS_VISION_MODEL", DEFAULT_VISION_MODEL),
            merge_model: env_or("WORKLENS_MERGE_MODEL", DEFAULT_MERGE_MODEL),
            summary_model: env_or("WORKLENS_SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            screenshot_bucket: require("S3_BUCKET_NAME")?,
            artifact_bucket: env_or("ARTIFACT_BUCKET", DEFAULT_ARTIFACT_BUCKET),
            artifact_prefix: env_or("ARTIFACT_PREFIX", DEFAULT_ARTIFACT_PREFIX),
            utc_offset_hours: env_parse("UTC_OFFSET_HOURS", 5)?,
            utc_offset_minutes: env_parse("UTC_OFFSET_MINUTES", 30)?,
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS", 60)?,
            image_range: std::env::var("IMAGE_RANGE")
                .ok()
                .map(|raw| parse_range(&raw))
                .transpose()?,
            data_dir: PathBuf::from(env_or("WORKLENS_DATA_DIR", ".")),
        })
    }

    pub fn screenshots_dir(&self, submission_id: &str) -> PathBuf {
        self.data_dir.join("screenshots").join(submission_id)
    }

    pub fn analysis_file(&self, submission_id: &str) -> PathBuf {
        self.data_dir
            .join("analysis")
            .join(format!("{submission_id}.json"))
    }

    pub fn artifacts_dir(&self, submission_id: &str) -> PathBuf {
        self.data_dir.join("timeline_analysis").join(submission_id)
    }

    /// Remote key prefix for one submission's screenshots.
    pub fn screenshot_prefix(&self, submission_id: &str) -> String {
        format!("screenshots/{submission_id}")
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(e) => bail!("invalid {key} value {raw:?}: {e}"),
        },
        Err(_) => Ok(default),
    }
}

/// Parse an inclusive "start,end" ordinal range.
fn parse_range(raw: &str) -> Result<(usize, usize)> {
    let (start, end) = raw
        .split_once(',')
        .with_context(|| format!("IMAGE_RANGE must be \"start,end\", got {raw:?}"))?;
    let start: usize = start
        .trim()
        .parse()
        .with_context(|| format!("invalid IMAGE_RANGE start {start:?}"))?;
    let end: usize = end
        .trim()
        .parse()
        .with_context(|| format!("invalid IMAGE_RANGE end {end:?}"))?;
    if end < start {
        bail!("IMAGE_RANGE end {end} is before start {start}");
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_parses_inclusive_bounds() {
        assert_eq!(parse_range("0,2200").unwrap(), (0, 2200));
        assert_eq!(parse_range(" 5 , 10 ").unwrap(), (5, 10));
    }

    #[test]
    fn range_rejects_malformed_input() {
        assert!(parse_range("nope").is_err());
        assert!(parse_range("1,two").is_err());
        assert!(parse_range("10,5").is_err());
    }

    #[test]
    fn submission_paths_are_namespaced() {
        let config = Config {
            openai_api_key: "k".to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            merge_model: DEFAULT_MERGE_MODEL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            screenshot_bucket: "shots".to_string(),
            artifact_bucket: "artifacts".to_string(),
            artifact_prefix: "analysis".to_string(),
            utc_offset_hours: 5,
            utc_offset_minutes: 30,
            max_concurrent_requests: 60,
            image_range: None,
            data_dir: PathBuf::from("/tmp/worklens"),
        };

        assert_eq!(
            config.screenshots_dir("sub1"),
            PathBuf::from("/tmp/worklens/screenshots/sub1")
        );
        assert_eq!(
            config.analysis_file("sub1"),
            PathBuf::from("/tmp/worklens/analysis/sub1.json")
        );
        assert_eq!(
            config.artifacts_dir("sub1"),
            PathBuf::from("/tmp/worklens/timeline_analysis/sub1")
        );
        assert_eq!(config.screenshot_prefix("sub1"), "screenshots/sub1");
    }
}
