//! Model-driven timeline refinement
//!
//! Two independent passes over already-aggregated views: merging
//! fragmentary prompts into logical ones, and collapsing the app/action
//! timeline into narrative activity blocks. Both passes fall back to the
//! unmodified input on any request or parse failure; refinement never
//! loses data and never raises.

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use worklens_vision::{ChatModel, LlmError};

use crate::aggregate::strip_code_fence;
use crate::model::{ActivityBlock, AppActionTimeline, PromptTimeline};

#[derive(Error, Debug)]
pub enum RefineError {
    #[error("model error: {0}")]
    Llm(#[from] LlmError),

    #[error("unparseable model reply: {0}")]
    Parse(#[from] serde_json::Error),
}

const MERGE_INSTRUCTION: &str = "Here is a list of prompts the user asked AI tools, extracted from \
screenshots taken every few seconds. Because of limited text box sizes the captured text can be cut \
off, and the user may have been editing a prompt between captures. Merge prompts that are fragments \
or in-progress edits of the same prompt into the single prompt the user actually typed, keeping the \
time for each one, while keeping genuinely distinct prompts as separate entries. Output JSON in the \
same format as the input:";

const SUMMARIZE_INSTRUCTION: &str = "The input is a candidate's time series activity log. Merge \
logically similar activities together. For coding activities, split around each bug or issue the \
user faced: fixing one bug may have required searching, asking an AI, coding, and testing, and those \
belong to the same block. Output a JSON array of objects in this format:\n\
[{\n\
\"activity\": <one line summary of the combined activity; for a bug include how it was resolved, \
e.g. by reading documentation or asking ChatGPT>,\n\
\"time\": <start time of the activity>,\n\
\"details\": <bullet point list of things the user did during this activity>\n\
}, ...]\n\nInput:";

/// Merge fragmentary prompts into logical ones.
///
/// On any failure the raw timeline is returned unchanged.
pub async fn merge_prompts(model: &dyn ChatModel, input: &PromptTimeline) -> PromptTimeline {
    match try_merge(model, input).await {
        Ok(merged) => {
            info!(
                "merged prompt timeline: {} -> {} entries",
                input.prompts_timeline.len(),
                merged.prompts_timeline.len()
            );
            merged
        }
        Err(e) => {
            warn!("prompt merge failed, keeping raw prompt timeline: {e}");
            input.clone()
        }
    }
}

async fn try_merge(
    model: &dyn ChatModel,
    input: &PromptTimeline,
) -> Result<PromptTimeline, RefineError> {
    let payload = serde_json::to_string_pretty(input)?;
    let reply = model
        .complete(&format!("{MERGE_INSTRUCTION}\n\n{payload}"))
        .await?;
    Ok(serde_json::from_str(strip_code_fence(&reply))?)
}

/// Collapse the app/action timeline into narrative activity blocks.
///
/// Returns the block array as a JSON value on success; on any failure the
/// unmodified input timeline is returned instead, so downstream consumers
/// always receive something.
pub async fn summarize_actions(model: &dyn ChatModel, input: &AppActionTimeline) -> Value {
    match try_summarize(model, input).await {
        Ok(summary) => {
            info!("summarized app/action timeline");
            summary
        }
        Err(e) => {
            warn!("timeline summarization failed, keeping app/action timeline: {e}");
            match serde_json::to_value(input) {
                Ok(value) => value,
                Err(e) => {
                    error!("could not re-serialize app/action timeline: {e}");
                    Value::Null
                }
            }
        }
    }
}

async fn try_summarize(
    model: &dyn ChatModel,
    input: &AppActionTimeline,
) -> Result<Value, RefineError> {
    let payload = serde_json::to_string_pretty(input)?;
    let reply = model
        .complete(&format!("{SUMMARIZE_INSTRUCTION}\n\n{payload}"))
        .await?;
    let blocks: Vec<ActivityBlock> = serde_json::from_str(strip_code_fence(&reply))?;
    Ok(serde_json::to_value(blocks)?)
}
