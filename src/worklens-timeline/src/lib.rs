//! worklens-timeline - Timeline aggregation for Worklens
//!
//! Turns a submission's per-screenshot classifications into derived views:
//! activity duration totals, a deduplicated app/action timeline, a raw
//! prompt timeline, and model-refined versions of the latter two.

pub mod aggregate;
pub mod model;
pub mod refine;

pub use aggregate::{aggregate, detect_interval, strip_code_fence, TimelineAnalysis};
pub use model::*;
pub use refine::{merge_prompts, summarize_actions, RefineError};
