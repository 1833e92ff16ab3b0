//! worklens-vision - Model clients for Worklens
//!
//! An OpenAI-compatible chat client with vision support, the fixed
//! screenshot classification instruction, and capture-timestamp parsing
//! for screenshot filenames.

pub mod client;
pub mod error;
pub mod prompt;
pub mod timestamp;

pub use client::{ChatCompletion, ChatModel, OpenAiClient};
pub use error::{LlmError, Result as LlmResult};
pub use timestamp::{capture_timestamp, local_clock_time};
