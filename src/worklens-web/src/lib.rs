//! worklens-web - HTTP trigger for the Worklens pipeline
//!
//! One GET endpoint that runs the analysis pipeline to completion within
//! the request and answers with a plain-text status line.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::serve;
pub use state::{AppState, SubmissionAnalyzer};
