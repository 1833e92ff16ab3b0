//! Worklens - Screenshot work-session analysis CLI
//!
//! Runs the analysis pipeline for one submission, or serves the HTTP
//! trigger endpoint that does the same on request.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use worklens_core::{Config, Pipeline};
use worklens_storage::ObjectStorage;

#[derive(Parser)]
#[command(name = "worklens")]
#[command(about = "Screenshot analysis pipeline for submitted work sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one submission
    Analyze {
        /// Submission whose screenshots should be analyzed
        #[arg(long)]
        submission_id: String,

        /// Assignment the submission belongs to (artifact naming)
        #[arg(long)]
        assignment_id: String,

        /// Submitting user (artifact naming)
        #[arg(long)]
        user_id: String,
    },

    /// Serve the HTTP trigger endpoint
    Serve {
        /// Web server port
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Analyze {
            submission_id,
            assignment_id,
            user_id,
        } => {
            cmd_analyze(submission_id, assignment_id, user_id)?;
        }
        Commands::Serve { port } => {
            cmd_serve(port)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn cmd_analyze(submission_id: String, assignment_id: String, user_id: String) -> Result<()> {
    let pipeline = build_pipeline().await?;

    let summary = pipeline
        .run(&submission_id, &assignment_id, &user_id)
        .await?;
    info!("{summary}");

    Ok(())
}

#[tokio::main]
async fn cmd_serve(port: u16) -> Result<()> {
    let pipeline = build_pipeline().await?;

    worklens_web::serve(Arc::new(pipeline), port).await?;

    Ok(())
}

async fn build_pipeline() -> Result<Pipeline> {
    let config = Config::from_env()?;
    let storage = ObjectStorage::from_env().await;
    Pipeline::new(config, storage)
}
