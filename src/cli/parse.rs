//! CLI parse: clap types for Leap. No behavior; definitions only.

use crate::generation::AudienceLevel;
use crate::sandbox::QualityTier;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Leap CLI - turn a question into a narrated math animation
#[derive(Parser)]
#[command(name = "leap")]
#[command(about = "Generate, validate, render and self-correct explanatory animations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one request through the whole pipeline and wait for the result
    Run {
        /// The question or topic to animate
        prompt: String,
        /// Audience level
        #[arg(long, value_enum, default_value_t = AudienceLevel::Standard)]
        level: AudienceLevel,
        /// Render quality
        #[arg(long, value_enum, default_value_t = QualityTier::Low)]
        quality: QualityTier,
        /// Narrator voice
        #[arg(long, default_value = crate::pipeline::DEFAULT_VOICE)]
        voice: String,
        /// Address to notify on completion
        #[arg(long)]
        contact: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a job's status
    Status {
        /// Job id
        job_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List recorded jobs, newest first
    Jobs {
        /// Show at most this many jobs
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Run the static checks over a scene file without rendering it
    Check {
        /// Scene source file
        file: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the pipeline's stage graph as a Mermaid state diagram
    Workflow,
}
