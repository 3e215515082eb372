// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "critiq")]
#[command(version)]
#[command(about = "LLM-assisted code submission review", long_about = None)]
pub struct Cli {
    /// Submission directory to review
    #[arg(short, long)]
    pub submission: Option<PathBuf>,

    /// Static analysis report (JSON)
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Challenge specification file
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Scorecard items (JSON)
    #[arg(long)]
    pub scorecard: Option<PathBuf>,

    /// Declared technology stack, comma-separated
    #[arg(short = 't', long)]
    pub tech_stack: Option<String>,

    /// Model backend (ollama, openai, anthropic)
    #[arg(short, long, env = "CRITIQ_BACKEND")]
    pub backend: Option<String>,

    /// One model for every call, overriding per-task routing
    #[arg(short, long, env = "CRITIQ_MODEL")]
    pub model: Option<String>,

    /// Where to write the review report
    #[arg(short, long, default_value = "review.json")]
    pub output: PathBuf,

    /// Print the report to stdout instead of writing a file
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Initialize config file
    Init,
    /// Show current configuration
    Config,
    /// Check backend connectivity and model availability
    Doctor,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
