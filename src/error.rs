// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Missing required input: {0}")]
    #[diagnostic(
        code(critiq::input::missing),
        help("Pass --submission, --report and --spec (see critiq --help)")
    )]
    MissingInput(String),

    #[error("Submission directory not found: {}", path.display())]
    #[diagnostic(
        code(critiq::input::submission),
        help("Point --submission at the extracted submission directory")
    )]
    SubmissionNotFound { path: PathBuf },

    #[error("Static-analysis report is not valid JSON: {message}")]
    #[diagnostic(
        code(critiq::input::report),
        help("The report must be a JSON document with an `issues` array")
    )]
    InvalidReport { message: String },

    #[error("Scorecard file is invalid: {message}")]
    #[diagnostic(
        code(critiq::input::scorecard),
        help("Expected a JSON array of {{question, category, weight}} objects")
    )]
    InvalidScorecard { message: String },

    #[error("Cannot connect to Ollama at {host}")]
    #[diagnostic(
        code(critiq::ollama::not_running),
        help("Start Ollama with: ollama serve")
    )]
    OllamaNotRunning { host: String },

    #[error("Model '{model}' not found. Available: {}", available.join(", "))]
    #[diagnostic(
        code(critiq::ollama::model_not_found),
        help("Pull the model with: ollama pull {model}")
    )]
    ModelNotFound {
        model: String,
        available: Vec<String>,
    },

    #[error("Backend '{backend}' error: {message}")]
    #[diagnostic(code(critiq::backend::error))]
    Backend { backend: String, message: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(critiq::config::error))]
    Config(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Failed to encode report: {0}")]
    #[diagnostic(code(critiq::output::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
