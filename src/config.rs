// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::domain::TaskKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ollama,
    OpenAI,
    Anthropic,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// How the screening gate merges model-confirmed languages with
/// extension-based detection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LanguageMergePolicy {
    /// Confirmed languages are added to the detected set; detection is
    /// never silently dropped.
    #[default]
    Union,
    /// The confirmed set replaces detection when the confirmation call
    /// succeeds. Detection still applies when confirmation fails.
    ConfirmedOnly,
}

/// Model routed to each analysis task. Overridable per task so cheap
/// models can screen while stronger ones analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMap {
    #[serde(default = "default_model")]
    pub screening: String,
    #[serde(default = "default_model")]
    pub security: String,
    #[serde(default = "default_model")]
    pub quality: String,
    #[serde(default = "default_model")]
    pub performance: String,
    #[serde(default = "default_model")]
    pub scorecard: String,
}

impl Default for ModelMap {
    fn default() -> Self {
        Self {
            screening: default_model(),
            security: default_model(),
            quality: default_model(),
            performance: default_model(),
            scorecard: default_model(),
        }
    }
}

/// Dimension weights and the per-finding security penalty.
///
/// Weights must sum to 1.0; the aggregator never re-normalizes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    #[serde(default = "default_code_quality_weight")]
    pub code_quality_weight: f64,
    #[serde(default = "default_security_weight")]
    pub security_weight: f64,
    #[serde(default = "default_performance_weight")]
    pub performance_weight: f64,
    #[serde(default = "default_scorecard_weight")]
    pub scorecard_weight: f64,
    /// Points subtracted from 100 per security finding.
    #[serde(default = "default_security_penalty")]
    pub security_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            code_quality_weight: default_code_quality_weight(),
            security_weight: default_security_weight(),
            performance_weight: default_performance_weight(),
            scorecard_weight: default_scorecard_weight(),
            security_penalty: default_security_penalty(),
        }
    }
}

/// Backoff schedule for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per call, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    /// Global model override. When set, every task uses this model
    /// regardless of the [models] table.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub models: ModelMap,

    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible APIs (default: https://api.openai.com/v1)
    #[serde(default)]
    pub openai_base_url: Option<String>,

    /// Base URL for the Anthropic API (default: https://api.anthropic.com/v1)
    #[serde(default)]
    pub anthropic_base_url: Option<String>,

    /// Maximum characters per code payload sent in one model call
    /// (~4 chars per token; 8000 is safe for 8K context models)
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Static-analysis report excerpt budget in characters
    #[serde(default = "default_report_excerpt_chars")]
    pub report_excerpt_chars: usize,

    /// Challenge specification excerpt budget in characters
    #[serde(default = "default_spec_excerpt_chars")]
    pub spec_excerpt_chars: usize,

    /// Scorecard answers are truncated to this many characters
    #[serde(default = "default_answer_max_chars")]
    pub answer_max_chars: usize,

    /// Maximum in-flight backend calls across all tasks
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-request timeout in seconds (default 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whole-run deadline in seconds; pending calls are cancelled and
    /// their tasks defaulted when it expires (default 300)
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// LLM temperature (0.0-2.0, default 0.3)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per call (default 1024)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub merge_policy: LanguageMergePolicy,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model() -> String {
    "qwen3:4b".into()
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_max_chunk_chars() -> usize {
    8_000
}
fn default_report_excerpt_chars() -> usize {
    2_000
}
fn default_spec_excerpt_chars() -> usize {
    2_000
}
fn default_answer_max_chars() -> usize {
    200
}
fn default_max_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_run_timeout_secs() -> u64 {
    300
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1_024
}
fn default_code_quality_weight() -> f64 {
    0.35
}
fn default_security_weight() -> f64 {
    0.25
}
fn default_performance_weight() -> f64 {
    0.20
}
fn default_scorecard_weight() -> f64 {
    0.20
}
fn default_security_penalty() -> f64 {
    15.0
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    4_000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: None,
            models: ModelMap::default(),
            ollama_host: default_ollama_host(),
            api_key: None,
            openai_base_url: None,
            anthropic_base_url: None,
            max_chunk_chars: default_max_chunk_chars(),
            report_excerpt_chars: default_report_excerpt_chars(),
            spec_excerpt_chars: default_spec_excerpt_chars(),
            answer_max_chars: default_answer_max_chars(),
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            merge_policy: LanguageMergePolicy::default(),
            scoring: ScoringConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load with priority: CLI > ENV > user config > project config > defaults
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Project-level config (.critiq.toml in working directory)
        if let Ok(cwd) = std::env::current_dir() {
            let project_config = cwd.join(".critiq.toml");
            if project_config.exists() {
                figment = figment.merge(Toml::file(&project_config));
            }
        }

        // User-level config
        if let Some(path) = Self::config_path() {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        }

        // Environment variables (CRITIQ_MODEL, CRITIQ_BACKEND, etc.)
        // Use __ separator for nested keys (e.g., CRITIQ_SCORING__SECURITY_PENALTY)
        figment = figment.merge(Env::prefixed("CRITIQ_").split("__"));

        let mut config: Config = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Backend-specific API key fallback
        if config.api_key.is_none() {
            config.api_key = match config.backend {
                Backend::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
                Backend::Anthropic => std::env::var("ANTHROPIC_API_KEY").ok(),
                Backend::Ollama => None,
            };
        }

        // CLI overrides (highest priority)
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "critiq").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref b) = cli.backend {
            self.backend = match b.to_lowercase().as_str() {
                "openai" => Backend::OpenAI,
                "anthropic" => Backend::Anthropic,
                _ => Backend::Ollama,
            };
        }
        if let Some(ref m) = cli.model {
            self.model = Some(m.clone());
        }
    }

    /// Model routed to one of the four analysis tasks.
    pub fn task_model(&self, kind: TaskKind) -> &str {
        if let Some(ref model) = self.model {
            return model;
        }
        match kind {
            TaskKind::Security => &self.models.security,
            TaskKind::Quality => &self.models.quality,
            TaskKind::Performance => &self.models.performance,
            TaskKind::Scorecard => &self.models.scorecard,
        }
    }

    /// Model used for the screening confirmation call.
    pub fn screening_model(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.models.screening)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend != Backend::Ollama && self.api_key.is_none() {
            return Err(Error::Config(format!(
                "{} requires an API key. Set CRITIQ_API_KEY or {}_API_KEY",
                self.backend,
                format!("{:?}", self.backend).to_uppercase()
            )));
        }

        if !(256..=200_000).contains(&self.max_chunk_chars) {
            return Err(Error::Config(format!(
                "max_chunk_chars must be 256–200000, got {}",
                self.max_chunk_chars
            )));
        }

        if !(100..=50_000).contains(&self.report_excerpt_chars) {
            return Err(Error::Config(format!(
                "report_excerpt_chars must be 100–50000, got {}",
                self.report_excerpt_chars
            )));
        }

        if !(100..=50_000).contains(&self.spec_excerpt_chars) {
            return Err(Error::Config(format!(
                "spec_excerpt_chars must be 100–50000, got {}",
                self.spec_excerpt_chars
            )));
        }

        if !(20..=2_000).contains(&self.answer_max_chars) {
            return Err(Error::Config(format!(
                "answer_max_chars must be 20–2000, got {}",
                self.answer_max_chars
            )));
        }

        if !(1..=64).contains(&self.max_concurrency) {
            return Err(Error::Config(format!(
                "max_concurrency must be 1–64, got {}",
                self.max_concurrency
            )));
        }

        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(Error::Config(format!(
                "timeout_secs must be 1–3600, got {}",
                self.timeout_secs
            )));
        }

        if !(1..=3600).contains(&self.run_timeout_secs) {
            return Err(Error::Config(format!(
                "run_timeout_secs must be 1–3600, got {}",
                self.run_timeout_secs
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be 0.0–2.0, got {}",
                self.temperature
            )));
        }

        if !(16..=32_000).contains(&self.max_tokens) {
            return Err(Error::Config(format!(
                "max_tokens must be 16–32000, got {}",
                self.max_tokens
            )));
        }

        if self.ollama_host.is_empty() {
            return Err(Error::Config("ollama_host cannot be empty".into()));
        }

        if !self.ollama_host.starts_with("http://") && !self.ollama_host.starts_with("https://") {
            return Err(Error::Config(format!(
                "ollama_host must start with http:// or https://, got '{}'",
                self.ollama_host
            )));
        }

        if url::Url::parse(&self.ollama_host).is_err() {
            return Err(Error::Config(format!(
                "ollama_host is not a valid URL: '{}'",
                self.ollama_host
            )));
        }

        self.validate_scoring()?;
        self.validate_retry()?;
        Ok(())
    }

    fn validate_scoring(&self) -> Result<()> {
        let s = &self.scoring;
        for (name, w) in [
            ("code_quality_weight", s.code_quality_weight),
            ("security_weight", s.security_weight),
            ("performance_weight", s.performance_weight),
            ("scorecard_weight", s.scorecard_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::Config(format!("{name} must be 0.0–1.0, got {w}")));
            }
        }

        let sum =
            s.code_quality_weight + s.security_weight + s.performance_weight + s.scorecard_weight;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }

        if !(0.0..=100.0).contains(&s.security_penalty) {
            return Err(Error::Config(format!(
                "security_penalty must be 0–100, got {}",
                s.security_penalty
            )));
        }

        Ok(())
    }

    fn validate_retry(&self) -> Result<()> {
        let r = &self.retry;
        if !(1..=10).contains(&r.max_attempts) {
            return Err(Error::Config(format!(
                "retry.max_attempts must be 1–10, got {}",
                r.max_attempts
            )));
        }

        if r.base_delay_ms > 60_000 {
            return Err(Error::Config(format!(
                "retry.base_delay_ms must be at most 60000, got {}",
                r.base_delay_ms
            )));
        }

        if r.max_delay_ms < r.base_delay_ms {
            return Err(Error::Config(format!(
                "retry.max_delay_ms must be >= base_delay_ms, got {}",
                r.max_delay_ms
            )));
        }

        if !(1.0..=10.0).contains(&r.multiplier) {
            return Err(Error::Config(format!(
                "retry.multiplier must be 1.0–10.0, got {}",
                r.multiplier
            )));
        }

        Ok(())
    }

    /// Create default config file with secure permissions
    pub fn create_default() -> Result<PathBuf> {
        let Some(dir) = Self::config_dir() else {
            return Err(Error::Config("Cannot determine config directory".into()));
        };

        fs::create_dir_all(&dir)?;

        let path = dir.join("config.toml");
        let content = r#"# critiq configuration

# LLM backend: ollama, openai, anthropic
backend = "ollama"

# Ollama server URL
ollama_host = "http://localhost:11434"

# Global model override; when set it applies to every task.
# Prefer the [models] table for per-task routing.
# model = "qwen3:4b"

# Maximum characters per code payload sent in one model call
# (~4 chars per token; increase for larger-context models)
# max_chunk_chars = 8000

# Maximum in-flight backend calls across all tasks
# max_concurrency = 4

# Whole-run deadline in seconds
# run_timeout_secs = 300

# Per-task model routing
[models]
screening = "qwen3:4b"
security = "qwen3:4b"
quality = "qwen3:4b"
performance = "qwen3:4b"
scorecard = "qwen3:4b"

# Dimension weights (must sum to 1.0) and the per-finding penalty
[scoring]
code_quality_weight = 0.35
security_weight = 0.25
performance_weight = 0.20
scorecard_weight = 0.20
security_penalty = 15.0

# Backoff schedule for transient backend failures
[retry]
max_attempts = 3
base_delay_ms = 250
max_delay_ms = 4000
multiplier = 2.0
"#;

        fs::write(&path, content)?;

        // Set secure permissions (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }
}
