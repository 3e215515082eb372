// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use console::style;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::{Backend, Config};
use crate::domain::{Report, ReviewInputs, TaskKind};
use crate::error::{Error, Result};
use crate::services::{
    engine::ReviewEngine,
    llm::{self, ollama::OllamaBackend},
    loader,
};

pub struct App {
    cli: Cli,
    config: Config,
    cancel_token: CancellationToken,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = Config::load(&cli)?;
        debug!(
            backend = %config.backend,
            max_concurrency = config.max_concurrency,
            max_chunk_chars = config.max_chunk_chars,
            "config loaded"
        );
        let cancel_token = CancellationToken::new();
        Ok(Self {
            cli,
            config,
            cancel_token,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup Ctrl+C handler with CancellationToken
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });

        // Handle subcommands
        if let Some(ref cmd) = self.cli.command {
            return self.handle_command(cmd).await;
        }

        self.review_submission().await
    }

    // ─── Review Flow ───

    async fn review_submission(&mut self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let inputs = self.gather_inputs()?;

        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.print_status(&format!("Contacting {} backend...", self.config.backend));
        let backend = llm::create_backend(&self.config);
        debug!(backend = backend.name(), "verifying backend");
        backend.verify().await?;

        self.print_status(&format!(
            "Reviewing ({} concurrent calls, {}s budget)...",
            self.config.max_concurrency, self.config.run_timeout_secs
        ));

        let engine =
            ReviewEngine::with_backend(self.config.clone(), backend, self.cancel_token.clone());
        let report = engine.run_review(inputs).await?;

        self.present_report(&report)
    }

    fn gather_inputs(&self) -> Result<ReviewInputs> {
        let submission_dir = self
            .cli
            .submission
            .as_ref()
            .ok_or_else(|| Error::MissingInput("submission directory (--submission)".into()))?;
        let report_path = self
            .cli
            .report
            .as_ref()
            .ok_or_else(|| Error::MissingInput("static analysis report (--report)".into()))?;
        let spec_path = self
            .cli
            .spec
            .as_ref()
            .ok_or_else(|| Error::MissingInput("specification file (--spec)".into()))?;

        self.print_status("Loading submission...");
        let submission = loader::load_submission(submission_dir)?;
        self.print_info(&format!(
            "{} files, {} reviewable sources",
            submission.file_list.len(),
            submission.sources.len()
        ));

        let static_report = loader::load_static_report(report_path)?;
        self.print_info(&format!(
            "{} static analysis issues",
            static_report.issue_count
        ));

        let specification = loader::load_specification(spec_path)?;

        let scorecard_items = match self.cli.scorecard {
            Some(ref path) => loader::load_scorecard(path)?,
            None => Vec::new(),
        };
        if !scorecard_items.is_empty() {
            self.print_info(&format!("{} scorecard items", scorecard_items.len()));
        }

        let declared_stack: BTreeSet<String> = self
            .cli
            .tech_stack
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ReviewInputs {
            submission,
            static_report,
            declared_stack,
            specification,
            scorecard_items,
        })
    }

    fn present_report(&self, report: &Report) -> Result<()> {
        eprintln!();
        if report.accepted() {
            let summary = &report.summary;
            eprintln!("{}", style("Review Summary").bold().underlined());
            let languages: Vec<&str> = report
                .screening_result
                .languages
                .iter()
                .map(String::as_str)
                .collect();
            eprintln!("  Languages:    {}", languages.join(", "));
            eprintln!("  Code quality: {:>5.1}", summary.code_quality);
            eprintln!(
                "  Security:     {:>5.1}  ({} findings)",
                summary.security,
                report.security_findings.len()
            );
            eprintln!("  Performance:  {:>5.1}", summary.performance);
            eprintln!("  Scorecard:    {:>5.1}", summary.scorecard);
            eprintln!(
                "  Total:        {}",
                style(format!("{:.1}", summary.total)).green().bold()
            );
        } else {
            self.print_warning(&format!(
                "Submission rejected: {}",
                report
                    .screening_result
                    .reason
                    .as_deref()
                    .unwrap_or("unspecified")
            ));
        }

        let rendered = serde_json::to_string_pretty(report)?;
        if self.cli.dry_run {
            println!("{rendered}");
        } else {
            std::fs::write(&self.cli.output, format!("{rendered}\n"))?;
            eprintln!(
                "\n{} Report written to {}",
                style("✓").green().bold(),
                self.cli.output.display()
            );
        }

        Ok(())
    }

    // ─── Subcommands ───

    async fn handle_command(&self, cmd: &Commands) -> Result<()> {
        match cmd {
            Commands::Init => {
                let path = Config::create_default()?;
                println!("Created config: {}", path.display());
                Ok(())
            }
            Commands::Config => {
                println!("Backend: {}", self.config.backend);
                println!("Ollama host: {}", self.config.ollama_host);
                println!("Max chunk chars: {}", self.config.max_chunk_chars);
                println!("Max concurrency: {}", self.config.max_concurrency);
                println!("Call timeout: {}s", self.config.timeout_secs);
                println!("Run timeout: {}s", self.config.run_timeout_secs);
                println!("Temperature: {}", self.config.temperature);
                println!("Max tokens: {}", self.config.max_tokens);
                println!();
                println!("[models]");
                println!("  screening: {}", self.config.screening_model());
                for kind in TaskKind::ALL {
                    println!("  {}: {}", kind, self.config.task_model(kind));
                }
                println!();
                println!("[scoring]");
                println!(
                    "  weights: quality {} / security {} / performance {} / scorecard {}",
                    self.config.scoring.code_quality_weight,
                    self.config.scoring.security_weight,
                    self.config.scoring.performance_weight,
                    self.config.scoring.scorecard_weight
                );
                println!(
                    "  security_penalty: {}",
                    self.config.scoring.security_penalty
                );
                println!();
                println!("[retry]");
                println!("  max_attempts: {}", self.config.retry.max_attempts);
                println!(
                    "  backoff: {}ms base, {}ms cap, x{}",
                    self.config.retry.base_delay_ms,
                    self.config.retry.max_delay_ms,
                    self.config.retry.multiplier
                );
                Ok(())
            }
            Commands::Doctor => self.run_doctor().await,
            Commands::Completions { shell } => {
                let mut cmd = <Cli as clap::CommandFactory>::command();
                clap_complete::generate(*shell, &mut cmd, "critiq", &mut std::io::stdout());
                Ok(())
            }
        }
    }

    async fn run_doctor(&self) -> Result<()> {
        eprintln!("{} Running diagnostics...\n", style("→").cyan());

        // Config summary
        eprintln!("{}", style("Configuration").bold().underlined());
        eprintln!("  Backend:     {}", self.config.backend);
        eprintln!("  Concurrency: {}", self.config.max_concurrency);
        eprintln!(
            "  Timeouts:    {}s call, {}s run",
            self.config.timeout_secs, self.config.run_timeout_secs
        );
        if let Some(ref path) = Config::config_path() {
            let status = if path.exists() { "found" } else { "not found" };
            eprintln!("  Config file: {} ({})", path.display(), status);
        }
        eprintln!();

        // Backend connectivity
        eprintln!("{}", style("Backend Check").bold().underlined());
        match self.config.backend {
            Backend::Ollama => {
                eprint!("  Ollama ({}): ", self.config.ollama_host);
                let backend = OllamaBackend::new(&self.config);
                match backend.list_models().await {
                    Ok(available) => {
                        eprintln!("{}", style("OK").green().bold());
                        for model in self.configured_models() {
                            let pulled = available
                                .iter()
                                .any(|a| a == model || a.starts_with(&format!("{model}:")));
                            if pulled {
                                eprintln!("  Model '{}': {}", model, style("available").green());
                            } else {
                                eprintln!(
                                    "  Model '{}': {}",
                                    model,
                                    style("NOT FOUND").red().bold()
                                );
                                eprintln!(
                                    "  Pull with: {}",
                                    style(format!("ollama pull {model}")).yellow()
                                );
                            }
                        }
                    }
                    Err(Error::OllamaNotRunning { .. }) => {
                        eprintln!("{}", style("NOT RUNNING").red().bold());
                        eprintln!("  Start with: {}", style("ollama serve").yellow());
                    }
                    Err(e) => {
                        eprintln!("{}: {}", style("ERROR").red().bold(), e);
                    }
                }
            }
            other => {
                eprint!("  {} API key: ", other);
                if self.config.api_key.is_some() {
                    eprintln!("{}", style("configured").green());
                } else {
                    eprintln!("{}", style("MISSING").red().bold());
                }
            }
        }

        eprintln!();
        eprintln!("{} Diagnostics complete.", style("✓").green().bold());

        Ok(())
    }

    /// Distinct models the current configuration would call.
    fn configured_models(&self) -> BTreeSet<&str> {
        let mut models = BTreeSet::new();
        models.insert(self.config.screening_model());
        for kind in TaskKind::ALL {
            models.insert(self.config.task_model(kind));
        }
        models
    }

    // ─── Output Helpers ───

    fn print_status(&self, msg: &str) {
        eprintln!("{} {}", style("→").cyan(), msg);
    }

    fn print_info(&self, msg: &str) {
        eprintln!("{} {}", style("info:").cyan(), msg);
    }

    fn print_warning(&self, msg: &str) {
        eprintln!("{} {}", style("warning:").yellow().bold(), msg);
    }
}
