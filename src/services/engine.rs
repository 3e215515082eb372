// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::domain::{Report, ReviewInputs};
use crate::error::{Error, Result};
use crate::services::aggregator::ScoreAggregator;
use crate::services::chunker::ChunkSplitter;
use crate::services::context::ReviewContext;
use crate::services::dispatcher::{RetryPolicy, TaskDispatcher};
use crate::services::llm::{ModelBackend, create_backend};
use crate::services::screening::ScreeningGate;

/// Drives one review run end to end: chunk, screen, dispatch, aggregate.
///
/// The engine owns the backend and the cancellation token; everything
/// else is built per run so two runs never share mutable state.
pub struct ReviewEngine {
    config: Config,
    backend: Arc<dyn ModelBackend>,
    cancel: CancellationToken,
}

impl ReviewEngine {
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        let backend = create_backend(&config);
        Self {
            config,
            backend,
            cancel,
        }
    }

    /// Swap in a caller-provided backend. Used by tests and by doctor
    /// probes that already hold a connected backend.
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn ModelBackend>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            backend,
            cancel,
        }
    }

    pub async fn run_review(&self, inputs: ReviewInputs) -> Result<Report> {
        let splitter = ChunkSplitter::new(self.config.max_chunk_chars);
        let chunks = splitter.split(&inputs.submission.sources);
        info!(
            files = inputs.submission.sources.len(),
            chunks = chunks.len(),
            issues = inputs.static_report.issue_count,
            "submission prepared"
        );

        let ctx = ReviewContext::build(
            &chunks,
            &inputs.static_report,
            &inputs.specification,
            inputs.submission.file_list.clone(),
            &self.config,
        );

        let dispatcher = TaskDispatcher::new(
            self.backend.clone(),
            RetryPolicy::from_config(&self.config.retry),
            self.config.max_concurrency,
            Duration::from_secs(self.config.run_timeout_secs),
            self.cancel.clone(),
        );

        let screening = ScreeningGate::review(
            &dispatcher,
            &ctx,
            &self.config,
            &chunks,
            &inputs.submission.detected_languages,
            &inputs.declared_stack,
        )
        .await;

        if !screening.valid {
            info!(reason = ?screening.reason, "submission rejected at screening");
            return Ok(ScoreAggregator::rejected(screening, Utc::now()));
        }
        info!(languages = ?screening.languages, "submission accepted for analysis");

        let dispatch = dispatcher
            .run(&ctx, &self.config, inputs.scorecard_items)
            .await;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        for outcome in &dispatch.outcomes {
            info!(
                task = %outcome.kind,
                status = ?outcome.status,
                attempts = outcome.attempts,
                latency_ms = outcome.latency.as_millis() as u64,
                "task finished"
            );
        }

        Ok(ScoreAggregator::aggregate(
            screening,
            dispatch.outcomes,
            &self.config.scoring,
            Utc::now(),
        ))
    }
}
