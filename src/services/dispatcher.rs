// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, RetryConfig};
use crate::domain::{ScorecardItem, TaskKind, TaskOutcome, TaskResult, TaskStatus};
use crate::services::context::{
    PERFORMANCE_SYSTEM, QUALITY_SYSTEM, ReviewContext, SECURITY_SYSTEM,
};
use crate::services::llm::{BackendError, ModelBackend, ModelRequest};
use crate::services::response::ResponseExtractor;
use crate::services::scorecard::ScorecardEvaluator;

/// Backoff schedule plus the retry predicate, injected into the
/// dispatcher so retry behavior is testable without real delays.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(retry: &RetryConfig) -> Self {
        Self {
            max_attempts: retry.max_attempts,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            multiplier: retry.multiplier,
        }
    }

    /// Delay before the next try, after `attempt` attempts have failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Only transient failures with attempts left in the budget retry.
    pub fn should_retry(&self, error: &BackendError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}

/// Result of one retried, parsed backend call.
pub struct CallOutcome<T> {
    pub result: Result<T, BackendError>,
    pub attempts: u32,
}

/// All task outcomes plus the wall-clock span from first dispatch to
/// last completion.
#[derive(Debug)]
pub struct DispatchReport {
    pub outcomes: Vec<TaskOutcome>,
    pub total_latency: Duration,
}

impl DispatchReport {
    pub fn outcome(&self, kind: TaskKind) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }
}

/// Runs the independent analysis tasks concurrently against the model
/// backend.
///
/// The semaphore is the only shared resource: it caps in-flight backend
/// calls across analysis tasks, scorecard items, and the screening
/// confirmation alike. Each task owns its result slot; a failed task
/// degrades to its documented default without disturbing siblings.
pub struct TaskDispatcher {
    backend: Arc<dyn ModelBackend>,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
    deadline: Instant,
    cancel: CancellationToken,
}

impl TaskDispatcher {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        policy: RetryPolicy,
        max_concurrency: usize,
        run_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            policy,
            deadline: Instant::now() + run_timeout,
            cancel,
        }
    }

    /// Run all four tasks to a terminal state and collect their outcomes.
    /// Task order in the report is fixed: security, quality, performance,
    /// scorecard.
    pub async fn run(
        &self,
        ctx: &ReviewContext,
        config: &Config,
        items: Vec<ScorecardItem>,
    ) -> DispatchReport {
        let started = Instant::now();

        let (security, quality, performance, scorecard) = tokio::join!(
            self.single_call_task(
                TaskKind::Security,
                self.request(config, TaskKind::Security, SECURITY_SYSTEM, ctx.security_prompt(config)),
                ResponseExtractor::security_findings,
                TaskResult::Security,
            ),
            self.single_call_task(
                TaskKind::Quality,
                self.request(config, TaskKind::Quality, QUALITY_SYSTEM, ctx.quality_prompt(config)),
                ResponseExtractor::quality_metrics,
                TaskResult::Quality,
            ),
            self.single_call_task(
                TaskKind::Performance,
                self.request(
                    config,
                    TaskKind::Performance,
                    PERFORMANCE_SYSTEM,
                    ctx.performance_prompt(config),
                ),
                ResponseExtractor::performance_metrics,
                TaskResult::Performance,
            ),
            self.scorecard_task(ctx, config, items),
        );

        let total_latency = started.elapsed();
        debug!(?total_latency, "all tasks terminal");

        DispatchReport {
            outcomes: vec![security, quality, performance, scorecard],
            total_latency,
        }
    }

    /// One rate-limited, deadline-aware backend call, retried per policy.
    /// An unparseable or empty response counts as a transient failure.
    pub async fn call<T>(
        &self,
        task: &str,
        request: &ModelRequest,
        parse: impl Fn(&str) -> Option<T>,
    ) -> CallOutcome<T> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.attempt(task, request).await {
                Ok(text) => match parse(&text) {
                    Some(value) => {
                        return CallOutcome {
                            result: Ok(value),
                            attempts: attempt,
                        };
                    }
                    None => BackendError::transient("unparseable response"),
                },
                Err(error) => error,
            };

            if !self.policy.should_retry(&error, attempt) {
                return CallOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.policy.delay_for(attempt);
            if Instant::now() + delay >= self.deadline {
                debug!(task, "deadline would pass during backoff, abandoning retries");
                return CallOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            debug!(task, attempt, ?delay, error = %error, "transient failure, backing off");
            tokio::time::sleep(delay).await;
        }
    }

    /// One attempt: take a permit, bound the call by the remaining run
    /// budget, classify the result. The permit is released before any
    /// backoff sleep.
    async fn attempt(&self, task: &str, request: &ModelRequest) -> Result<String, BackendError> {
        if self.cancel.is_cancelled() {
            return Err(BackendError::fatal("run cancelled"));
        }

        let Ok(_permit) = self.permits.acquire().await else {
            return Err(BackendError::fatal("dispatcher shut down"));
        };

        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(BackendError::transient("run deadline exceeded"));
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(BackendError::fatal("run cancelled")),
            outcome = timeout(remaining, self.backend.invoke(task, request)) => match outcome {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    Err(BackendError::transient("empty response body"))
                }
                Ok(inner) => inner,
                Err(_) => Err(BackendError::transient("run deadline exceeded")),
            },
        }
    }

    fn request(
        &self,
        config: &Config,
        kind: TaskKind,
        system: &str,
        user: String,
    ) -> ModelRequest {
        ModelRequest {
            model: config.task_model(kind).to_string(),
            system: system.to_string(),
            user,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Security, quality and performance each resolve with one parsed
    /// call; on exhaustion the task's documented default stands in.
    async fn single_call_task<T>(
        &self,
        kind: TaskKind,
        request: ModelRequest,
        parse: impl Fn(&str) -> Option<T>,
        wrap: impl FnOnce(T) -> TaskResult,
    ) -> TaskOutcome {
        let started = Instant::now();
        debug!(task = %kind, model = %request.model, "task running");

        let call = self.call(kind.as_str(), &request, parse).await;
        let (status, result, error) = match call.result {
            Ok(value) => (TaskStatus::Succeeded, wrap(value), None),
            Err(error) => {
                warn!(task = %kind, %error, attempts = call.attempts, "task failed, using default result");
                (
                    TaskStatus::FailedFatal,
                    TaskResult::default_for(kind),
                    Some(error.to_string()),
                )
            }
        };

        TaskOutcome {
            kind,
            model: request.model,
            status,
            result,
            error,
            latency: started.elapsed(),
            attempts: call.attempts,
        }
    }

    /// The scorecard task fans out one call per item through the same
    /// permit pool; items degrade individually, so the task only counts
    /// as failed when every item came back unanswered.
    async fn scorecard_task(
        &self,
        ctx: &ReviewContext,
        config: &Config,
        items: Vec<ScorecardItem>,
    ) -> TaskOutcome {
        let started = Instant::now();
        let model = config.task_model(TaskKind::Scorecard).to_string();
        let total = items.len();
        debug!(task = %TaskKind::Scorecard, model = %model, items = total, "task running");

        let evaluated = ScorecardEvaluator::evaluate(self, ctx, items, config).await;
        let answered = evaluated.iter().filter(|i| i.is_answered()).count();

        let (status, error) = if answered > 0 || total == 0 {
            (TaskStatus::Succeeded, None)
        } else {
            warn!(task = %TaskKind::Scorecard, total, "no scorecard answers produced");
            (
                TaskStatus::FailedFatal,
                Some("no scorecard answers produced".to_string()),
            )
        };

        TaskOutcome {
            kind: TaskKind::Scorecard,
            model,
            status,
            result: TaskResult::Scorecard(evaluated),
            error,
            latency: started.elapsed(),
            attempts: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, max_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            multiplier,
        }
    }

    #[test]
    fn backoff_grows_exponentially() {
        let p = policy(100, 10_000, 2.0);
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped() {
        let p = policy(100, 350, 2.0);
        assert_eq!(p.delay_for(3), Duration::from_millis(350));
        assert_eq!(p.delay_for(30), Duration::from_millis(350));
    }

    #[test]
    fn transient_errors_retry_until_budget() {
        let p = policy(1, 10, 2.0);
        let transient = BackendError::transient("timeout");
        assert!(p.should_retry(&transient, 1));
        assert!(p.should_retry(&transient, 2));
        assert!(!p.should_retry(&transient, 3));
    }

    #[test]
    fn fatal_errors_never_retry() {
        let p = policy(1, 10, 2.0);
        let fatal = BackendError::fatal("invalid credentials");
        assert!(!p.should_retry(&fatal, 1));
    }
}
