// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use critiq::config::Config;
use critiq::domain::{ScorecardItem, SourceFile, StaticReport};
use critiq::services::chunker::ChunkSplitter;
use critiq::services::context::ReviewContext;
use critiq::services::llm::{BackendError, BackendResult, ModelBackend, ModelRequest};

/// Scripted model backend.
///
/// Responses are queued per task name and consumed in call order; a task
/// whose queue runs dry gets a fatal error so an under-scripted test
/// fails loudly instead of spinning through retries. Call counts and the
/// concurrency high-water mark are recorded for assertions.
pub struct FakeBackend {
    scripts: Mutex<HashMap<String, VecDeque<BackendResult<String>>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every call sleeps this long before answering, so overlap between
    /// calls becomes observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response for `task`.
    pub fn script(self, task: &str, body: &str) -> Self {
        self.push(task, Ok(body.to_string()));
        self
    }

    /// Queue a failure for `task`.
    pub fn script_err(self, task: &str, error: BackendError) -> Self {
        self.push(task, Err(error));
        self
    }

    fn push(&self, task: &str, result: BackendResult<String>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(task.to_string())
            .or_default()
            .push_back(result);
    }

    /// Total calls observed across all tasks.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously in-flight calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for FakeBackend {
    async fn invoke(&self, task: &str, _request: &ModelRequest) -> BackendResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(task)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(BackendError::fatal(format!("unscripted call: {task}"))));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn verify(&self) -> critiq::error::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config with retry backoff shrunk to a millisecond so exhaustion tests
/// stay fast.
#[allow(dead_code)]
pub fn make_config() -> Config {
    let mut config = Config::default();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 2;
    config
}

/// Review context built from one small Python file.
#[allow(dead_code)]
pub fn make_context() -> ReviewContext {
    let splitter = ChunkSplitter::new(8_000);
    let chunks = splitter.split(&[SourceFile::new(
        "app.py",
        "def handler(event):\n    return {\"ok\": True}\n",
    )]);
    ReviewContext::build(
        &chunks,
        &StaticReport::default(),
        "Build an event handler.",
        vec!["app.py".into()],
        &make_config(),
    )
}

/// `count` scorecard items with equal weight and numbered questions.
#[allow(dead_code)]
pub fn make_items(count: usize) -> Vec<ScorecardItem> {
    (0..count)
        .map(|i| ScorecardItem::new(format!("Question {i}?"), "general", 1.0))
        .collect()
}

/// Queue one good response for each single-call analysis task.
#[allow(dead_code)]
pub fn script_analysis_ok(backend: FakeBackend) -> FakeBackend {
    backend
        .script("security", "[]")
        .script(
            "quality",
            r#"{"maintainability_score": 80, "code_smells": 2, "doc_coverage": 60}"#,
        )
        .script(
            "performance",
            r#"{"rating": 70, "bottlenecks": [], "optimization_suggestions": []}"#,
        )
}
