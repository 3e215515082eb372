// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The four independent analysis tasks the dispatcher runs per review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Security,
    Quality,
    Performance,
    Scorecard,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Security,
        TaskKind::Quality,
        TaskKind::Performance,
        TaskKind::Scorecard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Quality => "quality",
            Self::Performance => "performance",
            Self::Scorecard => "scorecard",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one dispatched task. Only the owning worker moves a task
/// through these states; `Succeeded` and `FailedFatal` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    /// Retryable failure observed; the worker will attempt again if the
    /// retry budget allows.
    FailedTransient,
    FailedFatal,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedFatal)
    }
}

/// One issue reported by the security analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub issue: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub confidence: u8,
    pub file: String,
    pub recommendation: String,
}

/// Quality metrics as reported by the model, normalized to a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub maintainability_score: f64,
    pub code_smells: u32,
    pub doc_coverage: f64,
}

/// Performance metrics as reported by the model, normalized to a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub rating: f64,
    pub bottlenecks: Vec<String>,
    pub optimization_suggestions: Vec<String>,
}

/// Typed result of a completed task. Failed tasks carry the documented
/// default for their kind so aggregation never sees partial data.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Security(Vec<Finding>),
    Quality(QualityMetrics),
    Performance(PerformanceMetrics),
    Scorecard(Vec<super::ScorecardItem>),
}

impl TaskResult {
    /// Default result substituted when a task fails past its retry budget.
    pub fn default_for(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Security => Self::Security(Vec::new()),
            TaskKind::Quality => Self::Quality(QualityMetrics::default()),
            TaskKind::Performance => Self::Performance(PerformanceMetrics::default()),
            TaskKind::Scorecard => Self::Scorecard(Vec::new()),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Security(_) => TaskKind::Security,
            Self::Quality(_) => TaskKind::Quality,
            Self::Performance(_) => TaskKind::Performance,
            Self::Scorecard(_) => TaskKind::Scorecard,
        }
    }
}

/// Terminal record of one dispatched task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    /// Model the call was routed to.
    pub model: String,
    pub status: TaskStatus,
    pub result: TaskResult,
    /// Last error message observed, kept for the run log.
    pub error: Option<String>,
    /// Wall-clock time from first attempt to terminal state.
    pub latency: Duration,
    pub attempts: u32,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}
