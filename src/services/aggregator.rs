// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};

use crate::config::ScoringConfig;
use crate::domain::{
    Finding, PerformanceMetrics, QualityMetrics, Report, ScorecardItem, ScreeningResult, Summary,
    TaskOutcome, TaskResult,
};

/// Deterministic reduction of task outcomes into the final report.
///
/// No model output is consulted here: the same outcomes and weights
/// always produce the same summary. Failed tasks arrive carrying their
/// documented default result, so aggregation never needs to know why a
/// task failed.
pub struct ScoreAggregator;

impl ScoreAggregator {
    pub fn aggregate(
        screening: ScreeningResult,
        outcomes: Vec<TaskOutcome>,
        scoring: &ScoringConfig,
        timestamp: DateTime<Utc>,
    ) -> Report {
        let mut findings: Vec<Finding> = Vec::new();
        let mut quality = QualityMetrics::default();
        let mut performance = PerformanceMetrics::default();
        let mut scorecard: Vec<ScorecardItem> = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                TaskResult::Security(value) => findings = value,
                TaskResult::Quality(value) => quality = value,
                TaskResult::Performance(value) => performance = value,
                TaskResult::Scorecard(value) => scorecard = value,
            }
        }

        let code_quality = clamp_dimension(quality.maintainability_score);
        let security =
            clamp_dimension(100.0 - scoring.security_penalty * findings.len() as f64);
        let performance_score = clamp_dimension(performance.rating);
        let scorecard_score = Self::scorecard_score(&scorecard);

        let total = round1(
            code_quality * scoring.code_quality_weight
                + security * scoring.security_weight
                + performance_score * scoring.performance_weight
                + scorecard_score * scoring.scorecard_weight,
        );

        Report {
            screening_result: screening,
            security_findings: findings,
            quality_metrics: quality,
            performance_metrics: performance,
            scorecard,
            summary: Summary {
                code_quality,
                security,
                performance: performance_score,
                scorecard: scorecard_score,
                total,
            },
            timestamp,
        }
    }

    /// Report for a submission that never reached the analysis tasks.
    pub fn rejected(screening: ScreeningResult, timestamp: DateTime<Utc>) -> Report {
        Report {
            screening_result: screening,
            security_findings: Vec::new(),
            quality_metrics: QualityMetrics::default(),
            performance_metrics: PerformanceMetrics::default(),
            scorecard: Vec::new(),
            summary: Summary::default(),
            timestamp,
        }
    }

    /// Confidence-weighted share of the maximum confidence, as a
    /// percentage. Unanswered items keep their weight in the denominator;
    /// a scorecard with no weight at all carries no signal and scores 0.
    fn scorecard_score(items: &[ScorecardItem]) -> f64 {
        let total_weight: f64 = items.iter().map(|i| i.weight).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }

        let achieved: f64 = items
            .iter()
            .map(|i| f64::from(i.confidence) / 5.0 * i.weight)
            .sum();
        clamp_dimension(100.0 * achieved / total_weight)
    }
}

/// Dimension scores are always finite 0-100. NaN can only come from a
/// parser bug upstream; degrade to 0 rather than poisoning the total.
fn clamp_dimension(value: f64) -> f64 {
    debug_assert!(!value.is_nan(), "dimension scores are computed from finite inputs");
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Round half away from zero to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
