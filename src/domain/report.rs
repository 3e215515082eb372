// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Finding, PerformanceMetrics, QualityMetrics, ScorecardItem, ScreeningResult};

/// The four dimension scores plus the weighted total, each on a 0-100
/// scale. `total` is rounded to one decimal place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub code_quality: f64,
    pub security: f64,
    pub performance: f64,
    pub scorecard: f64,
    pub total: f64,
}

/// Final review report. Field order here is the on-the-wire JSON order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub screening_result: ScreeningResult,
    pub security_findings: Vec<Finding>,
    pub quality_metrics: QualityMetrics,
    pub performance_metrics: PerformanceMetrics,
    pub scorecard: Vec<ScorecardItem>,
    pub summary: Summary,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    pub fn accepted(&self) -> bool {
        self.screening_result.valid
    }
}
