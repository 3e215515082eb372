// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// One weighted questionnaire entry.
///
/// `question`, `category` and `weight` come from the caller; `answer` and
/// `confidence` are filled in by the evaluator. Confidence 0 marks an item
/// the evaluator could not answer at all; answered items carry 1 to 5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardItem {
    pub question: String,
    #[serde(default)]
    pub category: String,
    pub weight: f64,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub confidence: u8,
}

impl ScorecardItem {
    pub fn new(question: impl Into<String>, category: impl Into<String>, weight: f64) -> Self {
        Self {
            question: question.into(),
            category: category.into(),
            weight,
            answer: None,
            confidence: 0,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.confidence > 0
    }
}
