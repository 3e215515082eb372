// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use serde_json::Value;

use crate::domain::ScorecardItem;

/// One reviewable file from the submission, path relative to the
/// submission root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Everything the intake step learned about a submission directory.
#[derive(Debug, Default)]
pub struct Submission {
    pub sources: Vec<SourceFile>,
    /// Canonical language names inferred from file extensions.
    pub detected_languages: BTreeSet<String>,
    /// Every file seen under the submission root, reviewable or not.
    pub file_list: Vec<String>,
}

impl Submission {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Parsed static-analysis report. The issue entries stay opaque; only the
/// count and the raw document are consumed downstream.
#[derive(Debug, Clone, Default)]
pub struct StaticReport {
    pub issue_count: usize,
    pub issues: Vec<Value>,
    pub raw: Value,
}

/// Complete input set for one review run.
#[derive(Debug, Default)]
pub struct ReviewInputs {
    pub submission: Submission,
    pub static_report: StaticReport,
    /// Languages the submitter claims to have used, as supplied.
    pub declared_stack: BTreeSet<String>,
    /// Challenge specification text, possibly empty.
    pub specification: String,
    pub scorecard_items: Vec<ScorecardItem>,
}
