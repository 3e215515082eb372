// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Outcome of the screening gate.
///
/// `languages` is the merged view of what the submission appears to be
/// written in; `reason` is set only when the submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub valid: bool,
    pub languages: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScreeningResult {
    pub fn accepted(languages: BTreeSet<String>) -> Self {
        Self {
            valid: true,
            languages,
            reason: None,
        }
    }

    pub fn rejected(languages: BTreeSet<String>, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            languages,
            reason: Some(reason.into()),
        }
    }
}
