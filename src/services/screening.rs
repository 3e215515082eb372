// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::{Config, LanguageMergePolicy};
use crate::domain::{Chunk, ScreeningResult};
use crate::services::context::{ReviewContext, SCREENING_SYSTEM};
use crate::services::dispatcher::TaskDispatcher;
use crate::services::llm::ModelRequest;
use crate::services::response::ResponseExtractor;

/// Canonical name for a language tag as reported by detection, the
/// confirmation call, or the declared stack. Non-language noise (tool
/// names, frameworks the reviewer cannot verify) maps to `None`.
pub fn normalize_language(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let canonical = match trimmed.to_lowercase().as_str() {
        "python" | "python3" => "Python",
        "typescript" | "ts" | "node.js (typescript)" => "TypeScript",
        "javascript" | "js" | "node" | "node.js" | "nodejs" => "JavaScript",
        "html" => "HTML",
        "css" => "CSS",
        "rust" => "Rust",
        "go" | "golang" => "Go",
        "java" => "Java",
        "kotlin" => "Kotlin",
        "swift" => "Swift",
        "c" => "C",
        "c++" | "cpp" => "C++",
        "c#" | "csharp" => "C#",
        "ruby" => "Ruby",
        "php" => "PHP",
        "shell" | "bash" | "sh" => "Shell",
        "sql" => "SQL",
        _ => return None,
    };

    Some(canonical.to_string())
}

/// Decides whether a submission is worth reviewing at all.
///
/// Detection by file extension always wins a seat at the table: the
/// confirmation call can add languages (or, under `confirmed_only`,
/// replace the set), but a failed or empty confirmation never erases
/// what the extensions say. Rejection happens for exactly two reasons:
/// nothing reviewable in the corpus, or no overlap with the declared
/// stack.
pub struct ScreeningGate;

impl ScreeningGate {
    pub async fn review(
        dispatcher: &TaskDispatcher,
        ctx: &ReviewContext,
        config: &Config,
        chunks: &[Chunk],
        detected: &BTreeSet<String>,
        declared: &BTreeSet<String>,
    ) -> ScreeningResult {
        if !chunks.iter().any(Chunk::has_code) {
            debug!("no reviewable content, rejecting without confirmation");
            return ScreeningResult::rejected(BTreeSet::new(), "empty or non-code submission");
        }

        let declared: BTreeSet<String> =
            declared.iter().filter_map(|s| normalize_language(s)).collect();

        if !declared.is_empty() && detected.intersection(&declared).next().is_none() {
            debug!(
                ?detected,
                ?declared,
                "extension detection matched no declared language, deferring to confirmation"
            );
        }

        let languages = match (Self::confirm(dispatcher, ctx, config, detected).await, config.merge_policy) {
            (Some(confirmed), LanguageMergePolicy::Union) => {
                detected.union(&confirmed).cloned().collect()
            }
            (Some(confirmed), LanguageMergePolicy::ConfirmedOnly) => confirmed,
            (None, _) => detected.clone(),
        };

        if declared.is_empty() || languages.intersection(&declared).next().is_some() {
            ScreeningResult::accepted(languages)
        } else {
            let expected = declared.iter().cloned().collect::<Vec<_>>().join(", ");
            ScreeningResult::rejected(
                languages,
                format!("no declared technology found in submission: expected {expected}"),
            )
        }
    }

    /// One confirmation call. An empty confirmed set carries no signal
    /// and is treated like a failed call.
    async fn confirm(
        dispatcher: &TaskDispatcher,
        ctx: &ReviewContext,
        config: &Config,
        detected: &BTreeSet<String>,
    ) -> Option<BTreeSet<String>> {
        let detected_list: Vec<String> = detected.iter().cloned().collect();
        let request = ModelRequest {
            model: config.screening_model().to_string(),
            system: SCREENING_SYSTEM.to_string(),
            user: ctx.screening_prompt(&detected_list),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let call = dispatcher
            .call("screening", &request, ResponseExtractor::languages)
            .await;

        match call.result {
            Ok(raw) => {
                let confirmed: BTreeSet<String> =
                    raw.iter().filter_map(|l| normalize_language(l)).collect();
                if confirmed.is_empty() {
                    warn!("confirmation returned no recognizable language, keeping detected set");
                    return None;
                }
                debug!(?confirmed, attempts = call.attempts, "language confirmation succeeded");
                Some(confirmed)
            }
            Err(error) => {
                warn!(%error, "language confirmation failed, keeping detected set");
                None
            }
        }
    }
}
