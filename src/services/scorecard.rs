// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{ScorecardItem, TaskKind};
use crate::services::context::{ReviewContext, SCORECARD_SYSTEM, truncate_chars};
use crate::services::dispatcher::TaskDispatcher;
use crate::services::llm::ModelRequest;
use crate::services::response::ResponseExtractor;

/// Answers scorecard items concurrently, one backend call per item.
///
/// Items share the dispatcher's permit pool with the analysis tasks, so
/// a large scorecard cannot starve them. Output order always matches
/// input order; a failed item keeps its question and weight but carries
/// no answer and confidence 0.
pub struct ScorecardEvaluator;

impl ScorecardEvaluator {
    pub async fn evaluate(
        dispatcher: &TaskDispatcher,
        ctx: &ReviewContext,
        items: Vec<ScorecardItem>,
        config: &Config,
    ) -> Vec<ScorecardItem> {
        let futures = items
            .into_iter()
            .map(|item| Self::evaluate_item(dispatcher, ctx, item, config));
        join_all(futures).await
    }

    async fn evaluate_item(
        dispatcher: &TaskDispatcher,
        ctx: &ReviewContext,
        mut item: ScorecardItem,
        config: &Config,
    ) -> ScorecardItem {
        let request = ModelRequest {
            model: config.task_model(TaskKind::Scorecard).to_string(),
            system: SCORECARD_SYSTEM.to_string(),
            user: ctx.scorecard_prompt(&item, config),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let call = dispatcher
            .call(TaskKind::Scorecard.as_str(), &request, ResponseExtractor::scorecard_answer)
            .await;

        match call.result {
            Ok(parsed) => {
                item.answer = Some(truncate_chars(&parsed.answer, config.answer_max_chars));
                item.confidence = parsed.confidence;
                debug!(
                    question = %item.question,
                    confidence = item.confidence,
                    attempts = call.attempts,
                    "scorecard item answered"
                );
            }
            Err(error) => {
                warn!(question = %item.question, %error, "scorecard item unanswered");
                item.answer = None;
                item.confidence = 0;
            }
        }

        item
    }
}
