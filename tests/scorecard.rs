// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use critiq::services::dispatcher::{RetryPolicy, TaskDispatcher};
use critiq::services::llm::BackendError;
use critiq::services::scorecard::ScorecardEvaluator;

use helpers::{FakeBackend, make_config, make_context, make_items};

// ─── Test helpers ────────────────────────────────────────────────────────────

fn dispatcher(backend: Arc<FakeBackend>, cap: usize, max_attempts: u32) -> TaskDispatcher {
    TaskDispatcher::new(
        backend,
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        },
        cap,
        Duration::from_secs(5),
        CancellationToken::new(),
    )
}

fn answer(text: &str, confidence: u8) -> String {
    format!(r#"[{{"answer": "{text}", "confidence": {confidence}}}]"#)
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn answers_keep_input_order() {
    let backend = Arc::new(
        FakeBackend::new()
            .script("scorecard", &answer("first", 5))
            .script("scorecard", &answer("second", 4))
            .script("scorecard", &answer("third", 3)),
    );
    let evaluator = dispatcher(backend.clone(), 1, 3);

    let items = ScorecardEvaluator::evaluate(
        &evaluator,
        &make_context(),
        make_items(3),
        &make_config(),
    )
    .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].question, "Question 0?");
    assert_eq!(items[0].answer.as_deref(), Some("first"));
    assert_eq!(items[1].answer.as_deref(), Some("second"));
    assert_eq!(items[2].answer.as_deref(), Some("third"));
    assert_eq!(items[2].confidence, 3);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn empty_scorecard_makes_no_calls() {
    let backend = Arc::new(FakeBackend::new());
    let evaluator = dispatcher(backend.clone(), 1, 3);

    let items = ScorecardEvaluator::evaluate(
        &evaluator,
        &make_context(),
        Vec::new(),
        &make_config(),
    )
    .await;

    assert!(items.is_empty());
    assert_eq!(backend.calls(), 0);
}

// ─── Answer shaping ──────────────────────────────────────────────────────────

#[tokio::test]
async fn long_answers_are_truncated() {
    let long = "x".repeat(80);
    let backend = Arc::new(FakeBackend::new().script("scorecard", &answer(&long, 4)));
    let evaluator = dispatcher(backend.clone(), 1, 3);

    let mut config = make_config();
    config.answer_max_chars = 20;

    let items =
        ScorecardEvaluator::evaluate(&evaluator, &make_context(), make_items(1), &config).await;

    let stored = items[0].answer.as_deref().unwrap();
    assert_eq!(stored.len(), 20);
    assert_eq!(stored, &long[..20]);
    assert_eq!(items[0].confidence, 4);
}

#[tokio::test]
async fn weights_and_categories_pass_through_untouched() {
    let backend = Arc::new(FakeBackend::new().script("scorecard", &answer("yes", 5)));
    let evaluator = dispatcher(backend.clone(), 1, 3);

    let mut items = make_items(1);
    items[0].weight = 12.5;
    items[0].category = "security".into();

    let items =
        ScorecardEvaluator::evaluate(&evaluator, &make_context(), items, &make_config()).await;

    assert_eq!(items[0].weight, 12.5);
    assert_eq!(items[0].category, "security");
    assert!(items[0].is_answered());
}

// ─── Partial failure ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_item_is_unanswered_while_siblings_answer() {
    // One retry attempt so the failing item consumes exactly one script.
    let backend = Arc::new(
        FakeBackend::new()
            .script("scorecard", &answer("covered", 4))
            .script_err("scorecard", BackendError::transient("overloaded"))
            .script("scorecard", &answer("documented", 5)),
    );
    let evaluator = dispatcher(backend.clone(), 1, 1);

    let items = ScorecardEvaluator::evaluate(
        &evaluator,
        &make_context(),
        make_items(3),
        &make_config(),
    )
    .await;

    assert_eq!(items[0].answer.as_deref(), Some("covered"));
    assert!(items[0].is_answered());

    assert_eq!(items[1].answer, None);
    assert_eq!(items[1].confidence, 0);
    assert!(!items[1].is_answered());
    assert_eq!(items[1].question, "Question 1?");

    assert_eq!(items[2].answer.as_deref(), Some("documented"));
    assert_eq!(backend.calls(), 3);
}
