// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::domain::{Finding, PerformanceMetrics, QualityMetrics};

static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\n?(.*?)\n?```").unwrap());

static OBJECT_ARRAY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").unwrap());

static OBJECT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());

static STRING_ARRAY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[[^\[\]]*\]").unwrap());

static ANSWER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?si)"answer"\s*:\s*"(.*?)"(?:\s*,\s*"confidence"\s*:\s*(\d+))?"#).unwrap()
});

static QUALITY_OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{\s*"maintainability_score".*?\}"#).unwrap());

static PERFORMANCE_OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{\s*"rating".*?\}"#).unwrap());

/// Answer and confidence recovered from one scorecard call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorecardAnswer {
    pub answer: String,
    pub confidence: u8,
}

/// Recovers typed task results from loosely-formatted model output.
///
/// Models are prompted to return bare JSON but routinely wrap it in code
/// fences or prose. Each extractor walks the same ladder: strip fences,
/// isolate the JSON shape the task expects, then parse with per-field
/// defaults. `None` means nothing usable was found; the dispatcher treats
/// that as a retryable failure.
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn security_findings(raw: &str) -> Option<Vec<Finding>> {
        let cleaned = Self::strip_fences(raw);

        let candidate = match OBJECT_ARRAY_REGEX.find(&cleaned) {
            Some(m) => m.as_str().to_string(),
            None => {
                let trimmed = cleaned.trim();
                if trimmed == "[]" {
                    return Some(Vec::new());
                }
                // A bare object is accepted as a single-finding list.
                if trimmed.starts_with('[') {
                    trimmed.to_string()
                } else {
                    format!("[{trimmed}]")
                }
            }
        };

        let parsed: Value = serde_json::from_str(&candidate).ok()?;
        let entries = parsed.as_array()?;

        Some(entries.iter().filter_map(Self::finding_from_value).collect())
    }

    pub fn quality_metrics(raw: &str) -> Option<QualityMetrics> {
        let object = Self::isolate_object(raw, &QUALITY_OBJECT_REGEX)?;

        Some(QualityMetrics {
            maintainability_score: Self::scale_score(
                object.get("maintainability_score").and_then(Value::as_f64).unwrap_or(0.0),
            ),
            code_smells: object.get("code_smells").and_then(Value::as_u64).unwrap_or(0) as u32,
            doc_coverage: object.get("doc_coverage").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    pub fn performance_metrics(raw: &str) -> Option<PerformanceMetrics> {
        let object = Self::isolate_object(raw, &PERFORMANCE_OBJECT_REGEX)?;

        Some(PerformanceMetrics {
            rating: Self::scale_score(object.get("rating").and_then(Value::as_f64).unwrap_or(0.0)),
            bottlenecks: Self::string_list(object.get("bottlenecks")),
            optimization_suggestions: Self::string_list(object.get("optimization_suggestions")),
        })
    }

    /// Ladder: object array → bare object → regex field extraction →
    /// plain-text fallback with the lowest confidence.
    pub fn scorecard_answer(raw: &str) -> Option<ScorecardAnswer> {
        let cleaned = Self::strip_fences(raw);
        let cleaned = cleaned.trim();

        if let Some(candidate) = Self::isolate_answer_json(cleaned) {
            if let Ok(parsed) = serde_json::from_str::<Value>(&candidate) {
                let object = match &parsed {
                    Value::Array(items) => items.first().and_then(Value::as_object),
                    Value::Object(map) => Some(map),
                    _ => None,
                };
                if let Some(object) = object {
                    let answer = object
                        .get("answer")
                        .and_then(Value::as_str)
                        .unwrap_or("Unable to process")
                        .to_string();
                    return Some(ScorecardAnswer {
                        answer,
                        confidence: Self::clamp_confidence(object.get("confidence")),
                    });
                }
            }

            // Broken JSON: pull the fields out with a regex.
            if let Some(caps) = ANSWER_REGEX.captures(&candidate) {
                let answer = caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| "Parsed with issues".to_string());
                let confidence = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .map_or(1, |c| c.clamp(1, 5) as u8);
                return Some(ScorecardAnswer { answer, confidence });
            }
        }

        // No JSON at all: treat the first prose segment as the answer,
        // with the lowest confidence since nothing was structured.
        Self::text_fallback(cleaned).map(|answer| ScorecardAnswer {
            answer,
            confidence: 1,
        })
    }

    /// Confirmed-language list from the screening call. `None` when the
    /// response is not a JSON string array.
    pub fn languages(raw: &str) -> Option<Vec<String>> {
        let cleaned = Self::strip_fences(raw);
        let candidate = STRING_ARRAY_REGEX.find(&cleaned)?.as_str();
        let parsed: Vec<String> = serde_json::from_str(candidate).ok()?;
        Some(parsed)
    }

    /// Scores reported as a 0-1 fraction are rescaled to 0-100.
    fn scale_score(value: f64) -> f64 {
        if value <= 1.0 { value * 100.0 } else { value }
    }

    fn clamp_confidence(value: Option<&Value>) -> u8 {
        match value.and_then(Value::as_f64) {
            Some(c) => (c as i64).clamp(1, 5) as u8,
            None => 1,
        }
    }

    fn finding_from_value(value: &Value) -> Option<Finding> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Some(Finding {
            issue: text("issue"),
            kind: text("type"),
            severity: text("severity"),
            confidence: object.get("confidence").and_then(Value::as_u64).unwrap_or(0).min(5) as u8,
            file: text("file"),
            recommendation: text("recommendation"),
        })
    }

    fn string_list(value: Option<&Value>) -> Vec<String> {
        value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn strip_fences(raw: &str) -> String {
        CODE_FENCE_REGEX.replace_all(raw.trim(), "$1").to_string()
    }

    /// First JSON object matching the task's anchored pattern, parsed.
    /// Falls back to the outermost brace span when the anchor misses.
    fn isolate_object(raw: &str, anchored: &Regex) -> Option<Value> {
        let cleaned = Self::strip_fences(raw);

        if let Some(m) = anchored.find(&cleaned) {
            if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }

        let start = cleaned.find('{')?;
        let end = cleaned.rfind('}')?;
        if end <= start {
            return None;
        }

        let value = serde_json::from_str::<Value>(&cleaned[start..=end]).ok()?;
        if value.is_object() {
            debug!("anchored object search missed, outer braces parsed");
            Some(value)
        } else {
            None
        }
    }

    fn isolate_answer_json(cleaned: &str) -> Option<String> {
        if let Some(m) = OBJECT_ARRAY_REGEX.find(cleaned) {
            return Some(m.as_str().to_string());
        }

        let start = cleaned.find("[{");
        let end = cleaned.rfind("}]");
        if let (Some(start), Some(end)) = (start, end) {
            if end > start {
                return Some(cleaned[start..end + 2].to_string());
            }
        }

        OBJECT_REGEX
            .find(cleaned)
            .map(|m| format!("[{}]", m.as_str()))
    }

    /// First segment of prose outside any JSON structure, if one exists.
    fn text_fallback(cleaned: &str) -> Option<String> {
        cleaned
            .split(['`', '{', '}', '[', ']'])
            .map(str::trim)
            .find(|segment| segment.chars().any(char::is_alphanumeric))
            .map(str::to_string)
    }
}
