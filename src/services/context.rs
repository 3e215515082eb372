// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::config::Config;
use crate::domain::{Chunk, ScorecardItem, StaticReport};
use crate::services::chunker::ChunkSplitter;

pub const SECURITY_SYSTEM: &str = "You are a security expert. Return JSON only.";
pub const QUALITY_SYSTEM: &str = "You are a quality expert. Return scores as integers (0-100). Return JSON only.";
pub const PERFORMANCE_SYSTEM: &str =
    "You are a performance expert. Return scores as integers (0-100). Return JSON only.";
pub const SCORECARD_SYSTEM: &str =
    "You are a code evaluation expert. Return JSON only: [{\"answer\": \"string\", \"confidence\": number}].";
pub const SCREENING_SYSTEM: &str = "You are a code analysis expert. Output JSON only: [\"language\", ...]. \
    Identify languages in the provided files based on file extensions and content. \
    Confirm every detected language unless the file contents clearly contradict it. \
    Do not include explanations or non-language terms.";

/// Read-only context shared by every analysis task in a run.
///
/// Built once after chunking, before dispatch; tasks hold it behind an
/// `Arc` and never mutate it.
#[derive(Debug)]
pub struct ReviewContext {
    /// Model-ready code payloads, one per chunk bin.
    pub payloads: Vec<String>,
    /// Static-analysis excerpt, issue list first so trailing fields are
    /// what truncation drops.
    pub report_excerpt: String,
    pub spec_excerpt: String,
    pub issue_count: usize,
    /// Every file seen in the submission, relative paths.
    pub file_list: Vec<String>,
}

impl ReviewContext {
    pub fn build(
        chunks: &[Chunk],
        static_report: &StaticReport,
        specification: &str,
        file_list: Vec<String>,
        config: &Config,
    ) -> Self {
        Self {
            payloads: ChunkSplitter::payloads(chunks),
            report_excerpt: Self::report_excerpt(static_report, config.report_excerpt_chars),
            spec_excerpt: truncate_chars(specification, config.spec_excerpt_chars),
            issue_count: static_report.issue_count,
            file_list,
        }
    }

    /// Serialize the report with the issue list leading, then truncate to
    /// the configured budget. A report that keeps its findings outside
    /// the `issues` key is excerpted whole instead, so unfamiliar tool
    /// formats still reach the model.
    fn report_excerpt(report: &StaticReport, budget: usize) -> String {
        let has_foreign_fields = report
            .raw
            .as_object()
            .is_some_and(|obj| obj.keys().any(|k| k != "total" && k != "issues"));

        let rendered = if report.issues.is_empty() && has_foreign_fields {
            serde_json::to_string_pretty(&report.raw).unwrap_or_default()
        } else {
            let ordered = json!({
                "total": report.issue_count,
                "issues": report.issues,
            });
            serde_json::to_string_pretty(&ordered).unwrap_or_default()
        };
        truncate_chars(&rendered, budget)
    }

    /// Code payloads joined up to `budget` bytes, with a marker noting
    /// how many payloads were cut.
    pub fn code_excerpt(&self, budget: usize) -> String {
        let mut output = String::new();
        let mut included = 0;

        for payload in &self.payloads {
            if !output.is_empty() && output.len() + payload.len() + 1 > budget {
                break;
            }
            if !output.is_empty() {
                output.push('\n');
            }
            if output.len() + payload.len() > budget {
                // First payload alone can exceed the budget; cut inside it
                // rather than sending no code at all.
                output.push_str(&truncate_chars(payload, budget.saturating_sub(output.len())));
                included += 1;
                break;
            }
            output.push_str(payload);
            included += 1;
        }

        let remaining = self.payloads.len().saturating_sub(included);
        if remaining > 0 {
            output.push_str(&format!("\n... and {remaining} more payloads"));
        }

        output
    }

    pub fn security_prompt(&self, config: &Config) -> String {
        format!(
            "Analyze this code for security issues.\n\
             Static analysis findings:\n{}\n\
             Code:\n{}\n\
             Return JSON only: [] or [{{\"issue\": \"string\", \"type\": \"string\", \
             \"severity\": \"string\", \"confidence\": number, \"file\": \"string\", \
             \"recommendation\": \"string\"}}].",
            self.report_excerpt,
            self.code_excerpt(config.max_chunk_chars),
        )
    }

    pub fn quality_prompt(&self, config: &Config) -> String {
        format!(
            "Assess the quality of this code.\n\
             Static analysis findings:\n{}\n\
             Code:\n{}\n\
             Return JSON only: {{\"maintainability_score\": number, \"code_smells\": number, \
             \"doc_coverage\": number}}.",
            self.report_excerpt,
            self.code_excerpt(config.max_chunk_chars),
        )
    }

    pub fn performance_prompt(&self, config: &Config) -> String {
        format!(
            "Evaluate the performance characteristics of this code.\n\
             Static analysis findings:\n{}\n\
             Code:\n{}\n\
             Return JSON only: {{\"rating\": number, \"bottlenecks\": [], \
             \"optimization_suggestions\": []}}.",
            self.report_excerpt,
            self.code_excerpt(config.max_chunk_chars),
        )
    }

    pub fn scorecard_prompt(&self, item: &ScorecardItem, config: &Config) -> String {
        format!(
            "Evaluate the code submission based on the following:\n\
             - Static analysis findings: {}\n\
             - Code samples:\n{}\n\
             - Specification: {}\n\
             - Question ({}, weight {}): {}\n\
             Provide a concise answer (up to {} characters) addressing the question. \
             Use the findings, code, and specification to justify your response.\n\
             Return JSON only: [{{\"answer\": \"string\", \"confidence\": 1-5}}]. \
             Do not include prose, explanations, markdown, or code blocks.",
            self.report_excerpt,
            self.code_excerpt(config.max_chunk_chars),
            self.spec_excerpt,
            item.category,
            item.weight,
            item.question,
            config.answer_max_chars,
        )
    }

    pub fn screening_prompt(&self, detected: &[String]) -> String {
        let files = serde_json::to_string(&self.file_list).unwrap_or_default();
        let detected = serde_json::to_string(detected).unwrap_or_default();
        format!(
            "Files: {files}.\nDetected: {detected}.\n\
             Return a JSON array of confirmed languages (e.g., [\"Python\", \"TypeScript\"])."
        )
    }
}

/// Cut on a char boundary at or below `budget` bytes.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }

    let mut end = budget;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ab\u{1F980}cd";
        // Byte 3 falls inside the 4-byte crab.
        assert_eq!(truncate_chars(text, 3), "ab");
        assert_eq!(truncate_chars(text, 6), "ab\u{1F980}");
        assert_eq!(truncate_chars(text, 100), text);
    }

    #[test]
    fn code_excerpt_reports_cut_payloads() {
        let ctx = ReviewContext {
            payloads: vec!["a".repeat(50), "b".repeat(50), "c".repeat(50)],
            report_excerpt: String::new(),
            spec_excerpt: String::new(),
            issue_count: 0,
            file_list: Vec::new(),
        };

        let excerpt = ctx.code_excerpt(80);
        assert!(excerpt.contains("... and 2 more payloads"));
        assert!(excerpt.starts_with(&"a".repeat(50)));
    }

    #[test]
    fn report_excerpt_keeps_foreign_formats_whole() {
        let report = StaticReport {
            issue_count: 0,
            issues: Vec::new(),
            raw: serde_json::json!({"hotspots": [{"rule": "S5146"}]}),
        };

        let excerpt = ReviewContext::report_excerpt(&report, 500);
        assert!(excerpt.contains("hotspots"));

        let normalized = StaticReport {
            issue_count: 2,
            issues: vec![serde_json::json!({"rule": "S100"})],
            raw: serde_json::json!({"total": 2, "issues": [{"rule": "S100"}], "extra": true}),
        };

        let excerpt = ReviewContext::report_excerpt(&normalized, 500);
        assert!(excerpt.starts_with("{\n  \"total\": 2"));
        assert!(!excerpt.contains("extra"));
    }

    #[test]
    fn code_excerpt_includes_all_when_budget_allows() {
        let ctx = ReviewContext {
            payloads: vec!["one".into(), "two".into()],
            report_excerpt: String::new(),
            spec_excerpt: String::new(),
            issue_count: 0,
            file_list: Vec::new(),
        };

        let excerpt = ctx.code_excerpt(100);
        assert_eq!(excerpt, "one\ntwo");
    }
}
