// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{ScorecardItem, SourceFile, StaticReport, Submission};
use crate::error::{Error, Result};

/// Directory names never worth descending into.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
];

/// Generated or lock files that carry no review signal even when their
/// extension says otherwise.
static IGNORED_FILES: LazyLock<GlobSet> = LazyLock::new(|| {
    let patterns = [
        "**/*.min.js",
        "**/*.min.css",
        "**/*.map",
        "**/package-lock.json",
        "**/yarn.lock",
        "**/Cargo.lock",
        "**/poetry.lock",
    ];

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
});

fn language_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "py" => "Python",
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "kt" => "Kotlin",
        "swift" => "Swift",
        "c" | "h" => "C",
        "cpp" | "cc" | "hpp" => "C++",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        _ => return None,
    })
}

fn is_hidden_or_ignored_dir(name: &str) -> bool {
    (name.starts_with('.') && name != ".") || IGNORED_DIRS.contains(&name)
}

/// Read every reviewable file under `dir`.
///
/// `file_list` inventories all surviving files; `sources` holds only
/// those with a recognized code extension. Files that fail to read are
/// skipped with a warning rather than aborting the run, as are files
/// that look binary.
pub fn load_submission(dir: &Path) -> Result<Submission> {
    if !dir.is_dir() {
        return Err(Error::SubmissionNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut sources: Vec<SourceFile> = Vec::new();
    let mut detected_languages: BTreeSet<String> = BTreeSet::new();
    let mut file_list: Vec<String> = Vec::new();

    let walker = WalkDir::new(dir).follow_links(false).into_iter();
    let entries = walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !is_hidden_or_ignored_dir(&e.file_name().to_string_lossy())
    });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if IGNORED_FILES.is_match(&relative) {
            continue;
        }

        file_list.push(relative.clone());

        let Some(language) = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(language_for_extension)
        else {
            continue;
        };

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(file = %relative, %error, "skipping unreadable file");
                continue;
            }
        };
        if bytes.contains(&0) {
            debug!(file = %relative, "skipping binary file");
            continue;
        }

        detected_languages.insert(language.to_string());
        sources.push(SourceFile::new(relative, String::from_utf8_lossy(&bytes)));
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    file_list.sort();

    debug!(
        files = file_list.len(),
        sources = sources.len(),
        languages = ?detected_languages,
        "submission loaded"
    );

    Ok(Submission {
        sources,
        detected_languages,
        file_list,
    })
}

/// Parse the static analysis report. The shape is tolerant: `issues`
/// may be absent (empty list) and `total` falls back to the issue
/// count.
pub fn load_static_report(path: &Path) -> Result<StaticReport> {
    let raw = fs::read_to_string(path).map_err(|source| Error::InvalidReport {
        message: format!("cannot read {}: {source}", path.display()),
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| Error::InvalidReport {
        message: format!("{} is not valid JSON: {source}", path.display()),
    })?;

    let issues: Vec<Value> = value
        .get("issues")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let issue_count = value
        .get("total")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(issues.len());

    Ok(StaticReport {
        issue_count,
        issues,
        raw: value,
    })
}

pub fn load_specification(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => {
            Error::MissingInput(format!("specification file {} not found", path.display()))
        }
        _ => Error::Io(source),
    })
}

/// Parse scorecard items from either a bare JSON array or an object
/// with an `items` field. Weights must be finite and non-negative.
pub fn load_scorecard(path: &Path) -> Result<Vec<ScorecardItem>> {
    let raw = fs::read_to_string(path).map_err(|source| Error::InvalidScorecard {
        message: format!("cannot read {}: {source}", path.display()),
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| Error::InvalidScorecard {
        message: format!("{} is not valid JSON: {source}", path.display()),
    })?;

    let items_value = if value.is_array() {
        value
    } else {
        value
            .get("items")
            .cloned()
            .ok_or_else(|| Error::InvalidScorecard {
                message: "expected a JSON array or an object with an `items` field".to_string(),
            })?
    };

    let items: Vec<ScorecardItem> =
        serde_json::from_value(items_value).map_err(|source| Error::InvalidScorecard {
            message: source.to_string(),
        })?;

    for item in &items {
        if item.question.trim().is_empty() {
            return Err(Error::InvalidScorecard {
                message: "scorecard item with an empty question".to_string(),
            });
        }
        if !item.weight.is_finite() || item.weight < 0.0 {
            return Err(Error::InvalidScorecard {
                message: format!(
                    "scorecard item {:?} has invalid weight {}",
                    item.question, item.weight
                ),
            });
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn sources_are_sorted_and_languages_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.py", "print('b')\n");
        write(tmp.path(), "a.py", "print('a')\n");
        write(tmp.path(), "web/app.ts", "export {};\n");

        let submission = load_submission(tmp.path()).unwrap();

        let paths: Vec<&str> = submission.sources.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "b.py", "web/app.ts"]);
        assert!(submission.detected_languages.contains("Python"));
        assert!(submission.detected_languages.contains("TypeScript"));
    }

    #[test]
    fn ignored_dirs_are_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.py", "x = 1\n");
        write(tmp.path(), "node_modules/lib/index.js", "module.exports = {}\n");
        write(tmp.path(), "__pycache__/main.pyc", "junk");

        let submission = load_submission(tmp.path()).unwrap();

        assert_eq!(submission.sources.len(), 1);
        assert_eq!(submission.file_list, vec!["main.py"]);
    }

    #[test]
    fn generated_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "app.js", "var x = 1;\n");
        write(tmp.path(), "app.min.js", "var x=1;\n");
        write(tmp.path(), "package-lock.json", "{}");

        let submission = load_submission(tmp.path()).unwrap();

        assert_eq!(submission.file_list, vec!["app.js"]);
    }

    #[test]
    fn unknown_extensions_appear_only_in_file_list() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "README.md", "# hello\n");
        write(tmp.path(), "main.go", "package main\n");

        let submission = load_submission(tmp.path()).unwrap();

        assert_eq!(submission.file_list, vec!["README.md", "main.go"]);
        assert_eq!(submission.sources.len(), 1);
        assert_eq!(submission.sources[0].path, "main.go");
    }

    #[test]
    fn binary_files_stay_out_of_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("blob.py");
        fs::write(&path, b"print\x00junk").unwrap();

        let submission = load_submission(tmp.path()).unwrap();

        assert!(submission.sources.is_empty());
        assert_eq!(submission.file_list, vec!["blob.py"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let error = load_submission(Path::new("/nonexistent/submission")).unwrap_err();
        assert!(matches!(error, Error::SubmissionNotFound { .. }));
    }

    #[test]
    fn report_total_field_wins_over_issue_count() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");
        fs::write(&path, r#"{"total": 7, "issues": [{"rule": "S100"}]}"#).unwrap();

        let report = load_static_report(&path).unwrap();

        assert_eq!(report.issue_count, 7);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn report_falls_back_to_issue_count() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");
        fs::write(&path, r#"{"issues": [{}, {}]}"#).unwrap();

        let report = load_static_report(&path).unwrap();

        assert_eq!(report.issue_count, 2);
    }

    #[test]
    fn malformed_report_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");
        fs::write(&path, "not json").unwrap();

        let error = load_static_report(&path).unwrap_err();
        assert!(matches!(error, Error::InvalidReport { .. }));
    }

    #[test]
    fn scorecard_accepts_bare_array_and_items_object() {
        let tmp = tempfile::tempdir().unwrap();

        let bare = tmp.path().join("bare.json");
        fs::write(&bare, r#"[{"question": "Is it tested?", "weight": 2.0}]"#).unwrap();
        assert_eq!(load_scorecard(&bare).unwrap().len(), 1);

        let wrapped = tmp.path().join("wrapped.json");
        fs::write(
            &wrapped,
            r#"{"items": [{"question": "Is it documented?", "weight": 1.0}]}"#,
        )
        .unwrap();
        assert_eq!(load_scorecard(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn negative_scorecard_weight_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scorecard.json");
        fs::write(&path, r#"[{"question": "Weighted?", "weight": -1.0}]"#).unwrap();

        let error = load_scorecard(&path).unwrap_err();
        assert!(matches!(error, Error::InvalidScorecard { .. }));
    }
}
