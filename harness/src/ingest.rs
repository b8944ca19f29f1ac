//! Conversion of a Django verbose test log into the unit-test result document.
//!
//! The test runner is invoked elsewhere; this module only reads its combined
//! stdout/stderr. Three strategies are tried in order: the verbose result
//! line pattern, a plain line scan for the mapped method names, and finally
//! the runner's exit code.

use regex::Regex;
use report_model::{Manifest, ResultMap, ResultRecord, TestStatus};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

/// Runner output kept on each record, in characters.
const OUTPUT_SNIPPET_LEN: usize = 200;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("No tests detected in the log and the test run exited with code {exit_code}")]
    NoTestsDetected { exit_code: i32 },
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Test method name to manifest id.
pub type MethodMap = BTreeMap<String, String>;

/// Manifest entries that name the unit-test method proving them.
pub fn method_map(manifest: &Manifest) -> MethodMap {
    manifest
        .iter()
        .filter_map(|entry| {
            entry
                .test_method
                .as_ref()
                .map(|method| (method.clone(), entry.id.clone()))
        })
        .collect()
}

fn result_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:\w+\.)?(test_\w+)\s+\([^)]+\)\s+\.\.\.\s+(ok|fail|error|skipped|skip)\b")
            .expect("static pattern")
    })
}

fn snippet(text: &str) -> String {
    text.chars().take(OUTPUT_SNIPPET_LEN).collect()
}

fn record(status: TestStatus, method: &str, output: &str) -> ResultRecord {
    let output = snippet(output);
    ResultRecord::new(status)
        .with_extra("test_method", method.into())
        .with_extra("output", output.clone().into())
        .with_message(output)
}

/// Whether `method` occurs in `line` as a whole identifier.
fn mentions(line: &str, method: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    line.match_indices(method).any(|(start, _)| {
        let before = line[..start].chars().next_back();
        let after = line[start + method.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

fn from_result_lines(log: &str, methods: &MethodMap) -> ResultMap {
    let mut results = ResultMap::new();
    for caps in result_line().captures_iter(log) {
        let method = &caps[1];
        if let Some(id) = methods.get(method) {
            let status = TestStatus::normalize(&caps[2]);
            results.insert(id.clone(), record(status, method, &caps[0]));
        }
    }
    results
}

fn from_line_scan(log: &str, methods: &MethodMap) -> ResultMap {
    let mut results = ResultMap::new();
    for line in log.lines() {
        let lower = line.to_lowercase();
        for (method, id) in methods {
            if results.contains_key(id) || !mentions(&lower, &method.to_lowercase()) {
                continue;
            }
            let status = if lower.contains("fail") {
                TestStatus::Failed
            } else if lower.contains("error") {
                TestStatus::Error
            } else if lower.contains("skip") {
                TestStatus::Skipped
            } else {
                TestStatus::Passed
            };
            results.insert(id.clone(), record(status, method, line.trim()));
        }
    }
    results
}

/// Build the unit-test result mapping from a runner log.
///
/// Only methods present in `methods` are reported. When neither the result
/// line pattern nor the line scan finds anything, a zero exit code marks
/// every mapped test passed; any other exit code is an error.
pub fn parse_unittest_log(log: &str, methods: &MethodMap, exit_code: i32) -> IngestResult<ResultMap> {
    let results = from_result_lines(log, methods);
    if !results.is_empty() {
        info!("Detected {} tests from verbose result lines", results.len());
        return Ok(results);
    }

    warn!("No verbose result lines matched; scanning lines for test names");
    let results = from_line_scan(log, methods);
    if !results.is_empty() {
        info!("Detected {} tests by line scan", results.len());
        return Ok(results);
    }

    if exit_code != 0 {
        return Err(IngestError::NoTestsDetected { exit_code });
    }

    warn!(
        "No tests detected in the log; exit code 0 marks {} tests passed",
        methods.len()
    );
    let note = "Detected via exit code 0";
    Ok(methods
        .iter()
        .map(|(method, id)| {
            let record = ResultRecord::new(TestStatus::Passed)
                .with_extra("test_method", method.as_str().into())
                .with_extra("note", note.into())
                .with_message(note);
            (id.clone(), record)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_model::{Category, TestManifestEntry};

    fn methods() -> MethodMap {
        [
            ("test_01_index_get", "TC001"),
            ("test_02_index_post_valid", "TC002"),
            ("test_03_index_post_invalid", "TC003"),
            ("test_create_priority_task", "TP003"),
        ]
        .into_iter()
        .map(|(m, id)| (m.to_string(), id.to_string()))
        .collect()
    }

    const VERBOSE_LOG: &str = "\
Creating test database for alias 'default'...
test_01_index_get (tasks.tests.TaskViewTests.test_01_index_get) ... ok
test_02_index_post_valid (tasks.tests.TaskViewTests.test_02_index_post_valid) ... FAIL
test_03_index_post_invalid (tasks.tests.TaskViewTests) ... ERROR
test_create_priority_task (tasks.test_priority.PriorityTests) ... skipped 'not ready'
test_unmapped (tasks.tests.Other) ... ok

Ran 5 tests in 0.031s
";

    #[test]
    fn test_verbose_lines() {
        let results = parse_unittest_log(VERBOSE_LOG, &methods(), 1).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results["TC001"].status, TestStatus::Passed);
        assert_eq!(results["TC002"].status, TestStatus::Failed);
        assert_eq!(results["TC003"].status, TestStatus::Error);
        assert_eq!(results["TP003"].status, TestStatus::Skipped);
        assert_eq!(results["TC001"].extra["test_method"], "test_01_index_get");
        assert!(results["TC001"].message.as_deref().unwrap().ends_with("... ok"));
    }

    #[test]
    fn test_output_snippet_is_capped() {
        let long_path = "a".repeat(300);
        let log = format!("test_01_index_get ({}) ... ok", long_path);
        let results = parse_unittest_log(&log, &methods(), 0).unwrap();
        assert_eq!(
            results["TC001"].message.as_deref().map(|m| m.chars().count()),
            Some(OUTPUT_SNIPPET_LEN)
        );
    }

    #[test]
    fn test_line_scan_fallback() {
        let log = "\
running test_01_index_get: pass
test_02_index_post_valid FAILED
test_03_index_post_invalid raised an error
";
        let results = parse_unittest_log(log, &methods(), 1).unwrap();
        assert_eq!(results["TC001"].status, TestStatus::Passed);
        assert_eq!(results["TC002"].status, TestStatus::Failed);
        assert_eq!(results["TC003"].status, TestStatus::Error);
        assert!(!results.contains_key("TP003"));
    }

    #[test]
    fn test_line_scan_matches_whole_names() {
        let mut methods = MethodMap::new();
        methods.insert("test_1".to_string(), "TC001".to_string());
        let results = from_line_scan("test_10 FAILED", &methods);
        assert!(results.is_empty());
    }

    #[test]
    fn test_exit_code_fallback() {
        let results = parse_unittest_log("OK", &methods(), 0).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.values().all(|r| r.status == TestStatus::Passed));
        assert_eq!(results["TC002"].extra["note"], "Detected via exit code 0");

        assert_eq!(
            parse_unittest_log("Segmentation fault", &methods(), 139),
            Err(IngestError::NoTestsDetected { exit_code: 139 })
        );
    }

    #[test]
    fn test_method_map_from_manifest() {
        let manifest = Manifest::new()
            .with_entry(
                TestManifestEntry::new("TC001", Category::UnitTest)
                    .with_test_method("test_01_index_get"),
            )
            .with_entry(TestManifestEntry::new("TC022", Category::Manual));

        let map = method_map(&manifest);
        assert_eq!(map.len(), 1);
        assert_eq!(map["test_01_index_get"], "TC001");
    }
}
