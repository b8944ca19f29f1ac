//! File-backed result sources.

use crate::decode::{parse_with_fallback, TextDecoding};
use crate::source::{LoadOutcome, ReportError, ResultSource};
use crate::types::{Category, ResultMap, ResultRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Layout of a result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// `{id: record}`
    Flat,
    /// `{"tests": {id: record}, "summary": {...}}`. Documents without a
    /// `tests` table are read as flat.
    Wrapped,
}

/// Result source reading one JSON document from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    category: Category,
    path: PathBuf,
    shape: SourceShape,
}

impl JsonFileSource {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        path: impl Into<PathBuf>,
        shape: SourceShape,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            path: path.into(),
            shape,
        }
    }

    pub fn unit_test(path: impl Into<PathBuf>) -> Self {
        Self::new("unit-test", Category::UnitTest, path, SourceShape::Flat)
    }

    pub fn browser_e2e(path: impl Into<PathBuf>) -> Self {
        Self::new("browser-e2e", Category::BrowserE2e, path, SourceShape::Wrapped)
    }

    pub fn accessibility(path: impl Into<PathBuf>) -> Self {
        Self::new(
            "accessibility",
            Category::Accessibility,
            path,
            SourceShape::Flat,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and normalize the document.
    pub fn read(&self) -> LoadOutcome<ResultMap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let condition = ReportError::ResultSourceUnavailable {
                    source_name: self.name.clone(),
                    path: self.path.clone(),
                };
                warn!("{}", condition);
                return LoadOutcome::degraded(ResultMap::new(), condition);
            }
            Err(e) => return self.corrupt(e.to_string()),
        };

        match parse_with_fallback(
            &bytes,
            &TextDecoding::DEFAULT_ORDER,
            |text| serde_json::from_str::<Value>(text),
        ) {
            Ok((document, decoding)) => {
                if decoding != TextDecoding::Utf8 {
                    info!("{} decoded as {}", self.path.display(), decoding);
                }
                if self.shape == SourceShape::Wrapped {
                    log_summary(&self.name, &document);
                }
                let results = parse_results(&document, self.shape);
                info!(
                    "Loaded {} {} results from {}",
                    results.len(),
                    self.name,
                    self.path.display()
                );
                LoadOutcome::ok(results)
            }
            Err(failure) => self.corrupt(failure.to_string()),
        }
    }

    fn corrupt(&self, reason: String) -> LoadOutcome<ResultMap> {
        let condition = ReportError::ResultSourceCorrupt {
            source_name: self.name.clone(),
            path: self.path.clone(),
            reason,
        };
        warn!("{}", condition);
        LoadOutcome::degraded(ResultMap::new(), condition)
    }
}

#[async_trait]
impl ResultSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category.clone()
    }

    async fn load(&self) -> LoadOutcome<ResultMap> {
        self.read()
    }
}

/// Normalize a parsed result document. Entries that are not JSON objects
/// are skipped.
pub fn parse_results(document: &Value, shape: SourceShape) -> ResultMap {
    let table = match (shape, document.get("tests")) {
        (SourceShape::Wrapped, Some(tests)) => tests.as_object(),
        _ => document.as_object(),
    };

    let Some(table) = table else {
        warn!("Result document is not a mapping of test ids");
        return ResultMap::new();
    };

    table
        .iter()
        .filter_map(|(id, raw)| match ResultRecord::from_value(raw) {
            Some(record) => Some((id.clone(), record)),
            None => {
                warn!("Skipping result {}: not an object", id);
                None
            }
        })
        .collect()
}

/// Write `results` as a flat, pretty-printed result document.
pub fn write_results(path: impl AsRef<Path>, results: &ResultMap) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(results)?;
    std::fs::write(path, body)
}

fn log_summary(name: &str, document: &Value) {
    let Some(summary) = document.get("summary") else {
        return;
    };
    let count = |key: &str| summary.get(key).and_then(Value::as_u64).unwrap_or(0);
    let at = summary
        .get("timestamp")
        .and_then(Value::as_str)
        .map(|ts| format!(" at {}", ts))
        .unwrap_or_default();
    info!(
        "{} summary: {} total, {} passed, {} failed{}",
        name,
        count("total"),
        count("passed"),
        count("failed"),
        at
    );
}
