use crate::types::{Category, ResultMap, ResultRecord};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Recoverable problems met while gathering report inputs.
///
/// None of these abort a run: the component that raises one falls back to
/// the most conservative value (an empty manifest or result mapping, or a
/// failed result for a single test) and records the condition on the report.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportError {
    #[error("Manifest not found: {}", path.display())]
    ManifestUnavailable { path: PathBuf },

    #[error("Manifest {} is malformed: {reason}", path.display())]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("Result source '{source_name}' unavailable: {} not found", path.display())]
    ResultSourceUnavailable { source_name: String, path: PathBuf },

    #[error("Result source '{source_name}' is corrupt ({}): {reason}", path.display())]
    ResultSourceCorrupt {
        source_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Check of {url} timed out after {timeout_secs}s")]
    ExternalCheckTimeout { url: String, timeout_secs: u64 },

    #[error("Check of {url} failed: {reason}")]
    ExternalCheckFailed { url: String, reason: String },
}

impl ReportError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManifestUnavailable { .. } => "manifest_unavailable",
            Self::ManifestMalformed { .. } => "manifest_malformed",
            Self::ResultSourceUnavailable { .. } => "result_source_unavailable",
            Self::ResultSourceCorrupt { .. } => "result_source_corrupt",
            Self::ExternalCheckTimeout { .. } => "external_check_timeout",
            Self::ExternalCheckFailed { .. } => "external_check_failed",
        }
    }
}

/// A value produced by a loader together with the conditions raised while
/// producing it. A degraded outcome still carries a usable value.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome<T> {
    pub value: T,
    pub conditions: Vec<ReportError>,
}

impl<T> LoadOutcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            conditions: Vec::new(),
        }
    }

    pub fn degraded(value: T, condition: ReportError) -> Self {
        Self {
            value,
            conditions: vec![condition],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn into_parts(self) -> (T, Vec<ReportError>) {
        (self.value, self.conditions)
    }
}

/// Anything that can produce the results of one test category.
#[async_trait]
pub trait ResultSource: Send + Sync {
    fn name(&self) -> &str;

    /// Category whose manifest entries are looked up in this source.
    fn category(&self) -> Category;

    async fn load(&self) -> LoadOutcome<ResultMap>;
}

/// Loaded result mappings, keyed by the category they answer for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSources {
    by_category: BTreeMap<Category, ResultMap>,
}

impl ResultSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, results: ResultMap) -> Self {
        self.insert(category, results);
        self
    }

    /// Merge `results` into the mapping for `category`; later records win.
    pub fn insert(&mut self, category: Category, results: ResultMap) {
        self.by_category
            .entry(category)
            .or_default()
            .extend(results);
    }

    pub fn get(&self, category: &Category) -> Option<&ResultMap> {
        self.by_category.get(category)
    }

    pub fn lookup(&self, category: &Category, id: &str) -> Option<&ResultRecord> {
        self.get(category).and_then(|results| results.get(id))
    }
}

/// Ordered set of result sources, loaded one after another.
pub struct SourceRegistry {
    sources: Vec<Box<dyn ResultSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register(&mut self, source: Box<dyn ResultSource>) {
        self.sources.push(source);
    }

    pub fn list_sources(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn load_all(&self) -> LoadOutcome<ResultSources> {
        let mut loaded = ResultSources::new();
        let mut conditions = Vec::new();

        for source in &self.sources {
            let outcome = source.load().await;
            debug!(
                "Source {} produced {} results ({} conditions)",
                source.name(),
                outcome.value.len(),
                outcome.conditions.len()
            );
            loaded.insert(source.category(), outcome.value);
            conditions.extend(outcome.conditions);
        }

        LoadOutcome {
            value: loaded,
            conditions,
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
