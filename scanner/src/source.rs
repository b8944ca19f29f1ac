use crate::scanner::{AccessibilityScanner, ScanTarget};
use async_trait::async_trait;
use report_model::{Category, JsonFileSource, LoadOutcome, ResultCache, ResultMap, ResultSource};
use tracing::{info, warn};

/// Cache key under which scan results are stored.
pub const CACHE_KEY: &str = "accessibility";

/// Accessibility result source with a live-scan fallback.
///
/// Resolution order: the accessibility result document, then a fresh cache
/// entry, then a live scan of the targets (whose results are cached). With
/// none of these available the source reports itself unavailable.
pub struct ScanningSource {
    artifact: JsonFileSource,
    cache: Option<ResultCache>,
    scanner: Option<AccessibilityScanner>,
    targets: Vec<ScanTarget>,
}

impl ScanningSource {
    pub fn new(artifact: JsonFileSource) -> Self {
        Self {
            artifact,
            cache: None,
            scanner: None,
            targets: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_scanner(mut self, scanner: AccessibilityScanner, targets: Vec<ScanTarget>) -> Self {
        self.scanner = Some(scanner);
        self.targets = targets;
        self
    }
}

#[async_trait]
impl ResultSource for ScanningSource {
    fn name(&self) -> &str {
        self.artifact.name()
    }

    fn category(&self) -> Category {
        Category::Accessibility
    }

    async fn load(&self) -> LoadOutcome<ResultMap> {
        if self.artifact.exists() {
            return self.artifact.read();
        }

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(CACHE_KEY)) {
            info!(
                "Using cached accessibility results from {}",
                cached.written_at.to_rfc3339()
            );
            return LoadOutcome::ok(cached.results);
        }

        match &self.scanner {
            Some(scanner) if !self.targets.is_empty() => {
                info!(
                    "No accessibility results at {}; scanning {} pages",
                    self.artifact.path().display(),
                    self.targets.len()
                );
                let outcome = scanner.scan(&self.targets).await;
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(CACHE_KEY, &outcome.value) {
                        warn!("Failed to cache accessibility results: {}", e);
                    }
                }
                outcome
            }
            _ => self.artifact.read(),
        }
    }
}
