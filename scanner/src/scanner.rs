use crate::checks::check_html;
use crate::fetch::PageFetcher;
use crate::{ScanError, ScanResult};
use report_model::{Category, LoadOutcome, Manifest, ResultMap, ResultRecord, TestStatus};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One page to check, identified by the manifest id it answers for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub id: String,
    pub url: String,
}

impl ScanTarget {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Accessibility result for one page, in the result document layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityRecord {
    pub url: String,
    pub status: TestStatus,
    pub score: u32,
    pub errors_count: usize,
    pub warnings_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AccessibilityRecord {
    fn unreachable(url: &str, err: &ScanError) -> Self {
        Self {
            url: url.to_string(),
            status: TestStatus::Failed,
            score: 0,
            errors_count: 1,
            warnings_count: 0,
            errors: vec![err.to_string()],
            warnings: Vec::new(),
            message: Some(err.to_condition().to_string()),
        }
    }

    pub fn to_record(&self) -> ResultRecord {
        let record = ResultRecord::new(self.status)
            .with_extra("url", self.url.clone().into())
            .with_extra("score", self.score.into())
            .with_extra("errors_count", self.errors_count.into())
            .with_extra("warnings_count", self.warnings_count.into())
            .with_extra("errors", self.errors.clone().into())
            .with_extra("warnings", self.warnings.clone().into());
        match &self.message {
            Some(message) => record.with_message(message.clone()),
            None => record,
        }
    }
}

pub struct AccessibilityScanner {
    fetcher: Box<dyn PageFetcher>,
    base_url: String,
}

impl AccessibilityScanner {
    pub fn new(fetcher: Box<dyn PageFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Accessibility entries of the manifest that name a target URL, in id
    /// order. Entries without a URL have nothing to scan.
    pub fn targets_from_manifest(manifest: &Manifest) -> Vec<ScanTarget> {
        manifest
            .in_category(&Category::Accessibility)
            .filter_map(|entry| {
                entry
                    .url
                    .as_ref()
                    .map(|url| ScanTarget::new(entry.id.clone(), url.clone()))
            })
            .collect()
    }

    /// Join a relative target onto the base URL; absolute targets pass through.
    pub fn resolve_url(&self, target: &str) -> ScanResult<String> {
        let invalid = |reason: String| ScanError::InvalidUrl {
            url: target.to_string(),
            reason,
        };
        let base = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        base.join(target)
            .map(String::from)
            .map_err(|e| invalid(e.to_string()))
    }

    pub async fn scan_target(&self, target: &ScanTarget) -> (AccessibilityRecord, Option<ScanError>) {
        let url = match self.resolve_url(&target.url) {
            Ok(url) => url,
            Err(e) => return (AccessibilityRecord::unreachable(&target.url, &e), Some(e)),
        };

        match self.fetcher.fetch(&url).await {
            Ok(html) => {
                let findings = check_html(&html);
                let record = AccessibilityRecord {
                    url,
                    status: if findings.passed() {
                        TestStatus::Passed
                    } else {
                        TestStatus::Failed
                    },
                    score: findings.score(),
                    errors_count: findings.errors.len(),
                    warnings_count: findings.warnings.len(),
                    errors: findings.errors,
                    warnings: findings.warnings,
                    message: None,
                };
                (record, None)
            }
            Err(e) => (AccessibilityRecord::unreachable(&url, &e), Some(e)),
        }
    }

    /// Check every target in order. Targets that cannot be fetched become
    /// failed results and add a condition to the outcome.
    pub async fn scan(&self, targets: &[ScanTarget]) -> LoadOutcome<ResultMap> {
        let mut results = ResultMap::new();
        let mut conditions = Vec::new();
        info!(
            "Scanning {} pages under {} (timeout {}s)",
            targets.len(),
            self.base_url,
            self.fetcher.timeout().as_secs_f64()
        );

        for target in targets {
            let (record, error) = self.scan_target(target).await;
            match &error {
                Some(e) => warn!("Accessibility check {} failed: {}", target.id, e),
                None => info!(
                    "Accessibility check {}: {} (score {}, {} errors, {} warnings)",
                    target.id,
                    record.status,
                    record.score,
                    record.errors_count,
                    record.warnings_count
                ),
            }
            if let Some(e) = error {
                conditions.push(e.to_condition());
            }
            results.insert(target.id.clone(), record.to_record());
        }

        LoadOutcome {
            value: results,
            conditions,
        }
    }
}
