//! Delivery certificate: the signed-off summary handed over with a release.
//!
//! The certificate is derived from a [`Report`] plus build metadata. Its JSON
//! form is the input of the external document renderer; the text form is
//! meant for CI logs.

use crate::aggregate::Report;
use chrono::{DateTime, Utc};
use git2::Repository;
use report_model::{Category, CertificateConfig};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const SHORT_COMMIT_LEN: usize = 8;
const UNKNOWN: &str = "unknown";

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("No HEAD commit found")]
    NoHeadCommit,
}

pub type CertificateResult<T> = Result<T, CertificateError>;

/// Branch and commit the certificate is issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub branch: String,
    pub commit: String,
}

fn short_commit(sha: &str) -> String {
    sha.chars().take(SHORT_COMMIT_LEN).collect()
}

impl BuildInfo {
    pub fn unknown() -> Self {
        Self {
            branch: UNKNOWN.to_string(),
            commit: UNKNOWN.to_string(),
        }
    }

    /// CI metadata from `GITHUB_SHA` and `GITHUB_REF_NAME`.
    pub fn from_env() -> Option<Self> {
        let sha = std::env::var("GITHUB_SHA").ok().filter(|s| !s.is_empty())?;
        let branch = std::env::var("GITHUB_REF_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "main".to_string());
        Some(Self {
            branch,
            commit: short_commit(&sha),
        })
    }

    /// HEAD of the repository containing `path`.
    pub fn from_repository(path: impl AsRef<Path>) -> CertificateResult<Self> {
        let repo = Repository::discover(path.as_ref())?;
        let head = repo.head()?;
        let oid = head.target().ok_or(CertificateError::NoHeadCommit)?;

        let branch = if head.is_branch() {
            head.shorthand().unwrap_or(UNKNOWN).to_string()
        } else {
            "HEAD".to_string()
        };

        Ok(Self {
            branch,
            commit: short_commit(&oid.to_string()),
        })
    }

    /// Environment first, then the local repository, then "unknown".
    pub fn detect(path: impl AsRef<Path>) -> Self {
        if let Some(info) = Self::from_env() {
            return info;
        }
        match Self::from_repository(path) {
            Ok(info) => info,
            Err(e) => {
                debug!("No git metadata available: {}", e);
                Self::unknown()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryOutcome {
    Success,
    Failure,
    Partial,
}

impl CategoryOutcome {
    fn from_counts(passed: usize, total: usize) -> Self {
        if passed == total {
            Self::Success
        } else if passed == 0 {
            Self::Failure
        } else {
            Self::Partial
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Partial => "PARTIAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalStatus {
    Success,
    PartialFailure,
    Unknown,
}

impl GlobalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::PartialFailure => "PARTIAL FAILURE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub label: String,
    pub status: CategoryOutcome,
    pub count: usize,
    pub passed: usize,
    pub info: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryCertificate {
    pub project_name: String,
    pub executor: String,
    pub generated_at: DateTime<Utc>,
    pub branch: String,
    pub commit: String,
    pub global_status: GlobalStatus,
    pub summary: Vec<CategorySummary>,
    pub manual_tests_required: Vec<String>,
}

impl DeliveryCertificate {
    pub fn from_report(report: &Report, config: &CertificateConfig, build: BuildInfo) -> Self {
        let summary: Vec<CategorySummary> = report
            .stats
            .per_category
            .iter()
            .filter(|(category, stats)| category.is_automated() && stats.total > 0)
            .map(|(category, stats)| CategorySummary {
                category: category.clone(),
                label: category.label(),
                status: CategoryOutcome::from_counts(stats.passed, stats.total),
                count: stats.total,
                passed: stats.passed,
                info: format!(
                    "{}/{} passed, {} failed, {} not found",
                    stats.passed, stats.total, stats.failed, stats.not_found
                ),
            })
            .collect();

        let global_status = if summary.is_empty() {
            GlobalStatus::Unknown
        } else if summary.iter().any(|s| s.status != CategoryOutcome::Success) {
            GlobalStatus::PartialFailure
        } else {
            GlobalStatus::Success
        };

        let manual_tests_required = report
            .rows_in(&Category::Manual)
            .map(|row| format!("{}: {}", row.id, row.description))
            .collect();

        Self {
            project_name: config.project_name.clone(),
            executor: config.executor.clone(),
            generated_at: report.generated_at,
            branch: build.branch,
            commit: build.commit,
            global_status,
            summary,
            manual_tests_required,
        }
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeliveryCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);

        writeln!(f, "{}", rule)?;
        writeln!(f, "TEST DELIVERY CERTIFICATE")?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "{:16} {}",
            "Generated:",
            self.generated_at.format("%d/%m/%Y %H:%M:%S")
        )?;
        writeln!(f, "{:16} {}", "Global status:", self.global_status.label())?;
        writeln!(f, "{:16} {}", "Project:", self.project_name)?;
        writeln!(f, "{:16} {}", "Branch:", self.branch)?;
        writeln!(f, "{:16} {}", "Commit:", self.commit)?;
        writeln!(f, "{:16} {}", "Executor:", self.executor)?;
        writeln!(f)?;

        writeln!(f, "{:22} | {:8} | {:5} | Details", "Test type", "Status", "Count")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for s in &self.summary {
            writeln!(
                f,
                "{:22} | {:8} | {:5} | {}",
                s.label,
                s.status.label(),
                s.count,
                s.info
            )?;
        }

        if !self.manual_tests_required.is_empty() {
            writeln!(f)?;
            writeln!(f, "MANUAL TESTS REQUIRED:")?;
            for (i, test) in self.manual_tests_required.iter().enumerate() {
                writeln!(f, "{}. {}", i + 1, test)?;
            }
        }

        Ok(())
    }
}
