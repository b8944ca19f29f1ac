use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Test category declared in the manifest.
///
/// The category decides which result source is consulted for a test. Raw
/// manifest values are matched case-insensitively against both the canonical
/// names and the names used by older manifests (`auto-unittest`,
/// `auto-selenium`, `manuel`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    UnitTest,
    BrowserE2e,
    Accessibility,
    Manual,
    /// Anything outside the closed set. An empty string means the manifest
    /// row had no category at all.
    Unrecognized(String),
}

impl Category {
    /// Categories that always get a section in the statistics block.
    pub const KNOWN: [Category; 4] = [
        Category::UnitTest,
        Category::BrowserE2e,
        Category::Accessibility,
        Category::Manual,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unit-test" | "unit_test" | "unittest" | "auto-unittest" => Self::UnitTest,
            "browser-e2e" | "browser_e2e" | "e2e" | "selenium" | "auto-selenium" => {
                Self::BrowserE2e
            }
            "accessibility" | "a11y" | "auto-accessibility" => Self::Accessibility,
            "manual" | "manuel" => Self::Manual,
            _ => Self::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::UnitTest => "unit-test",
            Self::BrowserE2e => "browser-e2e",
            Self::Accessibility => "accessibility",
            Self::Manual => "manual",
            Self::Unrecognized(raw) if raw.is_empty() => "<missing>",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Whether results for this category come from a result source.
    pub fn is_automated(&self) -> bool {
        matches!(
            self,
            Self::UnitTest | Self::BrowserE2e | Self::Accessibility
        )
    }

    /// Human-readable section title.
    pub fn label(&self) -> String {
        match self {
            Self::UnitTest => "Unit tests".to_string(),
            Self::BrowserE2e => "Browser E2E tests".to_string(),
            Self::Accessibility => "Accessibility tests".to_string(),
            Self::Manual => "Manual tests".to_string(),
            Self::Unrecognized(_) => format!("Unrecognized ({})", self.as_str()),
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result status reported by a result source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
    #[default]
    Unknown,
}

impl TestStatus {
    /// Map a raw runner status onto the canonical vocabulary.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ok" | "passed" | "pass" => Self::Passed,
            "fail" | "failed" => Self::Failed,
            "error" => Self::Error,
            "skip" | "skipped" => Self::Skipped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for TestStatus {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a result source, keyed by test id in a [`ResultMap`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Every other field of the raw record (`score`, `errors`, `test_method`...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultRecord {
    pub fn new(status: TestStatus) -> Self {
        Self {
            status,
            message: None,
            extra: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Build a record from one raw JSON value. Returns `None` for values
    /// that are not objects.
    ///
    /// The diagnostic text is taken from `message`, then `output`, then
    /// `note`; a missing or non-string `status` normalizes to `Unknown`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut extra = object.clone();

        let status = extra
            .remove("status")
            .and_then(|s| s.as_str().map(TestStatus::normalize))
            .unwrap_or_default();

        let message = extra
            .remove("message")
            .and_then(|m| m.as_str().map(str::to_string))
            .or_else(|| {
                ["output", "note"]
                    .iter()
                    .find_map(|key| extra.get(*key).and_then(Value::as_str))
                    .map(str::to_string)
            });

        Some(Self {
            status,
            message,
            extra,
        })
    }
}

/// Results of one source, keyed by test id.
pub type ResultMap = BTreeMap<String, ResultRecord>;

/// Final verdict for one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Passed,
    Failed,
    NotFound,
    ManualRequired,
    UnknownCategory,
}

impl EffectiveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::NotFound => "Not found",
            Self::ManualRequired => "Manual test needed",
            Self::UnknownCategory => "Unknown category",
        }
    }

    pub fn icon(&self) -> Icon {
        match self {
            Self::Passed => Icon::Check,
            Self::Failed => Icon::Cross,
            Self::NotFound | Self::UnknownCategory => Icon::Question,
            Self::ManualRequired => Icon::Person,
        }
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status marker shown in front of each report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Check,
    Cross,
    Question,
    Person,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "✅",
            Self::Cross => "❌",
            Self::Question => "❓",
            Self::Person => "👤",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_normalization_table() {
        for raw in ["ok", "OK", "passed", "Pass"] {
            assert_eq!(TestStatus::normalize(raw), TestStatus::Passed, "{raw}");
        }
        for raw in ["fail", "FAIL", "failed"] {
            assert_eq!(TestStatus::normalize(raw), TestStatus::Failed, "{raw}");
        }
        assert_eq!(TestStatus::normalize("ERROR"), TestStatus::Error);
        assert_eq!(TestStatus::normalize("skip"), TestStatus::Skipped);
        assert_eq!(TestStatus::normalize("Skipped"), TestStatus::Skipped);
    }

    #[test]
    fn test_unlisted_statuses_are_unknown() {
        for raw in ["manual", "", "xfail", "timeout", "passed!"] {
            assert_eq!(TestStatus::normalize(raw), TestStatus::Unknown, "{raw}");
        }
    }

    #[test]
    fn test_category_aliases() {
        assert_eq!(Category::parse("auto-unittest"), Category::UnitTest);
        assert_eq!(Category::parse("Auto-Selenium"), Category::BrowserE2e);
        assert_eq!(Category::parse("a11y"), Category::Accessibility);
        assert_eq!(Category::parse("manuel"), Category::Manual);
        assert_eq!(
            Category::parse("load-test"),
            Category::Unrecognized("load-test".to_string())
        );
        assert!(!Category::parse("load-test").is_automated());
        assert!(Category::parse("browser-e2e").is_automated());
    }

    #[test]
    fn test_category_serializes_canonical_name() {
        let json = serde_json::to_string(&Category::parse("auto-selenium")).unwrap();
        assert_eq!(json, "\"browser-e2e\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::BrowserE2e);
    }

    #[test]
    fn test_record_from_value() {
        let record = ResultRecord::from_value(&json!({
            "status": "FAIL",
            "output": "test_01 ... FAIL",
            "test_method": "test_01"
        }))
        .unwrap();

        assert_eq!(record.status, TestStatus::Failed);
        assert_eq!(record.message.as_deref(), Some("test_01 ... FAIL"));
        assert_eq!(record.extra["test_method"], "test_01");
        assert!(!record.extra.contains_key("status"));
    }

    #[test]
    fn test_record_without_status_is_unknown() {
        let record = ResultRecord::from_value(&json!({ "score": 40 })).unwrap();
        assert_eq!(record.status, TestStatus::Unknown);
        assert!(record.message.is_none());
        assert!(ResultRecord::from_value(&json!("passed")).is_none());
    }

    #[test]
    fn test_effective_status_icons() {
        assert_eq!(EffectiveStatus::Passed.icon(), Icon::Check);
        assert_eq!(EffectiveStatus::Failed.icon(), Icon::Cross);
        assert_eq!(EffectiveStatus::NotFound.icon(), Icon::Question);
        assert_eq!(EffectiveStatus::ManualRequired.icon(), Icon::Person);
        assert_eq!(EffectiveStatus::UnknownCategory.icon(), Icon::Question);
    }
}
