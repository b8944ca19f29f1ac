//! Declarative test plan.
//!
//! The manifest lists every expected test with its category. It is read from
//! YAML, JSON or TOML, either as `{tests: {id: entry}}` or as a bare
//! `{id: entry}` mapping. Loading never fails: a missing or unparseable
//! document yields an empty manifest plus a recorded condition.

use crate::decode::{parse_with_fallback, TextDecoding};
use crate::source::{LoadOutcome, ReportError};
use crate::types::Category;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestManifestEntry {
    pub id: String,
    pub category: Category,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Unit-test method whose outcome proves this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_method: Option<String>,
}

impl TestManifestEntry {
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            description: String::new(),
            url: None,
            test_method: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_test_method(mut self, method: impl Into<String>) -> Self {
        self.test_method = Some(method.into());
        self
    }
}

/// Manifest entries keyed by id. Iteration is in lexicographic id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    entries: BTreeMap<String, TestManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; an existing entry with the same id is replaced.
    pub fn insert(&mut self, entry: TestManifestEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn with_entry(mut self, entry: TestManifestEntry) -> Self {
        self.insert(entry);
        self
    }

    pub fn get(&self, id: &str) -> Option<&TestManifestEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestManifestEntry> {
        self.entries.values()
    }

    pub fn in_category<'a>(
        &'a self,
        category: &'a Category,
    ) -> impl Iterator<Item = &'a TestManifestEntry> + 'a {
        self.iter().filter(move |entry| &entry.category == category)
    }
}

impl FromIterator<TestManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = TestManifestEntry>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
    Toml,
}

impl ManifestFormat {
    /// Pick the format from the file extension; anything unknown is read as
    /// YAML, which also accepts JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Load the manifest at `path`.
pub fn load_manifest(path: impl AsRef<Path>) -> LoadOutcome<Manifest> {
    let path = path.as_ref();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let condition = if e.kind() == std::io::ErrorKind::NotFound {
                ReportError::ManifestUnavailable {
                    path: path.to_path_buf(),
                }
            } else {
                ReportError::ManifestMalformed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            };
            warn!("{}", condition);
            return LoadOutcome::degraded(Manifest::new(), condition);
        }
    };

    let format = ManifestFormat::from_path(path);
    match parse_with_fallback(&bytes, &TextDecoding::DEFAULT_ORDER, |text| {
        format.parse(text)
    }) {
        Ok((document, decoding)) => match manifest_from_value(&document) {
            Ok(manifest) => {
                info!(
                    "Loaded {} tests from {} ({})",
                    manifest.len(),
                    path.display(),
                    decoding
                );
                LoadOutcome::ok(manifest)
            }
            Err(reason) => {
                let condition = ReportError::ManifestMalformed {
                    path: path.to_path_buf(),
                    reason,
                };
                warn!("{}", condition);
                LoadOutcome::degraded(Manifest::new(), condition)
            }
        },
        Err(failure) => {
            let condition = ReportError::ManifestMalformed {
                path: path.to_path_buf(),
                reason: failure.to_string(),
            };
            warn!("{}", condition);
            LoadOutcome::degraded(Manifest::new(), condition)
        }
    }
}

/// Build a manifest from an already-parsed document.
///
/// A null document is an empty manifest. Any other document must be a
/// mapping, and its `tests` key, when present, must be one too. Rows that are
/// not mappings, or that have no category string, become entries of an
/// unrecognized category instead of being dropped.
pub fn manifest_from_value(document: &Value) -> Result<Manifest, String> {
    let table = match document {
        Value::Null => return Ok(Manifest::new()),
        Value::Object(root) => match root.get("tests") {
            Some(Value::Object(tests)) => tests,
            Some(Value::Null) => return Ok(Manifest::new()),
            Some(other) => {
                return Err(format!("`tests` must be a mapping, found {}", kind_of(other)))
            }
            None => root,
        },
        other => return Err(format!("expected a mapping of tests, found {}", kind_of(other))),
    };

    Ok(table
        .iter()
        .map(|(id, raw)| entry_from_value(id, raw))
        .collect())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Advisory text fields: strings as-is, other scalars in their printed form.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn entry_from_value(id: &str, raw: &Value) -> TestManifestEntry {
    let Some(row) = raw.as_object() else {
        warn!("Manifest entry {} is not a test record", id);
        return TestManifestEntry::new(id, Category::Unrecognized(String::new()));
    };

    let category = row
        .get("category")
        .or_else(|| row.get("type"))
        .and_then(Value::as_str)
        .map(Category::parse)
        .unwrap_or_else(|| {
            warn!("Manifest entry {} has no category", id);
            Category::Unrecognized(String::new())
        });

    TestManifestEntry {
        id: id.to_string(),
        category,
        description: scalar_text(row.get("description")).unwrap_or_default(),
        url: scalar_text(row.get("url")),
        test_method: scalar_text(row.get("test_method")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_wrapped_yaml_with_legacy_keys() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "test_list.yaml",
            r#"
tests:
  TE001:
    type: auto-selenium
    description: Create then delete ten tasks
  TC001:
    type: auto-unittest
    description: Index page loads
    test_method: test_01_index_get
  AC001:
    type: accessibility
    description: Home page
    url: /
  TC022:
    type: manuel
    description: Visual check
"#,
        );

        let outcome = load_manifest(&path);
        assert!(!outcome.is_degraded());
        let manifest = outcome.value;

        let ids: Vec<&str> = manifest.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["AC001", "TC001", "TC022", "TE001"]);
        assert_eq!(manifest.get("TE001").unwrap().category, Category::BrowserE2e);
        assert_eq!(manifest.get("AC001").unwrap().url.as_deref(), Some("/"));
        assert_eq!(
            manifest.get("TC001").unwrap().test_method.as_deref(),
            Some("test_01_index_get")
        );
        assert_eq!(manifest.in_category(&Category::Manual).count(), 1);
    }

    #[test]
    fn test_load_flat_json() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "plan.json",
            r#"{"B": {"category": "manual"}, "A": {"category": "unit-test", "description": "x"}}"#,
        );

        let manifest = load_manifest(&path).value;
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("A").unwrap().description, "x");
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "plan.toml",
            "[tests.TC001]\ncategory = \"unit-test\"\n\n[tests.TC002]\ncategory = \"manual\"\n",
        );

        let manifest = load_manifest(&path).value;
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("TC002").unwrap().category, Category::Manual);
    }

    #[test]
    fn test_missing_manifest_is_degraded_not_fatal() {
        let dir = TempDir::new().unwrap();
        let outcome = load_manifest(dir.path().join("absent.yaml"));
        assert!(outcome.value.is_empty());
        assert_eq!(outcome.conditions.len(), 1);
        assert_eq!(outcome.conditions[0].kind(), "manifest_unavailable");
    }

    #[test]
    fn test_malformed_manifest_is_degraded_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.yaml", "tests: [unclosed\n  - : :");
        let outcome = load_manifest(&path);
        assert!(outcome.value.is_empty());
        assert_eq!(outcome.conditions[0].kind(), "manifest_malformed");
    }

    #[test]
    fn test_rows_without_category_are_kept_as_unrecognized() {
        let document = serde_json::json!({
            "tests": {
                "X1": {"description": "no category"},
                "X2": "not a mapping",
                "X3": {"type": "load-test"}
            }
        });

        let manifest = manifest_from_value(&document).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(
            manifest.get("X1").unwrap().category,
            Category::Unrecognized(String::new())
        );
        assert_eq!(
            manifest.get("X2").unwrap().category,
            Category::Unrecognized(String::new())
        );
        assert_eq!(
            manifest.get("X3").unwrap().category,
            Category::Unrecognized("load-test".to_string())
        );
    }

    #[test]
    fn test_empty_yaml_document_is_an_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.yaml", "");
        let outcome = load_manifest(&path);
        assert!(outcome.value.is_empty());
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn test_non_string_advisory_fields_keep_the_category() {
        let document = serde_json::json!({
            "tests": {
                "TC001": {"type": "auto-unittest", "description": 2024},
                "TC002": {"type": "manual", "url": 8000},
                "TC003": {"category": "accessibility", "description": ["a", "b"]}
            }
        });

        let manifest = manifest_from_value(&document).unwrap();
        let tc001 = manifest.get("TC001").unwrap();
        assert_eq!(tc001.category, Category::UnitTest);
        assert_eq!(tc001.description, "2024");
        let tc002 = manifest.get("TC002").unwrap();
        assert_eq!(tc002.category, Category::Manual);
        assert_eq!(tc002.url.as_deref(), Some("8000"));
        let tc003 = manifest.get("TC003").unwrap();
        assert_eq!(tc003.category, Category::Accessibility);
        assert_eq!(tc003.description, "");
    }

    #[test]
    fn test_numeric_description_in_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "test_list.yaml",
            "tests:\n  TC001:\n    type: auto-unittest\n    description: 42\n",
        );

        let outcome = load_manifest(&path);
        assert!(!outcome.is_degraded());
        assert_eq!(
            outcome.value.get("TC001").unwrap().category,
            Category::UnitTest
        );
    }

    #[test]
    fn test_wrong_document_shape_is_malformed() {
        let dir = TempDir::new().unwrap();
        for (name, contents) in [
            ("list.yaml", "tests:\n  - TC001\n  - TC002\n"),
            ("sequence.yaml", "- TC001\n- TC002\n"),
            ("scalar.yaml", "just a sentence\n"),
        ] {
            let outcome = load_manifest(write(&dir, name, contents));
            assert!(outcome.value.is_empty(), "{}", name);
            assert_eq!(outcome.conditions.len(), 1, "{}", name);
            assert_eq!(outcome.conditions[0].kind(), "manifest_malformed", "{}", name);
        }
    }

    #[test]
    fn test_null_tests_key_is_an_empty_manifest() {
        let manifest = manifest_from_value(&serde_json::json!({"tests": null})).unwrap();
        assert!(manifest.is_empty());
    }
}
