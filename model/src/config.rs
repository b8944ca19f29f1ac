use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub manifest: ManifestConfig,
    pub sources: SourcesConfig,
    pub accessibility: AccessibilityConfig,
    pub certificate: CertificateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub path: PathBuf,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("test_list.yaml"),
        }
    }
}

/// Locations of the result documents written by the external runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub unit_test: PathBuf,
    pub browser_e2e: PathBuf,
    pub accessibility: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            unit_test: PathBuf::from("result_test_auto.json"),
            browser_e2e: PathBuf::from("result_test_selenium.json"),
            accessibility: PathBuf::from("result_test_accessibility.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    /// Base URL that relative manifest targets are joined onto.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Run a live scan when no accessibility artifact exists.
    pub scan: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 5,
            scan: true,
            cache_dir: PathBuf::from(".report-cache"),
            cache_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    pub project_name: String,
    pub executor: String,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            project_name: "Todo List Application".to_string(),
            executor: "GitHub Actions CI".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing tables and keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config
            .validate()
            .map_err(|message| ConfigError::Invalid { message })?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest.path = path.into();
        self
    }

    pub fn with_unit_results(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.unit_test = path.into();
        self
    }

    pub fn with_e2e_results(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.browser_e2e = path.into();
        self
    }

    pub fn with_accessibility_results(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.accessibility = path.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.accessibility.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.accessibility.timeout_secs = whole_secs_rounded_up(timeout);
        self
    }

    pub fn with_scan(mut self, scan: bool) -> Self {
        self.accessibility.scan = scan;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.accessibility.cache_dir = dir.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.accessibility.cache_ttl_secs = whole_secs_rounded_up(ttl);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.accessibility.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.accessibility.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.manifest.path.as_os_str().is_empty() {
            return Err("Manifest path cannot be empty".to_string());
        }

        for (name, path) in [
            ("unit_test", &self.sources.unit_test),
            ("browser_e2e", &self.sources.browser_e2e),
            ("accessibility", &self.sources.accessibility),
        ] {
            if path.as_os_str().is_empty() {
                return Err(format!("Result path for {} cannot be empty", name));
            }
        }

        let base_url = &self.accessibility.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.accessibility.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.accessibility.cache_ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Settings are kept in whole seconds; a partial second counts as one more.
fn whole_secs_rounded_up(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.manifest.path, PathBuf::from("test_list.yaml"));
        assert_eq!(
            config.sources.browser_e2e,
            PathBuf::from("result_test_selenium.json")
        );
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ReportConfig::new()
            .with_manifest_path("plan.yml")
            .with_base_url("https://staging.example.com")
            .with_timeout(Duration::from_secs(10))
            .with_scan(false);

        assert_eq!(config.manifest.path, PathBuf::from("plan.yml"));
        assert_eq!(config.accessibility.base_url, "https://staging.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(!config.accessibility.scan);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ReportConfig::default();

        config.manifest.path = PathBuf::new();
        assert!(config.validate().is_err());

        config.manifest.path = PathBuf::from("test_list.yaml");
        config.accessibility.base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        config.accessibility.base_url = "http://localhost:8000".to_string();
        config.accessibility.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.accessibility.timeout_secs = 5;
        config.accessibility.cache_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ReportConfig::from_toml_str(
            r#"
            [sources]
            unit_test = "out/unit.json"

            [accessibility]
            timeout_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.unit_test, PathBuf::from("out/unit.json"));
        assert_eq!(
            config.sources.accessibility,
            PathBuf::from("result_test_accessibility.json")
        );
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.certificate.project_name, "Todo List Application");
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let err = ReportConfig::from_toml_str("[accessibility]\nbase_url = \"ftp://x\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = ReportConfig::from_toml_str("[sources\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_sub_second_durations_round_up() {
        let config = ReportConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_cache_ttl(Duration::from_millis(2_100));

        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl(), Duration::from_secs(3));
        assert!(config.validate().is_ok());

        let zero = ReportConfig::default().with_timeout(Duration::ZERO);
        assert!(zero.validate().is_err());
    }
}
