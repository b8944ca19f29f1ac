pub mod cache;
pub mod config;
pub mod decode;
pub mod loaders;
pub mod manifest;
pub mod source;
pub mod types;

pub use cache::{CachedResults, Clock, ManualClock, ResultCache, SystemClock};
pub use config::{
    AccessibilityConfig, CertificateConfig, ConfigError, ConfigResult, ManifestConfig,
    ReportConfig, SourcesConfig,
};
pub use decode::{parse_with_fallback, DecodeFailure, TextDecoding};
pub use loaders::{parse_results, write_results, JsonFileSource, SourceShape};
pub use manifest::{load_manifest, manifest_from_value, Manifest, ManifestFormat, TestManifestEntry};
pub use source::{LoadOutcome, ReportError, ResultSource, ResultSources, SourceRegistry};
pub use types::{Category, EffectiveStatus, Icon, ResultMap, ResultRecord, TestStatus};

pub mod prelude {
    pub use crate::cache::*;
    pub use crate::config::*;
    pub use crate::loaders::*;
    pub use crate::manifest::*;
    pub use crate::source::*;
    pub use crate::types::*;
}
