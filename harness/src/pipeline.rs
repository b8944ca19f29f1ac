//! Wiring from configuration to loaded report inputs.

use crate::aggregate::{generate_report, Report};
use a11y_scanner::{AccessibilityScanner, HttpFetcher, ScanResult, ScanningSource};
use report_model::{
    load_manifest, JsonFileSource, Manifest, ReportConfig, ReportError, ResultCache,
    ResultSources, SourceRegistry,
};
use tracing::info;

/// Everything the aggregator needs, plus the conditions met loading it.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub manifest: Manifest,
    pub sources: ResultSources,
    pub conditions: Vec<ReportError>,
}

/// Register the three result sources described by `config`.
///
/// The accessibility source gets a live scanner only when `scan` is set,
/// scanning is enabled in the configuration and the manifest names at
/// least one accessibility target.
pub fn build_registry(
    config: &ReportConfig,
    manifest: &Manifest,
    scan: bool,
) -> ScanResult<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    registry.register(Box::new(JsonFileSource::unit_test(
        config.sources.unit_test.clone(),
    )));
    registry.register(Box::new(JsonFileSource::browser_e2e(
        config.sources.browser_e2e.clone(),
    )));

    let cache = ResultCache::new(config.accessibility.cache_dir.clone(), config.cache_ttl());
    let mut accessibility = ScanningSource::new(JsonFileSource::accessibility(
        config.sources.accessibility.clone(),
    ))
    .with_cache(cache);

    if scan && config.accessibility.scan {
        let targets = AccessibilityScanner::targets_from_manifest(manifest);
        if !targets.is_empty() {
            let fetcher = HttpFetcher::new(config.timeout())?;
            let scanner = AccessibilityScanner::new(
                Box::new(fetcher),
                config.accessibility.base_url.clone(),
            );
            accessibility = accessibility.with_scanner(scanner, targets);
        }
    }
    registry.register(Box::new(accessibility));

    Ok(registry)
}

pub async fn gather_inputs(config: &ReportConfig, scan: bool) -> ScanResult<ReportInputs> {
    let (manifest, mut conditions) = load_manifest(&config.manifest.path).into_parts();
    let registry = build_registry(config, &manifest, scan)?;
    info!("Loading result sources: {}", registry.list_sources().join(", "));

    let (sources, source_conditions) = registry.load_all().await.into_parts();
    conditions.extend(source_conditions);

    Ok(ReportInputs {
        manifest,
        sources,
        conditions,
    })
}

/// Load all inputs and build the report.
pub async fn run_report(config: &ReportConfig, scan: bool) -> ScanResult<Report> {
    let inputs = gather_inputs(config, scan).await?;
    let report = generate_report(&inputs.manifest, &inputs.sources).with_conditions(inputs.conditions);
    info!(
        "Report {}: {} tests, {} passed, {} failed, {} not found, {} manual",
        report.run_id,
        report.stats.total,
        report.stats.passed,
        report.stats.failed,
        report.stats.not_found,
        report.stats.manual
    );
    Ok(report)
}
