use a11y_scanner::{AccessibilityScanner, HttpFetcher};
use clap::{Parser, Subcommand, ValueEnum};
use harness::{
    method_map, parse_unittest_log, render, run_report, BuildInfo, DeliveryCertificate,
    ReportFormat,
};
use report_model::prelude::*;
use report_model::{parse_with_fallback, TextDecoding};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "test-report")]
#[command(about = "Aggregate test results against the test manifest")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Test manifest (YAML, JSON or TOML)
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the test report
    Report {
        /// Unit-test result document
        #[arg(long)]
        unit_results: Option<PathBuf>,
        /// Browser E2E result document
        #[arg(long)]
        e2e_results: Option<PathBuf>,
        /// Accessibility result document
        #[arg(long)]
        a11y_results: Option<PathBuf>,
        /// Never scan pages when the accessibility document is missing
        #[arg(long)]
        no_scan: bool,
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scan the manifest's accessibility targets and write the result document
    Scan {
        #[arg(long)]
        base_url: Option<String>,
        /// Per-page timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a Django verbose test log into the unit-test result document
    IngestUnittest {
        /// Combined stdout/stderr of the test run
        #[arg(short, long)]
        log: PathBuf,
        /// Exit code of the test run
        #[arg(long, default_value = "0")]
        exit_code: i32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build the delivery certificate
    Certificate {
        #[arg(short, long, value_enum, default_value = "text")]
        format: CertificateFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CertificateFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::from_file(path)?,
        None => ReportConfig::default(),
    };
    if let Some(manifest) = cli.manifest {
        config = config.with_manifest_path(manifest);
    }

    match cli.command {
        Commands::Report {
            unit_results,
            e2e_results,
            a11y_results,
            no_scan,
            format,
            output,
        } => {
            if let Some(path) = unit_results {
                config = config.with_unit_results(path);
            }
            if let Some(path) = e2e_results {
                config = config.with_e2e_results(path);
            }
            if let Some(path) = a11y_results {
                config = config.with_accessibility_results(path);
            }
            validate(&config)?;

            let report = run_report(&config, !no_scan).await?;
            emit(&render(&report, format)?, output.as_deref())?;
        }
        Commands::Scan {
            base_url,
            timeout_secs,
            output,
        } => {
            if let Some(url) = base_url {
                config = config.with_base_url(url);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_timeout(Duration::from_secs(secs));
            }
            validate(&config)?;
            scan(&config, output).await?;
        }
        Commands::IngestUnittest {
            log,
            exit_code,
            output,
        } => {
            validate(&config)?;
            ingest(&config, &log, exit_code, output)?;
        }
        Commands::Certificate { format, output } => {
            validate(&config)?;
            let report = run_report(&config, config.accessibility.scan).await?;
            let certificate =
                DeliveryCertificate::from_report(&report, &config.certificate, BuildInfo::detect("."));
            let rendered = match format {
                CertificateFormat::Text => certificate.to_text(),
                CertificateFormat::Json => serde_json::to_string_pretty(&certificate)?,
            };
            emit(&rendered, output.as_deref())?;
        }
    }

    Ok(())
}

fn validate(config: &ReportConfig) -> Result<(), ConfigError> {
    config
        .validate()
        .map_err(|message| ConfigError::Invalid { message })
}

fn emit(text: &str, output: Option<&Path>) -> std::io::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

async fn scan(config: &ReportConfig, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let (manifest, _) = load_manifest(&config.manifest.path).into_parts();
    let targets = AccessibilityScanner::targets_from_manifest(&manifest);
    if targets.is_empty() {
        warn!("The manifest has no accessibility entries with a url");
    }

    let fetcher = HttpFetcher::new(config.timeout())?;
    let scanner = AccessibilityScanner::new(Box::new(fetcher), config.accessibility.base_url.clone());
    let outcome = scanner.scan(&targets).await;

    let output = output.unwrap_or_else(|| config.sources.accessibility.clone());
    write_results(&output, &outcome.value)?;

    let passed = outcome
        .value
        .values()
        .filter(|r| r.status == TestStatus::Passed)
        .count();
    println!(
        "Accessibility: {}/{} pages passed, {} unreachable. Results in {}",
        passed,
        outcome.value.len(),
        outcome.conditions.len(),
        output.display()
    );
    Ok(())
}

fn ingest(
    config: &ReportConfig,
    log: &Path,
    exit_code: i32,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (manifest, _) = load_manifest(&config.manifest.path).into_parts();
    let methods = method_map(&manifest);
    if methods.is_empty() {
        warn!("No manifest entry declares a test_method; nothing to map");
    }

    let bytes = std::fs::read(log)?;
    let (text, decoding) = parse_with_fallback(&bytes, &TextDecoding::DEFAULT_ORDER, |text| {
        Ok::<_, Infallible>(text.to_string())
    })?;
    info!("Read {} as {}", log.display(), decoding.name());

    let results = parse_unittest_log(&text, &methods, exit_code)?;
    let output = output.unwrap_or_else(|| config.sources.unit_test.clone());
    write_results(&output, &results)?;

    let count = |status: TestStatus| results.values().filter(|r| r.status == status).count();
    println!(
        "Unit tests: {} passed, {} failed, {} errors, {} skipped. Results in {}",
        count(TestStatus::Passed),
        count(TestStatus::Failed),
        count(TestStatus::Error),
        count(TestStatus::Skipped),
        output.display()
    );
    Ok(())
}
