//! Text, JSON and TOML presentation of a [`Report`].

use crate::aggregate::{AggregateStats, Report, ReportRow};
use report_model::{Category, EffectiveStatus, TestStatus};
use std::fmt;
use thiserror::Error;

const RULE_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 40;
/// Source messages are cut to this many characters in the details section.
const MESSAGE_PREVIEW_LEN: usize = 50;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Toml,
}

pub fn render(report: &Report, format: ReportFormat) -> RenderResult<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Toml => Ok(toml::to_string_pretty(report)?),
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn status_cell(row: &ReportRow) -> String {
    match (row.status, row.source_status) {
        (
            EffectiveStatus::NotFound,
            Some(raw @ (TestStatus::Error | TestStatus::Skipped | TestStatus::Unknown)),
        ) => format!("{} ({})", row.status.label(), raw),
        _ => row.status.label().to_string(),
    }
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn render_text(report: &Report) -> String {
    report.to_string()
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "{}", rule)?;
        writeln!(f, "TEST REPORT")?;
        writeln!(f, "{}", rule)?;
        for row in &self.rows {
            writeln!(
                f,
                "{} {:6} | {:15} | {:24} | {}",
                row.icon.as_str(),
                row.id,
                row.category.as_str(),
                status_cell(row),
                row.description
            )?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(f)?;

        if self.is_empty() {
            writeln!(f, "No tests found!")?;
        } else {
            write_statistics(f, &self.stats)?;
            write_categories(f, &self.stats)?;
            write_details(f, self)?;
        }

        if !self.conditions.is_empty() {
            writeln!(f)?;
            writeln!(f, "⚠️  CONDITIONS")?;
            writeln!(f, "{}", "-".repeat(SECTION_WIDTH))?;
            for condition in &self.conditions {
                writeln!(f, " - {}", condition)?;
            }
        }

        Ok(())
    }
}

fn write_statistics(f: &mut fmt::Formatter<'_>, stats: &AggregateStats) -> fmt::Result {
    writeln!(f, "📈 STATISTICS")?;
    writeln!(f, "{}", "-".repeat(SECTION_WIDTH))?;
    writeln!(f, "Number of tests: {}", stats.total)?;

    if let Some(p) = &stats.percentages {
        writeln!(f, "Passed tests: {} ({})", stats.passed, pct(p.passed))?;
        writeln!(f, "Failed tests: {} ({})", stats.failed, pct(p.failed))?;
        writeln!(
            f,
            "Not found tests: {} ({})",
            stats.not_found,
            pct(p.not_found)
        )?;
        writeln!(
            f,
            "Tests to pass manually: {} ({})",
            stats.manual,
            pct(p.manual)
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Passed + Manual: {} ({})",
            stats.compliant(),
            pct(p.compliance)
        )?;
    }

    if stats.unknown_category > 0 {
        writeln!(
            f,
            "Unknown category (counted as not found): {}",
            stats.unknown_category
        )?;
    }
    Ok(())
}

fn write_categories(f: &mut fmt::Formatter<'_>, stats: &AggregateStats) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "📋 BY CATEGORY")?;
    writeln!(f, "{}", "-".repeat(SECTION_WIDTH))?;

    for (category, category_stats) in &stats.per_category {
        let label = category.label();
        match &category_stats.percentages {
            None => writeln!(f, "{:22}: no tests of this type defined", label)?,
            Some(_) if *category == Category::Manual => writeln!(
                f,
                "{:22}: {} to run by hand",
                label, category_stats.manual
            )?,
            Some(p) => writeln!(
                f,
                "{:22}: {}/{} passed ({}), {} failed ({}), {} not found ({})",
                label,
                category_stats.passed,
                category_stats.total,
                pct(p.passed),
                category_stats.failed,
                pct(p.failed),
                category_stats.not_found,
                pct(p.not_found)
            )?,
        }
    }
    Ok(())
}

/// Source diagnostics for every automated entry that did not pass.
fn write_details(f: &mut fmt::Formatter<'_>, report: &Report) -> fmt::Result {
    let pending: Vec<&ReportRow> = report
        .rows
        .iter()
        .filter(|row| row.category.is_automated() && row.status != EffectiveStatus::Passed)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    writeln!(f)?;
    writeln!(f, "🔍 DETAILS")?;
    writeln!(f, "{}", "-".repeat(SECTION_WIDTH))?;
    for row in pending {
        match row.source_status {
            Some(status) => {
                let message = row
                    .message
                    .as_deref()
                    .map(|m| truncate(m, MESSAGE_PREVIEW_LEN))
                    .unwrap_or_else(|| "no message".to_string());
                writeln!(f, " - {}: {} - {}", row.id, status, message)?;
            }
            None => writeln!(
                f,
                " - {}: no result in the {} source",
                row.id,
                row.category.as_str()
            )?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::generate_report;
    use report_model::{
        Manifest, ReportError, ResultMap, ResultRecord, ResultSources, TestManifestEntry,
    };
    use std::path::PathBuf;

    fn sample_report() -> Report {
        let manifest = Manifest::new()
            .with_entry(
                TestManifestEntry::new("TC001", Category::UnitTest)
                    .with_description("Index page loads"),
            )
            .with_entry(TestManifestEntry::new("TC002", Category::UnitTest))
            .with_entry(TestManifestEntry::new("TC003", Category::Manual));

        let mut unit = ResultMap::new();
        unit.insert("TC001".to_string(), ResultRecord::new(TestStatus::Passed));
        unit.insert(
            "TC002".to_string(),
            ResultRecord::new(TestStatus::Error).with_message("x".repeat(80)),
        );

        generate_report(&manifest, &ResultSources::new().with(Category::UnitTest, unit))
            .with_conditions(vec![ReportError::ResultSourceUnavailable {
                source_name: "browser-e2e".to_string(),
                path: PathBuf::from("result_test_selenium.json"),
            }])
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text(&sample_report());

        assert!(text.contains("✅ TC001  | unit-test"));
        assert!(text.contains("Not found (error)"));
        assert!(text.contains("Number of tests: 3"));
        assert!(text.contains("Passed tests: 1 (33.3%)"));
        assert!(text.contains("Passed + Manual: 2 (66.7%)"));
        assert!(text.contains("no tests of this type defined"));
        assert!(text.contains(&format!(" - TC002: error - {}...", "x".repeat(50))));
        assert!(text.contains("result_test_selenium.json"));
    }

    #[test]
    fn test_empty_report_says_no_tests() {
        let report = generate_report(&Manifest::new(), &ResultSources::new());
        let text = render_text(&report);
        assert!(text.contains("No tests found!"));
        assert!(!text.contains("STATISTICS"));
    }

    #[test]
    fn test_json_and_toml_carry_stats() {
        let report = sample_report();

        let json: serde_json::Value =
            serde_json::from_str(&render(&report, ReportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["stats"]["total"], 3);
        assert_eq!(json["rows"][1]["source_status"], "error");
        assert_eq!(json["conditions"][0]["kind"], "result_source_unavailable");

        let toml_text = render(&report, ReportFormat::Toml).unwrap();
        let parsed: toml::Value = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed["stats"]["manual"].as_integer(), Some(1));
    }

    #[test]
    fn test_display_matches_text_rendering() {
        let report = sample_report();
        let out = format!("{}", report);
        assert_eq!(out, render_text(&report));
        assert!(out.ends_with("result_test_selenium.json\n"));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("éééé", 2), "éé...");
        assert_eq!(truncate("short", 50), "short");
    }
}
