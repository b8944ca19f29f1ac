//! Report generation: resolve every manifest entry and accumulate statistics.

use crate::resolver::resolve;
use chrono::{DateTime, Utc};
use report_model::{
    Category, EffectiveStatus, Icon, Manifest, ReportError, ResultSources, TestStatus,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One resolved manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub category: Category,
    pub status: EffectiveStatus,
    pub icon: Icon,
    pub description: String,
    /// Normalized status reported by the source, when there was a record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_status: Option<TestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 10.0).round() / 10.0)
}

/// Shares of a total, in percent. Values are kept exact; serialized output
/// and rendered text show one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentages {
    #[serde(serialize_with = "one_decimal")]
    pub passed: f64,
    #[serde(serialize_with = "one_decimal")]
    pub failed: f64,
    #[serde(serialize_with = "one_decimal")]
    pub not_found: f64,
    #[serde(serialize_with = "one_decimal")]
    pub manual: f64,
    /// Passed plus manual.
    #[serde(serialize_with = "one_decimal")]
    pub compliance: f64,
}

impl Percentages {
    fn of(passed: usize, failed: usize, not_found: usize, manual: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let pct = |count: usize| count as f64 / total as f64 * 100.0;
        Some(Self {
            passed: pct(passed),
            failed: pct(failed),
            not_found: pct(not_found),
            manual: pct(manual),
            compliance: pct(passed + manual),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_found: usize,
    pub manual: usize,
    /// Absent when the category has no tests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Percentages>,
}

impl CategoryStats {
    fn record(&mut self, status: EffectiveStatus) {
        self.total += 1;
        match status {
            EffectiveStatus::Passed => self.passed += 1,
            EffectiveStatus::Failed => self.failed += 1,
            EffectiveStatus::NotFound | EffectiveStatus::UnknownCategory => self.not_found += 1,
            EffectiveStatus::ManualRequired => self.manual += 1,
        }
    }

    fn finish(&mut self) {
        self.percentages = Percentages::of(
            self.passed,
            self.failed,
            self.not_found,
            self.manual,
            self.total,
        );
    }
}

/// Overall and per-category counts.
///
/// `total == passed + failed + not_found + manual` always holds. Entries of
/// an unrecognized category count as not found and are also tallied in
/// `unknown_category`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_found: usize,
    pub manual: usize,
    pub unknown_category: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Percentages>,
    pub per_category: BTreeMap<Category, CategoryStats>,
}

impl AggregateStats {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut per_category: BTreeMap<Category, CategoryStats> = Category::KNOWN
            .iter()
            .cloned()
            .map(|category| (category, CategoryStats::default()))
            .collect();
        let mut overall = CategoryStats::default();
        let mut unknown_category = 0;

        for row in rows {
            overall.record(row.status);
            if row.status == EffectiveStatus::UnknownCategory {
                unknown_category += 1;
            }
            per_category
                .entry(row.category.clone())
                .or_default()
                .record(row.status);
        }

        overall.finish();
        for stats in per_category.values_mut() {
            stats.finish();
        }

        Self {
            total: overall.total,
            passed: overall.passed,
            failed: overall.failed,
            not_found: overall.not_found,
            manual: overall.manual,
            unknown_category,
            percentages: overall.percentages,
            per_category,
        }
    }

    /// Passed plus manual.
    pub fn compliant(&self) -> usize {
        self.passed + self.manual
    }

    pub fn category(&self, category: &Category) -> Option<&CategoryStats> {
        self.per_category.get(category)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
    pub stats: AggregateStats,
    /// Load problems met while gathering the inputs.
    pub conditions: Vec<ReportError>,
}

impl Report {
    pub fn with_conditions(mut self, conditions: Vec<ReportError>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows_in<'a>(&'a self, category: &'a Category) -> impl Iterator<Item = &'a ReportRow> + 'a {
        self.rows.iter().filter(move |row| &row.category == category)
    }
}

/// Resolve every manifest entry, in id order, and compute the statistics.
pub fn generate_report(manifest: &Manifest, sources: &ResultSources) -> Report {
    let rows: Vec<ReportRow> = manifest
        .iter()
        .map(|entry| {
            let (status, icon) = resolve(&entry.id, &entry.category, sources);
            let record = if entry.category.is_automated() {
                sources.lookup(&entry.category, &entry.id)
            } else {
                None
            };
            ReportRow {
                id: entry.id.clone(),
                category: entry.category.clone(),
                status,
                icon,
                description: entry.description.clone(),
                source_status: record.map(|r| r.status),
                message: record.and_then(|r| r.message.clone()),
            }
        })
        .collect();

    let stats = AggregateStats::from_rows(&rows);

    Report {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        rows,
        stats,
        conditions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_model::{ResultMap, ResultRecord, TestManifestEntry};

    fn results(entries: &[(&str, TestStatus)]) -> ResultMap {
        entries
            .iter()
            .map(|(id, status)| (id.to_string(), ResultRecord::new(*status)))
            .collect()
    }

    #[test]
    fn test_rows_follow_sorted_id_order() {
        let manifest: Manifest = ["TC010", "TC002", "TC001"]
            .into_iter()
            .map(|id| TestManifestEntry::new(id, Category::Manual))
            .collect();

        let report = generate_report(&manifest, &ResultSources::new());
        let ids: Vec<_> = report.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["TC001", "TC002", "TC010"]);
    }

    #[test]
    fn test_source_status_is_kept_on_row() {
        let manifest = Manifest::new()
            .with_entry(TestManifestEntry::new("TC001", Category::UnitTest))
            .with_entry(TestManifestEntry::new("TC002", Category::Manual));
        let mut unit = results(&[("TC001", TestStatus::Error)]);
        if let Some(record) = unit.get_mut("TC001") {
            record.message = Some("Traceback".to_string());
        }
        let sources = ResultSources::new().with(Category::UnitTest, unit);

        let report = generate_report(&manifest, &sources);
        assert_eq!(report.rows[0].status, EffectiveStatus::NotFound);
        assert_eq!(report.rows[0].source_status, Some(TestStatus::Error));
        assert_eq!(report.rows[0].message.as_deref(), Some("Traceback"));
        assert_eq!(report.rows[1].source_status, None);
    }

    #[test]
    fn test_unknown_category_keeps_partition() {
        let manifest = Manifest::new()
            .with_entry(TestManifestEntry::new("TC001", Category::parse("perf")))
            .with_entry(TestManifestEntry::new("TC002", Category::Unrecognized(String::new())))
            .with_entry(TestManifestEntry::new("TC003", Category::Manual));

        let stats = generate_report(&manifest, &ResultSources::new()).stats;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.not_found, 2);
        assert_eq!(stats.unknown_category, 2);
        assert_eq!(
            stats.total,
            stats.passed + stats.failed + stats.not_found + stats.manual
        );
        assert_eq!(
            stats.category(&Category::Unrecognized("perf".to_string())).map(|s| s.total),
            Some(1)
        );
    }

    #[test]
    fn test_per_category_percentages() {
        let manifest = Manifest::new()
            .with_entry(TestManifestEntry::new("TC001", Category::UnitTest))
            .with_entry(TestManifestEntry::new("TC002", Category::UnitTest))
            .with_entry(TestManifestEntry::new("TC003", Category::UnitTest));
        let sources = ResultSources::new().with(
            Category::UnitTest,
            results(&[("TC001", TestStatus::Passed), ("TC002", TestStatus::Failed)]),
        );

        let stats = generate_report(&manifest, &sources).stats;
        let unit = stats.category(&Category::UnitTest).unwrap();
        assert_eq!((unit.passed, unit.failed, unit.not_found), (1, 1, 1));
        let pct = unit.percentages.unwrap();
        assert!((pct.passed - 33.333).abs() < 0.01);

        let e2e = stats.category(&Category::BrowserE2e).unwrap();
        assert_eq!(e2e.total, 0);
        assert!(e2e.percentages.is_none());
    }

    #[test]
    fn test_percentages_serialize_with_one_decimal() {
        let pct = Percentages::of(1, 2, 0, 0, 3).unwrap();
        let json = serde_json::to_value(pct).unwrap();
        assert_eq!(json["passed"], 33.3);
        assert_eq!(json["failed"], 66.7);
        assert_eq!(json["compliance"], 33.3);
    }

    #[test]
    fn test_empty_manifest_has_no_percentages() {
        let report = generate_report(&Manifest::new(), &ResultSources::new());
        assert!(report.is_empty());
        assert_eq!(report.stats.total, 0);
        assert!(report.stats.percentages.is_none());
    }
}
