//! Effective status of a single manifest entry.

use report_model::{Category, EffectiveStatus, Icon, ResultSources, TestStatus};

/// Decide the effective status of `id` given its category.
///
/// Manual entries never consult a source. Automated entries look themselves
/// up in the mapping of their own category; anything other than a clean pass
/// or fail (absent, error, skipped, unknown) is reported as not found.
pub fn resolve(id: &str, category: &Category, sources: &ResultSources) -> (EffectiveStatus, Icon) {
    let status = match category {
        Category::Manual => EffectiveStatus::ManualRequired,
        Category::Unrecognized(_) => EffectiveStatus::UnknownCategory,
        Category::UnitTest | Category::BrowserE2e | Category::Accessibility => {
            match sources.lookup(category, id).map(|record| record.status) {
                Some(TestStatus::Passed) => EffectiveStatus::Passed,
                Some(TestStatus::Failed) => EffectiveStatus::Failed,
                Some(TestStatus::Error | TestStatus::Skipped | TestStatus::Unknown) | None => {
                    EffectiveStatus::NotFound
                }
            }
        }
    };
    (status, status.icon())
}
