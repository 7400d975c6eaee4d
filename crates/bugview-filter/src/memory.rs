//! In-memory report-query gateway
//!
//! [`InMemoryGateway`] evaluates [`QueryScope`]s over a [`ReportStore`] loaded
//! from JSON. All predicate fields combine with AND semantics; within a field
//! the values combine with OR. Used by the CLI and throughout the tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use bugview_core::{
    CompareData, DetectionStatus, DiffType, ReportFilter, ReviewStatus, Severity, wildcard_match,
};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{NameCount, Page, ReportQueryGateway, RunReportCount, RunTagCount};
use crate::query::QueryScope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub name: String,
}

/// A named point in a run's history. A report belongs to a tag when it was
/// detected at or before the tag and not fixed by then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub run_id: i64,
    pub tag: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: i64,
    pub run_id: i64,
    pub bug_hash: String,
    pub file_path: String,
    pub checker_name: String,
    #[serde(default)]
    pub checker_msg: String,
    pub severity: Severity,
    #[serde(default)]
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub detection_status: DetectionStatus,
    pub detected_at: i64,
    #[serde(default)]
    pub fixed_at: Option<i64>,
    #[serde(default)]
    pub bug_path_length: u32,
}

/// Source component: `+pattern` includes paths, `-pattern` excludes them.
/// A component without include patterns covers every path it does not exclude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    pub patterns: Vec<String>,
}

impl ComponentRecord {
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        let mut includes = self
            .patterns
            .iter()
            .filter_map(|p| p.strip_prefix('+'))
            .peekable();
        let included = includes.peek().is_none() || includes.any(|p| wildcard_match(p, path));
        let excluded = self
            .patterns
            .iter()
            .filter_map(|p| p.strip_prefix('-'))
            .any(|p| wildcard_match(p, path));
        included && !excluded
    }
}

/// Everything the in-memory gateway answers from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStore {
    #[serde(default)]
    pub runs: Vec<RunRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub reports: Vec<ReportRecord>,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

impl ReportStore {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: &Path) -> bugview_core::CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&raw)?)
    }

    fn run_name(&self, run_id: i64) -> Option<&str> {
        self.runs
            .iter()
            .find(|r| r.id == run_id)
            .map(|r| r.name.as_str())
    }

    fn in_tag(report: &ReportRecord, tag: &TagRecord) -> bool {
        report.run_id == tag.run_id
            && report.detected_at <= tag.timestamp
            && report.fixed_at.is_none_or(|fixed| fixed > tag.timestamp)
    }

    fn in_any_tag(&self, report: &ReportRecord, tag_ids: &[i64]) -> bool {
        self.tags
            .iter()
            .filter(|t| tag_ids.contains(&t.id))
            .any(|t| Self::in_tag(report, t))
    }

    fn in_components(&self, report: &ReportRecord, names: &[String]) -> bool {
        self.components
            .iter()
            .filter(|c| names.iter().any(|n| wildcard_match(n, &c.name)))
            .any(|c| c.covers(&report.file_path))
    }

    /// The report predicate, minus run and run-tag membership.
    fn matches_fields(&self, report: &ReportRecord, filter: &ReportFilter) -> bool {
        let any_glob = |patterns: &[String], text: &str| {
            patterns.is_empty() || patterns.iter().any(|p| wildcard_match(p, text))
        };
        any_glob(&filter.filepath, &report.file_path)
            && any_glob(&filter.checker_name, &report.checker_name)
            && any_glob(&filter.checker_msg, &report.checker_msg)
            && any_glob(&filter.report_hash, &report.bug_hash)
            && (filter.severity.is_empty() || filter.severity.contains(&report.severity))
            && (filter.review_status.is_empty()
                || filter.review_status.contains(&report.review_status))
            && (filter.detection_status.is_empty()
                || filter.detection_status.contains(&report.detection_status))
            && (filter.component_names.is_empty()
                || self.in_components(report, &filter.component_names))
            && filter
                .bug_path_length
                .is_none_or(|range| range.contains(report.bug_path_length))
            && filter
                .date
                .detected
                .is_none_or(|interval| interval.contains(report.detected_at))
            && filter
                .date
                .fixed
                .is_none_or(|interval| report.fixed_at.is_some_and(|f| interval.contains(f)))
    }

    fn baseline<'a>(&'a self, scope: &QueryScope) -> Vec<&'a ReportRecord> {
        let filter = &scope.report_filter;
        self.reports
            .iter()
            .filter(|r| scope.run_ids.is_empty() || scope.run_ids.contains(&r.run_id))
            .filter(|r| filter.run_tag.is_empty() || self.in_any_tag(r, &filter.run_tag))
            .filter(|r| self.matches_fields(r, filter))
            .collect()
    }

    fn compare_side<'a>(&'a self, cmp: &CompareData, filter: &ReportFilter) -> Vec<&'a ReportRecord> {
        let runs = cmp.run_ids.as_deref().unwrap_or_default();
        let tags = cmp.run_tag.as_deref().unwrap_or_default();
        self.reports
            .iter()
            .filter(|r| runs.contains(&r.run_id) || self.in_any_tag(r, tags))
            .filter(|r| self.matches_fields(r, filter))
            .collect()
    }

    /// Reports selected by `scope`, deduplicated by bug hash in unique mode.
    #[must_use]
    pub fn results<'a>(&'a self, scope: &QueryScope) -> Vec<&'a ReportRecord> {
        let baseline = self.baseline(scope);
        let mut rows = match &scope.cmp_data {
            None => baseline,
            Some(cmp) => {
                let compare = self.compare_side(cmp, &scope.report_filter);
                let base_hashes: HashSet<&str> =
                    baseline.iter().map(|r| r.bug_hash.as_str()).collect();
                let cmp_hashes: HashSet<&str> =
                    compare.iter().map(|r| r.bug_hash.as_str()).collect();
                match cmp.diff_type {
                    DiffType::New => compare
                        .into_iter()
                        .filter(|r| !base_hashes.contains(r.bug_hash.as_str()))
                        .collect(),
                    DiffType::Resolved => baseline
                        .into_iter()
                        .filter(|r| !cmp_hashes.contains(r.bug_hash.as_str()))
                        .collect(),
                    DiffType::Unresolved => compare
                        .into_iter()
                        .filter(|r| base_hashes.contains(r.bug_hash.as_str()))
                        .collect(),
                }
            }
        };
        if scope.report_filter.is_unique {
            let mut seen = HashSet::new();
            rows.retain(|r| seen.insert(r.bug_hash.as_str()));
        }
        rows
    }
}

fn ranked(mut rows: Vec<NameCount>, page: Page) -> Vec<NameCount> {
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    page.slice(rows)
}

/// Gateway answering from a [`ReportStore`].
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: RwLock<ReportStore>,
    failure: RwLock<Option<GatewayError>>,
    calls: AtomicUsize,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new(store: ReportStore) -> Self {
        Self {
            store: RwLock::new(store),
            failure: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent call fail with `error` (or succeed again on `None`).
    pub fn set_failure(&self, error: Option<GatewayError>) {
        let mut guard = self
            .failure
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = error;
    }

    /// Number of calls answered or failed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Replace the store contents.
    pub fn replace_store(&self, store: ReportStore) {
        let mut guard = self
            .store
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = store;
    }

    fn with_store<T>(&self, f: impl FnOnce(&ReportStore) -> T) -> GatewayResult<T> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self
            .failure
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }
        let store = self
            .store
            .read()
            .map_err(|_| GatewayError::Unavailable("report store lock poisoned".to_string()))?;
        Ok(f(&store))
    }

    fn grouped(
        &self,
        scope: &QueryScope,
        page: Page,
        own: fn(&mut ReportFilter) -> &mut Vec<String>,
        key: fn(&ReportRecord) -> &str,
    ) -> GatewayResult<Vec<NameCount>> {
        // Group over the scope without this field's constraint, then keep the
        // groups the constraint matches, so multi-valued patterns count once.
        let mut open = scope.clone();
        let patterns = std::mem::take(own(&mut open.report_filter));
        self.with_store(|store| {
            let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
            for report in store.results(&open) {
                *counts.entry(key(report)).or_default() += 1;
            }
            let rows = counts
                .into_iter()
                .filter(|(name, _)| patterns.is_empty() || patterns.iter().any(|p| wildcard_match(p, name)))
                .map(|(name, count)| NameCount {
                    name: name.to_string(),
                    count,
                })
                .collect();
            ranked(rows, page)
        })
    }

    fn enum_counts<E: Ord + Copy>(
        &self,
        scope: &QueryScope,
        key: fn(&ReportRecord) -> E,
    ) -> GatewayResult<BTreeMap<E, u64>> {
        self.with_store(|store| {
            let mut counts = BTreeMap::new();
            for report in store.results(scope) {
                *counts.entry(key(report)).or_default() += 1;
            }
            counts
        })
    }
}

impl ReportQueryGateway for InMemoryGateway {
    fn get_run_result_count(&self, scope: &QueryScope) -> GatewayResult<u64> {
        self.with_store(|store| store.results(scope).len() as u64)
    }

    fn get_severity_counts(&self, scope: &QueryScope) -> GatewayResult<BTreeMap<Severity, u64>> {
        self.enum_counts(scope, |r| r.severity)
    }

    fn get_review_status_counts(
        &self,
        scope: &QueryScope,
    ) -> GatewayResult<BTreeMap<ReviewStatus, u64>> {
        self.enum_counts(scope, |r| r.review_status)
    }

    fn get_detection_status_counts(
        &self,
        scope: &QueryScope,
    ) -> GatewayResult<BTreeMap<DetectionStatus, u64>> {
        self.enum_counts(scope, |r| r.detection_status)
    }

    fn get_file_counts(&self, scope: &QueryScope, page: Page) -> GatewayResult<Vec<NameCount>> {
        self.grouped(scope, page, |f| &mut f.filepath, |r| r.file_path.as_str())
    }

    fn get_checker_counts(&self, scope: &QueryScope, page: Page) -> GatewayResult<Vec<NameCount>> {
        self.grouped(scope, page, |f| &mut f.checker_name, |r| r.checker_name.as_str())
    }

    fn get_checker_msg_counts(
        &self,
        scope: &QueryScope,
        page: Page,
    ) -> GatewayResult<Vec<NameCount>> {
        self.grouped(scope, page, |f| &mut f.checker_msg, |r| r.checker_msg.as_str())
    }

    /// Every component whose name matches the scope's component patterns,
    /// including components that currently cover no report.
    fn get_source_components(
        &self,
        scope: &QueryScope,
        page: Page,
    ) -> GatewayResult<Vec<NameCount>> {
        let mut open = scope.clone();
        let patterns = std::mem::take(&mut open.report_filter.component_names);
        self.with_store(|store| {
            let results = store.results(&open);
            let rows = store
                .components
                .iter()
                .filter(|c| patterns.is_empty() || patterns.iter().any(|p| wildcard_match(p, &c.name)))
                .map(|c| NameCount {
                    name: c.name.clone(),
                    count: results.iter().filter(|r| c.covers(&r.file_path)).count() as u64,
                })
                .collect();
            ranked(rows, page)
        })
    }

    fn get_run_report_counts(
        &self,
        scope: &QueryScope,
        name_patterns: &[String],
        page: Page,
    ) -> GatewayResult<Vec<RunReportCount>> {
        self.with_store(|store| {
            let mut rows: Vec<RunReportCount> = store
                .runs
                .iter()
                .filter(|run| {
                    name_patterns.is_empty()
                        || name_patterns.iter().any(|p| wildcard_match(p, &run.name))
                })
                .map(|run| {
                    let mut per_run = scope.clone();
                    per_run.run_ids = vec![run.id];
                    RunReportCount {
                        run_id: run.id,
                        name: run.name.clone(),
                        count: store.results(&per_run).len() as u64,
                    }
                })
                .collect();
            rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            page.slice(rows)
        })
    }

    fn get_run_tags(
        &self,
        scope: &QueryScope,
        patterns: &[String],
        page: Page,
    ) -> GatewayResult<Vec<RunTagCount>> {
        self.with_store(|store| {
            let mut rows: Vec<RunTagCount> = store
                .tags
                .iter()
                .filter_map(|tag| {
                    let run_name = store.run_name(tag.run_id)?;
                    let token = format!("{run_name}:{}", tag.tag);
                    let wanted =
                        patterns.is_empty() || patterns.iter().any(|p| wildcard_match(p, &token));
                    if !wanted {
                        return None;
                    }
                    let mut per_tag = scope.clone();
                    per_tag.report_filter.run_tag = vec![tag.id];
                    Some(RunTagCount {
                        tag_id: tag.id,
                        run_name: run_name.to_string(),
                        tag: tag.tag.clone(),
                        count: store.results(&per_tag).len() as u64,
                    })
                })
                .collect();
            rows.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.run_name.cmp(&b.run_name))
                    .then_with(|| a.tag.cmp(&b.tag))
            });
            page.slice(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugview_core::DateInterval;

    fn report(id: i64, run_id: i64, hash: &str, file: &str, severity: Severity) -> ReportRecord {
        ReportRecord {
            id,
            run_id,
            bug_hash: hash.to_string(),
            file_path: file.to_string(),
            checker_name: "core.DivideZero".to_string(),
            checker_msg: "Division by zero".to_string(),
            severity,
            review_status: ReviewStatus::Unreviewed,
            detection_status: DetectionStatus::New,
            detected_at: 100,
            fixed_at: None,
            bug_path_length: 3,
        }
    }

    fn store() -> ReportStore {
        ReportStore {
            runs: vec![
                RunRecord { id: 1, name: "nightly".into() },
                RunRecord { id: 2, name: "release".into() },
            ],
            tags: vec![
                TagRecord { id: 10, run_id: 1, tag: "v1".into(), timestamp: 150 },
                TagRecord { id: 11, run_id: 1, tag: "v2".into(), timestamp: 250 },
            ],
            reports: vec![
                report(1, 1, "h1", "/src/lib/a.c", Severity::High),
                ReportRecord {
                    detected_at: 200,
                    ..report(2, 1, "h2", "/src/lib/b.c", Severity::Medium)
                },
                ReportRecord {
                    fixed_at: Some(220),
                    ..report(3, 1, "h3", "/src/test/t.c", Severity::Low)
                },
                report(4, 2, "h1", "/src/lib/a.c", Severity::High),
                report(5, 2, "h4", "/src/main.c", Severity::Critical),
            ],
            components: vec![
                ComponentRecord {
                    name: "lib".into(),
                    patterns: vec!["+/src/lib/*".into()],
                },
                ComponentRecord {
                    name: "no-tests".into(),
                    patterns: vec!["-/src/test/*".into()],
                },
            ],
        }
    }

    #[test]
    fn tag_visibility_respects_detection_and_fix_times() {
        let store = store();
        let mut scope = QueryScope::default();
        scope.report_filter.run_tag = vec![10];
        let ids: Vec<i64> = store.results(&scope).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        scope.report_filter.run_tag = vec![11];
        let ids: Vec<i64> = store.results(&scope).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn diff_types_partition_by_hash() {
        let store = store();
        let base = |diff_type| QueryScope {
            run_ids: vec![1],
            report_filter: ReportFilter::default(),
            cmp_data: CompareData::from_sides(vec![2], Vec::new(), diff_type),
        };
        let ids = |scope: &QueryScope| -> Vec<i64> {
            store.results(scope).iter().map(|r| r.id).collect()
        };
        assert_eq!(ids(&base(DiffType::New)), vec![5]);
        assert_eq!(ids(&base(DiffType::Resolved)), vec![2, 3]);
        assert_eq!(ids(&base(DiffType::Unresolved)), vec![4]);
    }

    #[test]
    fn unique_mode_folds_hashes() {
        let store = store();
        let mut scope = QueryScope::default();
        assert_eq!(store.results(&scope).len(), 5);
        scope.report_filter.is_unique = true;
        assert_eq!(store.results(&scope).len(), 4);
    }

    #[test]
    fn components_include_and_exclude() {
        let gateway = InMemoryGateway::new(store());
        let rows = gateway
            .get_source_components(&QueryScope::default(), Page::all())
            .unwrap();
        assert_eq!(
            rows,
            vec![
                NameCount { name: "no-tests".into(), count: 4 },
                NameCount { name: "lib".into(), count: 3 },
            ]
        );
    }

    #[test]
    fn file_counts_ignore_own_constraint_but_keep_others() {
        let gateway = InMemoryGateway::new(store());
        let mut scope = QueryScope::default();
        scope.report_filter.filepath = vec!["*/lib/*".into()];
        scope.report_filter.severity = vec![Severity::High];
        let rows = gateway.get_file_counts(&scope, Page::all()).unwrap();
        assert_eq!(rows, vec![NameCount { name: "/src/lib/a.c".into(), count: 2 }]);
    }

    #[test]
    fn date_and_length_predicates() {
        let store = store();
        let mut scope = QueryScope::default();
        scope.report_filter.date.fixed = Some(DateInterval { after: Some(200), before: None });
        assert_eq!(store.results(&scope).len(), 1);
        scope.report_filter.date.fixed = None;
        scope.report_filter.bug_path_length =
            Some(bugview_core::BugPathLengthRange { min: Some(4), max: None });
        assert!(store.results(&scope).is_empty());
    }

    #[test]
    fn run_counts_sorted_and_paged() {
        let gateway = InMemoryGateway::new(store());
        let rows = gateway
            .get_run_report_counts(&QueryScope::default(), &[], Page::first(1))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "nightly");
        assert_eq!(rows[0].count, 3);

        let rows = gateway
            .get_run_report_counts(&QueryScope::default(), &["*ease".to_string()], Page::all())
            .unwrap();
        assert_eq!(rows[0].run_id, 2);
    }

    #[test]
    fn injected_failure_is_returned() {
        let gateway = InMemoryGateway::new(store());
        gateway.set_failure(Some(GatewayError::Timeout("slow".into())));
        let err = gateway.get_run_result_count(&QueryScope::default()).unwrap_err();
        assert!(err.is_retryable());
        gateway.set_failure(None);
        assert_eq!(gateway.get_run_result_count(&QueryScope::default()).unwrap(), 5);
        assert_eq!(gateway.call_count(), 2);
    }
}
