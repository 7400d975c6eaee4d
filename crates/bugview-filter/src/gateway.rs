//! Remote report-query gateway
//!
//! [`ReportQueryGateway`] is the black-box query surface the filter panel
//! talks to. Every call takes the aggregate [`QueryScope`] and returns a
//! [`GatewayResult`]; there are no sentinel failure values.
//!
//! [`ClientContext`] bundles a gateway handle with the configuration and is
//! constructed once per session, then passed to every filter panel.

use std::collections::BTreeMap;
use std::sync::Arc;

use bugview_core::{Config, DetectionStatus, ReviewStatus, Severity};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::query::QueryScope;

/// Pagination for list-valued queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Maximum number of rows; `None` returns everything.
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }

    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    /// Apply this page to an already ordered list.
    #[must_use]
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        let iter = rows.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// `{name, count}` row returned by list-valued count queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub count: u64,
}

/// Per-run report count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReportCount {
    pub run_id: i64,
    pub name: String,
    pub count: u64,
}

/// Per-run-tag report count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTagCount {
    pub tag_id: i64,
    pub run_name: String,
    pub tag: String,
    pub count: u64,
}

impl RunTagCount {
    /// History token for this tag: `run:tag`.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}:{}", self.run_name, self.tag)
    }
}

/// Report-query operations consumed by the filter panel.
///
/// List-valued calls return rows ordered by descending count, then name.
pub trait ReportQueryGateway: Send + Sync {
    /// Number of reports matching the scope.
    fn get_run_result_count(&self, scope: &QueryScope) -> GatewayResult<u64>;

    fn get_severity_counts(&self, scope: &QueryScope) -> GatewayResult<BTreeMap<Severity, u64>>;

    fn get_review_status_counts(
        &self,
        scope: &QueryScope,
    ) -> GatewayResult<BTreeMap<ReviewStatus, u64>>;

    fn get_detection_status_counts(
        &self,
        scope: &QueryScope,
    ) -> GatewayResult<BTreeMap<DetectionStatus, u64>>;

    fn get_file_counts(&self, scope: &QueryScope, page: Page) -> GatewayResult<Vec<NameCount>>;

    fn get_checker_counts(&self, scope: &QueryScope, page: Page) -> GatewayResult<Vec<NameCount>>;

    fn get_checker_msg_counts(
        &self,
        scope: &QueryScope,
        page: Page,
    ) -> GatewayResult<Vec<NameCount>>;

    fn get_source_components(
        &self,
        scope: &QueryScope,
        page: Page,
    ) -> GatewayResult<Vec<NameCount>>;

    /// Runs whose name matches any of `name_patterns` (`*` wildcards; empty
    /// slice matches every run), with their report counts under `scope`.
    fn get_run_report_counts(
        &self,
        scope: &QueryScope,
        name_patterns: &[String],
        page: Page,
    ) -> GatewayResult<Vec<RunReportCount>>;

    /// Run tags whose `run:tag` token matches any of `patterns`, with report
    /// counts under `scope`.
    fn get_run_tags(
        &self,
        scope: &QueryScope,
        patterns: &[String],
        page: Page,
    ) -> GatewayResult<Vec<RunTagCount>>;
}

/// Session-wide handles injected into filter panels.
#[derive(Clone)]
pub struct ClientContext {
    gateway: Arc<dyn ReportQueryGateway>,
    config: Config,
}

impl ClientContext {
    #[must_use]
    pub fn new(gateway: Arc<dyn ReportQueryGateway>, config: Config) -> Self {
        Self { gateway, config }
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn ReportQueryGateway {
        self.gateway.as_ref()
    }

    #[must_use]
    pub fn gateway_handle(&self) -> Arc<dyn ReportQueryGateway> {
        Arc::clone(&self.gateway)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
