//! Run and run-tag facets, on the baseline or the comparison side.
//!
//! History stores names (`nightly`, `nightly:v1.2`); the query needs ids.
//! Ids arrive as candidate metadata on selection or through a count refresh.
//! A value with `*` wildcards resolves to every run or tag it matches. A
//! selection that resolves to no id contributes [`UNMATCHED_ID`], so the
//! query matches nothing instead of every run.

use std::time::Duration;

use crate::error::GatewayResult;
use crate::fetch::SearchDebouncer;
use crate::gateway::ReportQueryGateway;
use crate::history::keys;
use crate::query::{QueryScope, ReportQuery, UNMATCHED_ID};
use crate::selection::{SelectMode, Selection};
use crate::widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Baseline,
    Compare,
}

/// Ids the selection constrains the query to. Empty only when nothing is
/// selected.
fn constrained_ids(selection: &Selection) -> Vec<i64> {
    let ids = selection.resolved_ids();
    if ids.is_empty() && !selection.is_empty() {
        return vec![UNMATCHED_ID];
    }
    ids
}

pub struct RunFacet {
    side: Side,
    state: FacetState,
}

impl RunFacet {
    #[must_use]
    pub fn new(side: Side, debounce: Duration) -> Self {
        Self {
            side,
            state: FacetState::new(SelectMode::Multi)
                .with_debouncer(SearchDebouncer::new(debounce)),
        }
    }
}

impl FilterWidget for RunFacet {
    fn url_key(&self) -> &'static str {
        match self.side {
            Side::Baseline => keys::RUN,
            Side::Compare => keys::NEWCHECK,
        }
    }

    fn source(&self) -> ItemSource {
        ItemSource::ServerSearch
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn fetch_items(
        &self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        let rows = gateway.get_run_report_counts(scope, &options.own_patterns(), options.page)?;
        let items = rows
            .into_iter()
            .map(|row| Candidate::counted(row.name, row.count).with_id(row.run_id))
            .collect();
        Ok(options.with_typed_item(options.retain_requested(items)))
    }

    fn contribute(&self, query: &mut ReportQuery) {
        let ids = constrained_ids(&self.state.selection);
        match self.side {
            Side::Baseline => query.run_ids = ids,
            Side::Compare => query.compare_run_ids = ids,
        }
    }
}

pub struct RunTagFacet {
    side: Side,
    state: FacetState,
}

impl RunTagFacet {
    #[must_use]
    pub fn new(side: Side, debounce: Duration) -> Self {
        Self {
            side,
            state: FacetState::new(SelectMode::Multi)
                .with_debouncer(SearchDebouncer::new(debounce)),
        }
    }
}

impl FilterWidget for RunTagFacet {
    fn url_key(&self) -> &'static str {
        match self.side {
            Side::Baseline => keys::RUN_TAG,
            Side::Compare => keys::RUN_TAG_NEWCHECK,
        }
    }

    fn source(&self) -> ItemSource {
        ItemSource::ServerSearch
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    /// Tags are `run:tag`; both halves must be present.
    fn canonical_value(&self, raw: &str) -> Option<String> {
        let (run, tag) = raw.trim().split_once(':')?;
        let (run, tag) = (run.trim(), tag.trim());
        (!run.is_empty() && !tag.is_empty()).then(|| format!("{run}:{tag}"))
    }

    fn fetch_items(
        &self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        let rows = gateway.get_run_tags(scope, &options.own_patterns(), options.page)?;
        let items = rows
            .into_iter()
            .map(|row| Candidate::counted(row.token(), row.count).with_id(row.tag_id))
            .collect();
        Ok(options.with_typed_item(options.retain_requested(items)))
    }

    fn contribute(&self, query: &mut ReportQuery) {
        let ids = constrained_ids(&self.state.selection);
        match self.side {
            Side::Baseline => query.report_filter.run_tag = ids,
            Side::Compare => query.compare_run_tags = ids,
        }
    }
}
