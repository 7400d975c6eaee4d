//! Single-valued range facets: detection date, fix date, bug-path length.

use bugview_core::{BugPathLengthRange, DateInterval};

use crate::error::GatewayResult;
use crate::gateway::ReportQueryGateway;
use crate::history::{HistoryState, UrlEntry, keys};
use crate::query::{QueryScope, ReportQuery};
use crate::selection::{ItemMeta, SelectMode};
use crate::widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Detection,
    Fix,
}

/// Date interval facet, encoded in history as `after..before`.
pub struct DateFacet {
    kind: DateKind,
    state: FacetState,
}

impl DateFacet {
    #[must_use]
    pub const fn new(kind: DateKind) -> Self {
        Self {
            kind,
            state: FacetState::new(SelectMode::Single),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Option<DateInterval> {
        self.state
            .selection
            .items()
            .first()
            .and_then(|item| DateInterval::parse(&item.value).ok())
    }
}

impl FilterWidget for DateFacet {
    fn url_key(&self) -> &'static str {
        match self.kind {
            DateKind::Detection => keys::DETECTION_DATE,
            DateKind::Fix => keys::FIX_DATE,
        }
    }

    fn source(&self) -> ItemSource {
        ItemSource::FreeForm
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn canonical_value(&self, raw: &str) -> Option<String> {
        DateInterval::parse(raw.trim())
            .ok()
            .filter(|interval| !interval.is_open())
            .map(|interval| interval.encode())
    }

    fn fetch_items(
        &self,
        _gateway: &dyn ReportQueryGateway,
        _scope: &QueryScope,
        _options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        Ok(Vec::new())
    }

    fn contribute(&self, query: &mut ReportQuery) {
        let interval = self.interval();
        match self.kind {
            DateKind::Detection => query.report_filter.date.detected = interval,
            DateKind::Fix => query.report_filter.date.fixed = interval,
        }
    }
}

/// Bug-path length bounds. Held internally as one `min:max` token and
/// written to history as two separate keys.
pub struct BugPathLengthFacet {
    state: FacetState,
}

impl Default for BugPathLengthFacet {
    fn default() -> Self {
        Self::new()
    }
}

impl BugPathLengthFacet {
    pub const ID: &'static str = "bug-path-length";

    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FacetState::new(SelectMode::Single),
        }
    }

    fn parse_token(token: &str) -> Option<BugPathLengthRange> {
        let (min, max) = token.split_once(':')?;
        let bound = |s: &str| -> Option<Option<u32>> {
            let s = s.trim();
            if s.is_empty() {
                Some(None)
            } else {
                s.parse().ok().map(Some)
            }
        };
        let range = BugPathLengthRange::new(bound(min)?, bound(max)?).ok()?;
        (range.min.is_some() || range.max.is_some()).then_some(range)
    }

    fn token(range: BugPathLengthRange) -> String {
        let side = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        format!("{}:{}", side(range.min), side(range.max))
    }

    #[must_use]
    pub fn range(&self) -> Option<BugPathLengthRange> {
        self.state
            .selection
            .items()
            .first()
            .and_then(|item| Self::parse_token(&item.value))
    }
}

impl FilterWidget for BugPathLengthFacet {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn url_key(&self) -> &'static str {
        keys::MIN_BUG_PATH_LENGTH
    }

    fn owned_keys(&self) -> Vec<&'static str> {
        vec![keys::MIN_BUG_PATH_LENGTH, keys::MAX_BUG_PATH_LENGTH]
    }

    fn source(&self) -> ItemSource {
        ItemSource::FreeForm
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn canonical_value(&self, raw: &str) -> Option<String> {
        Self::parse_token(raw.trim()).map(Self::token)
    }

    fn fetch_items(
        &self,
        _gateway: &dyn ReportQueryGateway,
        _scope: &QueryScope,
        _options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        Ok(Vec::new())
    }

    fn contribute(&self, query: &mut ReportQuery) {
        query.report_filter.bug_path_length = self.range();
    }

    fn url_state(&self) -> Vec<UrlEntry> {
        let range = self.range().unwrap_or_default();
        let entry = |v: Option<u32>| v.map(|n| vec![n.to_string()]);
        vec![
            (keys::MIN_BUG_PATH_LENGTH, entry(range.min)),
            (keys::MAX_BUG_PATH_LENGTH, entry(range.max)),
        ]
    }

    fn init_by_url(&mut self, params: &HistoryState) {
        let min = params.first(keys::MIN_BUG_PATH_LENGTH).unwrap_or_default();
        let max = params.first(keys::MAX_BUG_PATH_LENGTH).unwrap_or_default();
        self.state.selection.clear();
        if min.is_empty() && max.is_empty() {
            return;
        }
        match self.canonical_value(&format!("{min}:{max}")) {
            Some(token) => {
                self.state.selection.select(&token, ItemMeta::default());
            }
            None => tracing::debug!(min, max, "dropping malformed bug path length bounds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_values_are_canonicalized() {
        let mut facet = DateFacet::new(DateKind::Detection);
        assert!(facet.select("2024-01-01..", ItemMeta::default()));
        assert_eq!(facet.selection().values(), vec!["2024-01-01T00:00:00.."]);
        assert!(!facet.select("..", ItemMeta::default()));
        assert!(!facet.select("garbage", ItemMeta::default()));

        let mut query = ReportQuery::default();
        facet.contribute(&mut query);
        let detected = query.report_filter.date.detected.unwrap();
        assert!(detected.after.is_some());
        assert!(detected.before.is_none());
        assert!(query.report_filter.date.fixed.is_none());
    }

    #[test]
    fn bug_path_length_splits_into_two_keys() {
        let mut facet = BugPathLengthFacet::new();
        let params = HistoryState::parse("min-bug-path-length=2&max-bug-path-length=9");
        facet.init_by_url(&params);
        assert_eq!(facet.range(), Some(BugPathLengthRange { min: Some(2), max: Some(9) }));

        let state = facet.url_state();
        assert_eq!(state[0], (keys::MIN_BUG_PATH_LENGTH, Some(vec!["2".to_string()])));
        assert_eq!(state[1], (keys::MAX_BUG_PATH_LENGTH, Some(vec!["9".to_string()])));
    }

    #[test]
    fn bug_path_length_rejects_inverted_bounds() {
        let mut facet = BugPathLengthFacet::new();
        facet.init_by_url(&HistoryState::parse("min-bug-path-length=9&max-bug-path-length=2"));
        assert!(facet.range().is_none());
        assert_eq!(facet.url_state()[0].1, None);
    }

    #[test]
    fn bug_path_length_open_side() {
        let mut facet = BugPathLengthFacet::new();
        facet.init_by_url(&HistoryState::parse("max-bug-path-length=4"));
        assert_eq!(facet.selection().values(), vec![":4"]);
        assert_eq!(facet.url_state()[0].1, None);
    }
}
