//! The filter facet capability set
//!
//! A facet is composed from a shared [`FacetState`] (selection, candidate
//! cache, fetch tracker, optional search debouncer) plus the three things that
//! differ per facet: where its candidates come from ([`FilterWidget::fetch_items`]),
//! how its selection constrains the query ([`FilterWidget::contribute`]) and
//! which history key it owns ([`FilterWidget::url_key`]). Everything else
//! (selection, history round-trip, count refresh) is provided.

use bugview_core::wildcard_match;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::GatewayResult;
use crate::fetch::{FetchTicket, FetchTracker, SearchDebouncer};
use crate::gateway::{Page, ReportQueryGateway};
use crate::history::{HistoryState, UrlEntry};
use crate::query::{QueryScope, ReportQuery};
use crate::selection::{ItemMeta, SelectMode, Selection};

/// A selectable value offered by a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    /// The literal typed search text, offered in addition to real matches.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub synthetic: bool,
}

impl Candidate {
    #[must_use]
    pub fn counted(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count: Some(count),
            id: None,
            synthetic: false,
        }
    }

    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            count: None,
            id: None,
            synthetic: false,
        }
    }

    #[must_use]
    pub fn typed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            count: None,
            id: None,
            synthetic: true,
        }
    }

    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn meta(&self) -> ItemMeta {
        ItemMeta {
            count: self.count,
            ids: self.id.into_iter().collect(),
        }
    }
}

/// Where a facet's candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Small fixed domain, no counts (diff type, uniqueness).
    Fixed,
    /// Small fixed domain with per-value counts from the server (severity, ...).
    ClientEnum,
    /// Server-enumerated values matched exactly.
    ServerExact,
    /// Server-enumerated values with substring search.
    ServerSearch,
    /// User-entered values with no candidate list (dates, hashes, lengths).
    FreeForm,
}

impl ItemSource {
    /// Whether displayed counts depend on the other facets' selections.
    #[must_use]
    pub const fn is_count_sensitive(self) -> bool {
        matches!(self, Self::ClientEnum | Self::ServerExact | Self::ServerSearch)
    }

    #[must_use]
    pub const fn is_searchable(self) -> bool {
        matches!(self, Self::ServerSearch)
    }
}

/// Options for a candidate fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsOptions {
    /// Typed search text.
    pub query: Option<String>,
    /// Restrict the answer to rows matching these values (used by count refresh).
    pub values: Option<Vec<String>>,
    pub page: Page,
}

impl ItemsOptions {
    #[must_use]
    pub fn search(text: impl Into<String>, page: Page) -> Self {
        Self {
            query: Some(text.into()),
            values: None,
            page,
        }
    }

    #[must_use]
    pub fn for_values(values: Vec<String>) -> Self {
        Self {
            query: None,
            values: Some(values),
            page: Page::all(),
        }
    }

    /// Non-empty, trimmed search text.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Wildcard patterns the facet's own field should be constrained to.
    #[must_use]
    pub fn own_patterns(&self) -> Vec<String> {
        if let Some(values) = &self.values {
            return values.clone();
        }
        self.search_text()
            .map(|q| vec![format!("*{q}*")])
            .unwrap_or_default()
    }

    /// Keep only rows matched by one of `values`, when set. Values may hold
    /// `*` wildcards.
    #[must_use]
    pub fn retain_requested(&self, items: Vec<Candidate>) -> Vec<Candidate> {
        match &self.values {
            Some(values) => items
                .into_iter()
                .filter(|c| values.iter().any(|v| wildcard_match(v, &c.value)))
                .collect(),
            None => items,
        }
    }

    /// Prepend the literal search text as a synthetic candidate unless a
    /// real candidate already carries exactly that value.
    #[must_use]
    pub fn with_typed_item(&self, mut items: Vec<Candidate>) -> Vec<Candidate> {
        if self.values.is_none() {
            if let Some(text) = self.search_text() {
                if !items.iter().any(|c| c.value == text) {
                    items.insert(0, Candidate::typed(text));
                }
            }
        }
        items
    }
}

/// Result of a single facet's count refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Refreshed,
    Skipped,
    Failed,
}

/// State every facet carries.
#[derive(Debug)]
pub struct FacetState {
    pub selection: Selection,
    pub candidates: Vec<Candidate>,
    pub tracker: FetchTracker,
    pub debouncer: Option<SearchDebouncer>,
}

impl FacetState {
    #[must_use]
    pub const fn new(mode: SelectMode) -> Self {
        Self {
            selection: Selection::new(mode),
            candidates: Vec::new(),
            tracker: FetchTracker::new(),
            debouncer: None,
        }
    }

    #[must_use]
    pub fn with_debouncer(mut self, debouncer: SearchDebouncer) -> Self {
        self.debouncer = Some(debouncer);
        self
    }
}

/// One filter facet.
pub trait FilterWidget: Send {
    /// Stable facet identifier (its primary history key).
    fn id(&self) -> &'static str {
        self.url_key()
    }

    /// Primary history key.
    fn url_key(&self) -> &'static str;

    /// Every history key this facet writes.
    fn owned_keys(&self) -> Vec<&'static str> {
        vec![self.url_key()]
    }

    fn source(&self) -> ItemSource;

    fn state(&self) -> &FacetState;

    fn state_mut(&mut self) -> &mut FacetState;

    /// Candidates under `scope`, which the manager builds with this facet's
    /// own predicate removed.
    fn fetch_items(
        &self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>>;

    /// Write this facet's predicate into the aggregate query.
    fn contribute(&self, query: &mut ReportQuery);

    /// Canonical form of a user or history supplied value, or `None` if the
    /// value is not acceptable for this facet.
    fn canonical_value(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn selection(&self) -> &Selection {
        &self.state().selection
    }

    fn candidates(&self) -> &[Candidate] {
        &self.state().candidates
    }

    /// Select `value`, keeping `meta` (e.g. a prefetched count). Returns
    /// `true` when the selection changed.
    fn select(&mut self, value: &str, meta: ItemMeta) -> bool {
        let Some(value) = self.canonical_value(value) else {
            debug!(facet = self.id(), value, "ignoring unacceptable filter value");
            return false;
        };
        self.state_mut().selection.select(&value, meta)
    }

    /// Deselect `value`; unknown values are ignored.
    fn deselect(&mut self, value: &str) -> bool {
        let value = self
            .canonical_value(value)
            .unwrap_or_else(|| value.to_string());
        self.state_mut().selection.deselect(&value)
    }

    /// Empty the selection, drop cached candidates and supersede in-flight fetches.
    fn clear(&mut self) {
        let state = self.state_mut();
        state.selection.clear();
        state.candidates.clear();
        state.tracker.invalidate();
        if let Some(debouncer) = state.debouncer.as_mut() {
            debouncer.cancel();
        }
    }

    fn url_state(&self) -> Vec<UrlEntry> {
        let values = self.selection().values();
        vec![(self.url_key(), (!values.is_empty()).then_some(values))]
    }

    /// Replace the selection with what `params` holds for this facet.
    fn init_by_url(&mut self, params: &HistoryState) {
        let key = self.url_key();
        let incoming: Vec<String> = params
            .get(key)
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| {
                let value = self.canonical_value(raw);
                if value.is_none() {
                    debug!(facet = self.id(), key, raw = raw.as_str(), "dropping malformed history value");
                }
                value
            })
            .collect();
        for current in self.selection().values() {
            if !incoming.contains(&current) {
                self.state_mut().selection.deselect(&current);
            }
        }
        for value in &incoming {
            self.state_mut().selection.select(value, ItemMeta::default());
        }
    }

    /// Drop the candidate cache because the aggregate query changed.
    fn invalidate_candidates(&mut self) {
        if self.source().is_count_sensitive() {
            let state = self.state_mut();
            state.candidates.clear();
            state.tracker.invalidate();
        }
    }

    /// Apply a candidate response if `ticket` is still the latest issued.
    fn store_candidates(&mut self, ticket: FetchTicket, items: Vec<Candidate>) -> bool {
        if !self.state().tracker.is_current(ticket) {
            trace!(facet = self.id(), ticket = ticket.seq(), "discarding stale candidates");
            return false;
        }
        self.state_mut().candidates = items;
        true
    }

    /// Re-fetch counts for the selected values under `scope` and reconcile
    /// their cached metadata. A value with `*` wildcards sums every row it
    /// matches and collects all of their ids.
    fn notify(&mut self, gateway: &dyn ReportQueryGateway, scope: &QueryScope) -> NotifyOutcome {
        if !self.source().is_count_sensitive() || self.selection().is_empty() {
            return NotifyOutcome::Skipped;
        }
        let options = ItemsOptions::for_values(self.selection().values());
        match self.fetch_items(gateway, scope, &options) {
            Ok(items) => {
                for item in self.state_mut().selection.items_mut() {
                    let mut count = 0;
                    let mut ids = Vec::new();
                    for found in items
                        .iter()
                        .filter(|c| !c.synthetic && wildcard_match(&item.value, &c.value))
                    {
                        count += found.count.unwrap_or(0);
                        ids.extend(found.id);
                    }
                    item.meta.count = Some(count);
                    item.meta.ids = ids;
                }
                NotifyOutcome::Refreshed
            }
            Err(err) => {
                warn!(facet = self.id(), error = %err, "count refresh failed; keeping stale counts");
                NotifyOutcome::Failed
            }
        }
    }
}
