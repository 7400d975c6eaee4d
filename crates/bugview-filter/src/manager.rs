//! Filter state manager
//!
//! Owns one panel's facets, derives the aggregate query from their
//! contributions, fans out count refreshes after every mutation and keeps the
//! serialized history state in sync.
//!
//! Lifecycle: `Uninitialized → Initializing → Ready`. A panel initializes on
//! first visibility ([`FilterStateManager::on_show`]) or at construction when
//! the URL's `tab` names it ([`FilterStateManager::on_construct`]); after that
//! history changes re-apply the URL without defaults.

use std::sync::Arc;
use std::time::Instant;

use bugview_core::{CodedEnum, CompareData, ReportFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FilterError, FilterResult, GatewayResult};
use crate::fetch::FetchTicket;
use crate::gateway::{ClientContext, Page, ReportQueryGateway};
use crate::history::{HistoryState, keys};
use crate::query::{QueryScope, ReportQuery};
use crate::selection::{ItemMeta, SelectedItem};
use crate::widget::{Candidate, FilterWidget, ItemsOptions, NotifyOutcome};

/// A named, collapsible group of facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterToggle {
    pub name: String,
    pub members: Vec<String>,
    pub expanded: bool,
}

impl FilterToggle {
    #[must_use]
    pub fn new(name: impl Into<String>, members: &[&str]) -> Self {
        Self {
            name: name.into(),
            members: members.iter().map(|m| (*m).to_string()).collect(),
            expanded: true,
        }
    }

    #[must_use]
    pub const fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Uninitialized,
    Initializing,
    Ready,
}

/// How the panel was reached. Only user navigation gets default selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationOrigin {
    UserNavigation,
    DeepLink,
}

/// Outcome tally of one notification round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySummary {
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl NotifySummary {
    fn record(&mut self, outcome: NotifyOutcome) {
        match outcome {
            NotifyOutcome::Refreshed => self.refreshed += 1,
            NotifyOutcome::Skipped => self.skipped += 1,
            NotifyOutcome::Failed => self.failed += 1,
        }
    }
}

/// A candidate fetch that has been issued but not applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub facet: &'static str,
    pub ticket: FetchTicket,
    pub scope: QueryScope,
    pub options: ItemsOptions,
}

/// Serializable view of one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetSnapshot {
    pub id: &'static str,
    pub keys: Vec<&'static str>,
    pub collapsed: bool,
    pub selected: Vec<SelectedItem>,
    pub candidates: Vec<Candidate>,
}

/// Serializable view of the whole panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSnapshot {
    pub state: PanelState,
    pub query: QueryScope,
    pub query_string: String,
    pub facets: Vec<FacetSnapshot>,
}

pub struct FilterStateManager {
    context: ClientContext,
    tab: Option<String>,
    widgets: Vec<Box<dyn FilterWidget>>,
    groups: Vec<FilterToggle>,
    state: PanelState,
    history: HistoryState,
}

impl std::fmt::Debug for FilterStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStateManager")
            .field("tab", &self.tab)
            .field("widgets", &self.widgets.iter().map(|w| w.id()).collect::<Vec<_>>())
            .field("groups", &self.groups)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FilterStateManager {
    #[must_use]
    pub fn new(context: ClientContext) -> Self {
        Self {
            context,
            tab: None,
            widgets: Vec::new(),
            groups: Vec::new(),
            state: PanelState::Uninitialized,
            history: HistoryState::new(),
        }
    }

    /// Name the tab this panel lives in; it is written under the `tab` key.
    #[must_use]
    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    #[must_use]
    pub const fn context(&self) -> &ClientContext {
        &self.context
    }

    #[must_use]
    pub const fn state(&self) -> PanelState {
        self.state
    }

    #[must_use]
    pub fn tab(&self) -> Option<&str> {
        self.tab.as_deref()
    }

    // -- registration ------------------------------------------------------

    /// Register a facet. Its id and history keys must not collide with any
    /// facet already registered, nor with the reserved `tab` key.
    pub fn register(&mut self, widget: Box<dyn FilterWidget>) -> FilterResult<()> {
        for key in widget.owned_keys() {
            if key == keys::TAB {
                return Err(FilterError::DuplicateKey {
                    key: key.to_string(),
                    owner: "panel".to_string(),
                });
            }
            if let Some(owner) = self
                .widgets
                .iter()
                .find(|w| w.id() == widget.id() || w.owned_keys().contains(&key))
            {
                return Err(FilterError::DuplicateKey {
                    key: key.to_string(),
                    owner: owner.id().to_string(),
                });
            }
        }
        debug!(facet = widget.id(), "registered filter facet");
        self.widgets.push(widget);
        Ok(())
    }

    /// Register a group. Every member must already be registered.
    pub fn register_group(&mut self, group: FilterToggle) -> FilterResult<()> {
        if let Some(missing) = group.members.iter().find(|m| self.position(m).is_err()) {
            return Err(FilterError::UnknownFacet(missing.clone()));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Expand or collapse a group. Expanding refreshes the members' counts,
    /// which were skipped while collapsed.
    pub fn set_group_expanded(&mut self, name: &str, expanded: bool) -> FilterResult<NotifySummary> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| FilterError::UnknownGroup(name.to_string()))?;
        let was_expanded = std::mem::replace(&mut group.expanded, expanded);
        let members = group.members.clone();
        let mut summary = NotifySummary::default();
        if expanded && !was_expanded && self.state == PanelState::Ready {
            for member in &members {
                let idx = self.position(member)?;
                summary.record(self.refresh_at(idx));
            }
        }
        Ok(summary)
    }

    #[must_use]
    pub fn groups(&self) -> &[FilterToggle] {
        &self.groups
    }

    fn is_collapsed(&self, id: &str) -> bool {
        self.groups
            .iter()
            .any(|g| !g.expanded && g.members.iter().any(|m| m == id))
    }

    /// Expand collapsed groups holding a selection, so restored run and tag
    /// names get resolved by the following refresh.
    fn expand_active_groups(&mut self) {
        let active: Vec<&'static str> = self
            .widgets
            .iter()
            .filter(|w| !w.selection().is_empty())
            .map(|w| w.id())
            .collect();
        for group in self.groups.iter_mut().filter(|g| !g.expanded) {
            if group.members.iter().any(|m| active.contains(&m.as_str())) {
                debug!(group = group.name.as_str(), "expanding group with active filters");
                group.expanded = true;
            }
        }
    }

    fn position(&self, id: &str) -> FilterResult<usize> {
        self.widgets
            .iter()
            .position(|w| w.id() == id)
            .ok_or_else(|| FilterError::UnknownFacet(id.to_string()))
    }

    pub fn widget(&self, id: &str) -> FilterResult<&dyn FilterWidget> {
        let idx = self.position(id)?;
        Ok(self.widgets[idx].as_ref())
    }

    pub fn widgets(&self) -> impl Iterator<Item = &dyn FilterWidget> {
        self.widgets.iter().map(|w| &**w)
    }

    // -- aggregate query ---------------------------------------------------

    fn fold(&self, skip: Option<&str>) -> ReportQuery {
        let mut query = ReportQuery::default();
        for widget in self.widgets.iter().filter(|w| Some(w.id()) != skip) {
            widget.contribute(&mut query);
        }
        query
    }

    /// The aggregate query over every facet.
    #[must_use]
    pub fn query(&self) -> ReportQuery {
        self.fold(None)
    }

    /// Scope for fetching `id`'s candidates: every facet except `id` itself.
    #[must_use]
    pub fn scope_excluding(&self, id: &str) -> QueryScope {
        self.fold(Some(id)).scope()
    }

    #[must_use]
    pub fn report_filter(&self) -> ReportFilter {
        self.query().report_filter
    }

    #[must_use]
    pub fn run_ids(&self) -> Vec<i64> {
        self.query().run_ids
    }

    #[must_use]
    pub fn cmp_data(&self) -> Option<CompareData> {
        self.query().cmp_data()
    }

    // -- mutation ----------------------------------------------------------

    /// Select `value` on facet `id` and refresh every other facet.
    ///
    /// Without metadata the facet's own entry is looked up first so that
    /// run and tag names resolve to ids before the others are refreshed.
    pub fn select(&mut self, id: &str, value: &str, meta: ItemMeta) -> FilterResult<NotifySummary> {
        let idx = self.position(id)?;
        let widget = &mut self.widgets[idx];
        let needs_lookup = meta.is_empty();
        widget.select(value, meta);
        if needs_lookup && widget.source().is_count_sensitive() {
            self.refresh_at(idx);
        }
        Ok(self.notify_all(&[id]))
    }

    pub fn deselect(&mut self, id: &str, value: &str) -> FilterResult<NotifySummary> {
        let idx = self.position(id)?;
        self.widgets[idx].deselect(value);
        Ok(self.notify_all(&[id]))
    }

    pub fn clear_facet(&mut self, id: &str) -> FilterResult<NotifySummary> {
        let idx = self.position(id)?;
        self.widgets[idx].clear();
        Ok(self.notify_all(&[id]))
    }

    /// Clear every facet. Counts are not refreshed; follow with
    /// [`FilterStateManager::notify_all`] when the panel stays visible.
    pub fn clear_all(&mut self) {
        for widget in &mut self.widgets {
            widget.clear();
        }
        self.sync_history();
    }

    fn refresh_at(&mut self, idx: usize) -> NotifyOutcome {
        let gateway: Arc<dyn ReportQueryGateway> = self.context.gateway_handle();
        let scope = self.scope_excluding(self.widgets[idx].id());
        self.widgets[idx].notify(gateway.as_ref(), &scope)
    }

    /// Refresh counts on every facet not in `except` and not in a collapsed
    /// group, then re-serialize history.
    pub fn notify_all(&mut self, except: &[&str]) -> NotifySummary {
        let mut summary = NotifySummary::default();
        for idx in 0..self.widgets.len() {
            let id = self.widgets[idx].id();
            if except.contains(&id) {
                summary.skipped += 1;
                continue;
            }
            self.widgets[idx].invalidate_candidates();
            if self.is_collapsed(id) {
                summary.skipped += 1;
                continue;
            }
            summary.record(self.refresh_at(idx));
        }
        self.sync_history();
        debug!(
            refreshed = summary.refreshed,
            skipped = summary.skipped,
            failed = summary.failed,
            "filter counts refreshed"
        );
        summary
    }

    // -- history -----------------------------------------------------------

    fn defaults_for(&self, params: &HistoryState) -> HistoryState {
        let config = self.context.config();
        let mut params = params.clone();
        let registered = |key: &str| self.widgets.iter().any(|w| w.owned_keys().contains(&key));
        if registered(keys::DETECTION_STATUS)
            && !params.contains_key(keys::DETECTION_STATUS)
            && !config.default_detection_statuses.is_empty()
        {
            let labels = config
                .default_detection_statuses
                .iter()
                .map(|s| s.label().to_string())
                .collect();
            params.set(keys::DETECTION_STATUS, Some(labels));
        }
        if registered(keys::IS_UNIQUE) && !params.contains_key(keys::IS_UNIQUE) && config.default_unique {
            params.insert_one(keys::IS_UNIQUE, "on");
        }
        params
    }

    /// Load every facet from `params` and refresh counts.
    ///
    /// Defaults apply only on the first initialization, only for user
    /// navigation and only to keys `params` does not set.
    pub fn init_all(&mut self, params: &HistoryState, origin: ActivationOrigin) -> NotifySummary {
        let first = self.state == PanelState::Uninitialized;
        self.state = PanelState::Initializing;
        let params = if first && origin == ActivationOrigin::UserNavigation {
            self.defaults_for(params)
        } else {
            params.clone()
        };
        for widget in &mut self.widgets {
            widget.init_by_url(&params);
        }
        self.expand_active_groups();
        let summary = self.notify_all(&[]);
        self.state = PanelState::Ready;
        info!(tab = self.tab.as_deref(), ?origin, first, "filter panel initialized");
        summary
    }

    /// Initialize at construction if the URL targets this panel's tab.
    pub fn on_construct(&mut self, params: &HistoryState) -> Option<NotifySummary> {
        let tab = self.tab.as_deref()?;
        if self.state != PanelState::Uninitialized || params.first(keys::TAB) != Some(tab) {
            return None;
        }
        Some(self.init_all(params, ActivationOrigin::DeepLink))
    }

    /// Initialize on first visibility; later calls are no-ops.
    pub fn on_show(&mut self, params: &HistoryState, origin: ActivationOrigin) -> Option<NotifySummary> {
        if self.state != PanelState::Uninitialized {
            return None;
        }
        Some(self.init_all(params, origin))
    }

    /// Re-apply navigation state. Ignored before the first initialization
    /// and when the URL belongs to another tab.
    pub fn on_history_change(&mut self, params: &HistoryState) -> Option<NotifySummary> {
        if self.state != PanelState::Ready {
            debug!(state = ?self.state, "ignoring history change before initialization");
            return None;
        }
        if let (Some(ours), Some(theirs)) = (self.tab.as_deref(), params.first(keys::TAB)) {
            if ours != theirs {
                return None;
            }
        }
        Some(self.init_all(params, ActivationOrigin::DeepLink))
    }

    fn sync_history(&mut self) {
        let mut history = HistoryState::new();
        if let Some(tab) = &self.tab {
            history.insert_one(keys::TAB, tab.clone());
        }
        for widget in &self.widgets {
            for (key, values) in widget.url_state() {
                history.set(key, values);
            }
        }
        self.history = history;
    }

    #[must_use]
    pub const fn history_state(&self) -> &HistoryState {
        &self.history
    }

    #[must_use]
    pub fn query_string(&self) -> String {
        self.history.to_query_string()
    }

    // -- candidates --------------------------------------------------------

    /// Issue a ticketed fetch for `id`'s candidates. Any fetch issued earlier
    /// for the same facet becomes stale.
    pub fn begin_items(&self, id: &str, options: ItemsOptions) -> FilterResult<PendingFetch> {
        let widget = self.widget(id)?;
        Ok(PendingFetch {
            facet: widget.id(),
            ticket: widget.state().tracker.issue(),
            scope: self.scope_excluding(id),
            options,
        })
    }

    /// Run the gateway call for a pending fetch.
    pub fn execute(&self, pending: &PendingFetch) -> FilterResult<GatewayResult<Vec<Candidate>>> {
        let widget = self.widget(pending.facet)?;
        Ok(widget.fetch_items(self.context.gateway(), &pending.scope, &pending.options))
    }

    /// Apply a fetch result. Results for superseded tickets are discarded
    /// with [`FilterError::StaleFetch`]; gateway failures leave the cache as is.
    pub fn complete_items(
        &mut self,
        pending: PendingFetch,
        result: GatewayResult<Vec<Candidate>>,
    ) -> FilterResult<Vec<Candidate>> {
        let idx = self.position(pending.facet)?;
        let items = result.inspect_err(|err| {
            warn!(facet = pending.facet, error = %err, "candidate fetch failed");
        })?;
        if self.widgets[idx].store_candidates(pending.ticket, items.clone()) {
            Ok(items)
        } else {
            Err(FilterError::StaleFetch {
                facet: pending.facet.to_string(),
                ticket: pending.ticket.seq(),
            })
        }
    }

    /// Fetch and store `id`'s candidates.
    pub fn get_items(&mut self, id: &str, options: ItemsOptions) -> FilterResult<Vec<Candidate>> {
        let pending = self.begin_items(id, options)?;
        let result = self.execute(&pending)?;
        self.complete_items(pending, result)
    }

    /// Record a keystroke in `id`'s search box.
    pub fn type_search(&mut self, id: &str, text: &str, now: Instant) -> FilterResult<()> {
        let idx = self.position(id)?;
        let debouncer = self.widgets[idx]
            .state_mut()
            .debouncer
            .as_mut()
            .ok_or_else(|| FilterError::SearchUnsupported(id.to_string()))?;
        debouncer.keystroke(text, now);
        Ok(())
    }

    /// Run every search whose quiet period has elapsed at `now`.
    pub fn poll_searches(&mut self, now: Instant) -> Vec<(&'static str, FilterResult<Vec<Candidate>>)> {
        let page = Page::first(self.context.config().items_page_size);
        let due: Vec<(&'static str, String)> = self
            .widgets
            .iter_mut()
            .filter_map(|w| {
                let id = w.id();
                let text = w.state_mut().debouncer.as_mut()?.poll(now)?;
                Some((id, text))
            })
            .collect();
        due.into_iter()
            .map(|(id, text)| (id, self.get_items(id, ItemsOptions::search(text, page))))
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            state: self.state,
            query: self.query().scope(),
            query_string: self.query_string(),
            facets: self
                .widgets
                .iter()
                .map(|w| FacetSnapshot {
                    id: w.id(),
                    keys: w.owned_keys(),
                    collapsed: self.is_collapsed(w.id()),
                    selected: w.selection().items().to_vec(),
                    candidates: w.candidates().to_vec(),
                })
                .collect(),
        }
    }
}
