//! Server-enumerated string facets.

use std::time::Duration;

use bugview_core::ReportFilter;

use crate::error::GatewayResult;
use crate::fetch::SearchDebouncer;
use crate::gateway::{NameCount, Page, ReportQueryGateway};
use crate::history::keys;
use crate::query::{QueryScope, ReportQuery};
use crate::selection::SelectMode;
use crate::widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions};

/// Which report field a [`TextFacet`] constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    FilePath,
    CheckerName,
    CheckerMessage,
    SourceComponent,
    ReportHash,
}

impl TextField {
    #[must_use]
    pub const fn url_key(self) -> &'static str {
        match self {
            Self::FilePath => keys::FILEPATH,
            Self::CheckerName => keys::CHECKER_NAME,
            Self::CheckerMessage => keys::CHECKER_MSG,
            Self::SourceComponent => keys::SOURCE_COMPONENT,
            Self::ReportHash => keys::REPORT_HASH,
        }
    }

    #[must_use]
    pub const fn source(self) -> ItemSource {
        match self {
            Self::FilePath | Self::CheckerName | Self::CheckerMessage => ItemSource::ServerSearch,
            Self::SourceComponent => ItemSource::ServerExact,
            Self::ReportHash => ItemSource::FreeForm,
        }
    }

    fn field(self, filter: &mut ReportFilter) -> &mut Vec<String> {
        match self {
            Self::FilePath => &mut filter.filepath,
            Self::CheckerName => &mut filter.checker_name,
            Self::CheckerMessage => &mut filter.checker_msg,
            Self::SourceComponent => &mut filter.component_names,
            Self::ReportHash => &mut filter.report_hash,
        }
    }

    fn list(
        self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        page: Page,
    ) -> GatewayResult<Vec<NameCount>> {
        match self {
            Self::FilePath => gateway.get_file_counts(scope, page),
            Self::CheckerName => gateway.get_checker_counts(scope, page),
            Self::CheckerMessage => gateway.get_checker_msg_counts(scope, page),
            Self::SourceComponent => gateway.get_source_components(scope, page),
            Self::ReportHash => Ok(Vec::new()),
        }
    }
}

/// Multi-select facet over a free string field. Selected values may contain
/// `*` wildcards; the predicate passes them through verbatim.
pub struct TextFacet {
    field: TextField,
    state: FacetState,
}

impl TextFacet {
    #[must_use]
    pub fn new(field: TextField, debounce: Duration) -> Self {
        let state = FacetState::new(SelectMode::Multi);
        let state = if field.source().is_searchable() {
            state.with_debouncer(SearchDebouncer::new(debounce))
        } else {
            state
        };
        Self { field, state }
    }

    #[must_use]
    pub const fn field(&self) -> TextField {
        self.field
    }
}

impl FilterWidget for TextFacet {
    fn url_key(&self) -> &'static str {
        self.field.url_key()
    }

    fn source(&self) -> ItemSource {
        self.field.source()
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
        if self.field == TextField::ReportHash {
            return Ok(options.with_typed_item(Vec::new()));
        }
        let mut scope = scope.clone();
        *self.field.field(&mut scope.report_filter) = options.own_patterns();
        let rows = self.field.list(gateway, &scope, options.page)?;
        let items = rows
            .into_iter()
            .map(|row| Candidate::counted(row.name, row.count))
            .collect();
        Ok(options.with_typed_item(options.retain_requested(items)))
    }

    fn contribute(&self, query: &mut ReportQuery) {
        *self.field.field(&mut query.report_filter) = self.state.selection.values();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_searchable_fields_debounce() {
        let file = TextFacet::new(TextField::FilePath, Duration::from_millis(5));
        assert!(file.state().debouncer.is_some());
        let component = TextFacet::new(TextField::SourceComponent, Duration::from_millis(5));
        assert!(component.state().debouncer.is_none());
    }

    #[test]
    fn contribution_keeps_wildcards() {
        let mut facet = TextFacet::new(TextField::FilePath, Duration::ZERO);
        facet.select("*/lib/*.c", Default::default());
        facet.select("main.c", Default::default());
        let mut query = ReportQuery::default();
        facet.contribute(&mut query);
        assert_eq!(query.report_filter.filepath, vec!["*/lib/*.c", "main.c"]);
    }
}
