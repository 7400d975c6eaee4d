//! Fixed-domain single-choice facets: uniqueness and diff type.

use bugview_core::config::parse_flag;
use bugview_core::{CodedEnum, DiffType};

use crate::error::GatewayResult;
use crate::gateway::ReportQueryGateway;
use crate::history::keys;
use crate::query::{QueryScope, ReportQuery};
use crate::selection::SelectMode;
use crate::widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions};

const ON: &str = "on";
const OFF: &str = "off";

/// `is-unique=on|off`. Unique mode folds reports sharing a bug hash.
pub struct UniqueFacet {
    state: FacetState,
}

impl Default for UniqueFacet {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueFacet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FacetState::new(SelectMode::Single),
        }
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.state.selection.contains(ON)
    }
}

impl FilterWidget for UniqueFacet {
    fn url_key(&self) -> &'static str {
        keys::IS_UNIQUE
    }

    fn source(&self) -> ItemSource {
        ItemSource::Fixed
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn canonical_value(&self, raw: &str) -> Option<String> {
        parse_flag(raw).map(|on| (if on { ON } else { OFF }).to_string())
    }

    fn fetch_items(
        &self,
        _gateway: &dyn ReportQueryGateway,
        _scope: &QueryScope,
        _options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        Ok(vec![Candidate::plain(ON), Candidate::plain(OFF)])
    }

    fn contribute(&self, query: &mut ReportQuery) {
        query.report_filter.is_unique = self.is_unique();
    }
}

/// Which side of a comparison to show. Only meaningful with a comparison
/// side selected; otherwise it still contributes but `cmp_data` stays absent.
pub struct DiffTypeFacet {
    state: FacetState,
}

impl Default for DiffTypeFacet {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffTypeFacet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FacetState::new(SelectMode::Single),
        }
    }

    #[must_use]
    pub fn diff_type(&self) -> DiffType {
        self.state
            .selection
            .items()
            .first()
            .and_then(|item| DiffType::from_label(&item.value))
            .unwrap_or_default()
    }
}

impl FilterWidget for DiffTypeFacet {
    fn url_key(&self) -> &'static str {
        keys::DIFF_TYPE
    }

    fn source(&self) -> ItemSource {
        ItemSource::Fixed
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn canonical_value(&self, raw: &str) -> Option<String> {
        DiffType::from_label(raw).map(|d| d.label().to_string())
    }

    /// Counts per diff type when a comparison is active, plain labels otherwise.
    fn fetch_items(
        &self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        let mut items = Vec::with_capacity(DiffType::ALL.len());
        for diff_type in DiffType::ALL {
            let item = if scope.cmp_data.is_some() {
                let mut scope = scope.clone();
                if let Some(cmp) = scope.cmp_data.as_mut() {
                    cmp.diff_type = *diff_type;
                }
                Candidate::counted(diff_type.label(), gateway.get_run_result_count(&scope)?)
            } else {
                Candidate::plain(diff_type.label())
            };
            items.push(item);
        }
        Ok(options.retain_requested(items))
    }

    fn contribute(&self, query: &mut ReportQuery) {
        query.diff_type = self.diff_type();
    }
}
