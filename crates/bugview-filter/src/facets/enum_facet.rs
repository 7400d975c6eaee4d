//! Client-enumerated facets: severity, review status, detection status.

use std::collections::BTreeMap;

use bugview_core::{CodedEnum, DetectionStatus, ReportFilter, ReviewStatus, Severity};

use crate::error::GatewayResult;
use crate::gateway::ReportQueryGateway;
use crate::history::keys;
use crate::query::{QueryScope, ReportQuery};
use crate::selection::SelectMode;
use crate::widget::{Candidate, FacetState, FilterWidget, ItemSource, ItemsOptions};

type CountFn<E> = fn(&dyn ReportQueryGateway, &QueryScope) -> GatewayResult<BTreeMap<E, u64>>;
type FieldFn<E> = fn(&mut ReportFilter) -> &mut Vec<E>;

/// Multi-select facet over a fixed enumeration. History values are labels,
/// the predicate holds enum values in selection order.
pub struct EnumFacet<E: CodedEnum> {
    key: &'static str,
    state: FacetState,
    counts: CountFn<E>,
    field: FieldFn<E>,
}

impl<E: CodedEnum> EnumFacet<E> {
    fn build(key: &'static str, counts: CountFn<E>, field: FieldFn<E>) -> Self {
        Self {
            key,
            state: FacetState::new(SelectMode::Multi),
            counts,
            field,
        }
    }

    /// Selected values parsed back into the enum.
    #[must_use]
    pub fn selected(&self) -> Vec<E> {
        self.state
            .selection
            .items()
            .iter()
            .filter_map(|item| E::from_label(&item.value))
            .collect()
    }
}

fn severity_counts(
    gateway: &dyn ReportQueryGateway,
    scope: &QueryScope,
) -> GatewayResult<BTreeMap<Severity, u64>> {
    gateway.get_severity_counts(scope)
}

fn severity_field(filter: &mut ReportFilter) -> &mut Vec<Severity> {
    &mut filter.severity
}

fn review_status_counts(
    gateway: &dyn ReportQueryGateway,
    scope: &QueryScope,
) -> GatewayResult<BTreeMap<ReviewStatus, u64>> {
    gateway.get_review_status_counts(scope)
}

fn review_status_field(filter: &mut ReportFilter) -> &mut Vec<ReviewStatus> {
    &mut filter.review_status
}

fn detection_status_counts(
    gateway: &dyn ReportQueryGateway,
    scope: &QueryScope,
) -> GatewayResult<BTreeMap<DetectionStatus, u64>> {
    gateway.get_detection_status_counts(scope)
}

fn detection_status_field(filter: &mut ReportFilter) -> &mut Vec<DetectionStatus> {
    &mut filter.detection_status
}

impl EnumFacet<Severity> {
    #[must_use]
    pub fn severity() -> Self {
        Self::build(keys::SEVERITY, severity_counts, severity_field)
    }
}

impl EnumFacet<ReviewStatus> {
    #[must_use]
    pub fn review_status() -> Self {
        Self::build(keys::REVIEW_STATUS, review_status_counts, review_status_field)
    }
}

impl EnumFacet<DetectionStatus> {
    #[must_use]
    pub fn detection_status() -> Self {
        Self::build(
            keys::DETECTION_STATUS,
            detection_status_counts,
            detection_status_field,
        )
    }
}

impl<E: CodedEnum + Send> FilterWidget for EnumFacet<E> {
    fn url_key(&self) -> &'static str {
        self.key
    }

    fn source(&self) -> ItemSource {
        ItemSource::ClientEnum
    }

    fn state(&self) -> &FacetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FacetState {
        &mut self.state
    }

    fn canonical_value(&self, raw: &str) -> Option<String> {
        E::from_label(raw).map(|e| e.label().to_string())
    }

    fn fetch_items(
        &self,
        gateway: &dyn ReportQueryGateway,
        scope: &QueryScope,
        options: &ItemsOptions,
    ) -> GatewayResult<Vec<Candidate>> {
        let counts = (self.counts)(gateway, scope)?;
        let items = E::ALL
            .iter()
            .map(|e| Candidate::counted(e.label(), counts.get(e).copied().unwrap_or(0)))
            .collect();
        Ok(options.retain_requested(items))
    }

    fn contribute(&self, query: &mut ReportQuery) {
        *(self.field)(&mut query.report_filter) = self.selected();
    }
}
