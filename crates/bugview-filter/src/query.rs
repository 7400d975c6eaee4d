//! Aggregate report query
//!
//! [`ReportQuery`] is folded from every registered facet's contribution and is
//! never stored on its own. [`QueryScope`] is the immutable snapshot handed to
//! the gateway.

use bugview_core::{CompareData, DiffType, ReportFilter};
use serde::{Deserialize, Serialize};

/// Stand-in id for a selection that resolved to no run or tag. No stored run
/// or tag carries it, so the predicate matches nothing.
pub const UNMATCHED_ID: i64 = -1;

/// Mutable accumulator facets write their predicate into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportQuery {
    /// Baseline run ids (empty means all runs).
    pub run_ids: Vec<i64>,
    pub report_filter: ReportFilter,
    /// Run ids on the comparison side.
    pub compare_run_ids: Vec<i64>,
    /// Run-tag ids on the comparison side.
    pub compare_run_tags: Vec<i64>,
    pub diff_type: DiffType,
}

impl ReportQuery {
    /// Comparison descriptor, present only when a comparison side is selected.
    #[must_use]
    pub fn cmp_data(&self) -> Option<CompareData> {
        CompareData::from_sides(
            self.compare_run_ids.clone(),
            self.compare_run_tags.clone(),
            self.diff_type,
        )
    }

    #[must_use]
    pub fn scope(&self) -> QueryScope {
        QueryScope {
            run_ids: self.run_ids.clone(),
            report_filter: self.report_filter.clone(),
            cmp_data: self.cmp_data(),
        }
    }
}

/// The `(runIds, reportFilter, cmpData)` triple every gateway call takes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryScope {
    pub run_ids: Vec<i64>,
    pub report_filter: ReportFilter,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cmp_data: Option<CompareData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_data_absent_without_sides() {
        let query = ReportQuery {
            diff_type: DiffType::Resolved,
            ..ReportQuery::default()
        };
        assert!(query.cmp_data().is_none());
        assert!(query.scope().cmp_data.is_none());
    }

    #[test]
    fn cmp_data_carries_diff_type() {
        let query = ReportQuery {
            compare_run_ids: vec![4],
            diff_type: DiffType::Unresolved,
            ..ReportQuery::default()
        };
        let cmp = query.cmp_data().unwrap();
        assert_eq!(cmp.run_ids, Some(vec![4]));
        assert_eq!(cmp.run_tag, None);
        assert_eq!(cmp.diff_type, DiffType::Unresolved);
    }
}
