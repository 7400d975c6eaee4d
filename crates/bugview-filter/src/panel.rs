//! The standard report filter panel layout.

use crate::error::FilterResult;
use crate::facets::{
    BugPathLengthFacet, DateFacet, DateKind, DiffTypeFacet, EnumFacet, RunFacet, RunTagFacet,
    Side, TextFacet, TextField, UniqueFacet,
};
use crate::gateway::ClientContext;
use crate::history::keys;
use crate::manager::{FilterStateManager, FilterToggle};

pub const GROUP_BASELINE: &str = "baseline";
pub const GROUP_COMPARE: &str = "compare";
pub const GROUP_REPORT: &str = "report";
pub const GROUP_DATES: &str = "dates";

/// Build a manager with every report facet registered and grouped.
///
/// The comparison group starts collapsed; its facets still contribute to the
/// query but are not refreshed until the group is expanded.
pub fn standard_panel(
    context: ClientContext,
    tab: impl Into<String>,
) -> FilterResult<FilterStateManager> {
    let debounce = context.config().search_debounce();
    let mut manager = FilterStateManager::new(context).with_tab(tab);

    manager.register(Box::new(RunFacet::new(Side::Baseline, debounce)))?;
    manager.register(Box::new(RunTagFacet::new(Side::Baseline, debounce)))?;
    manager.register(Box::new(RunFacet::new(Side::Compare, debounce)))?;
    manager.register(Box::new(RunTagFacet::new(Side::Compare, debounce)))?;
    manager.register(Box::new(DiffTypeFacet::new()))?;

    manager.register(Box::new(UniqueFacet::new()))?;
    manager.register(Box::new(EnumFacet::review_status()))?;
    manager.register(Box::new(EnumFacet::detection_status()))?;
    manager.register(Box::new(EnumFacet::severity()))?;
    manager.register(Box::new(BugPathLengthFacet::new()))?;
    manager.register(Box::new(DateFacet::new(DateKind::Detection)))?;
    manager.register(Box::new(DateFacet::new(DateKind::Fix)))?;
    for field in [
        TextField::FilePath,
        TextField::SourceComponent,
        TextField::CheckerName,
        TextField::CheckerMessage,
        TextField::ReportHash,
    ] {
        manager.register(Box::new(TextFacet::new(field, debounce)))?;
    }

    manager.register_group(FilterToggle::new(GROUP_BASELINE, &[keys::RUN, keys::RUN_TAG]))?;
    manager.register_group(
        FilterToggle::new(
            GROUP_COMPARE,
            &[keys::NEWCHECK, keys::RUN_TAG_NEWCHECK, keys::DIFF_TYPE],
        )
        .collapsed(),
    )?;
    manager.register_group(FilterToggle::new(
        GROUP_REPORT,
        &[
            keys::IS_UNIQUE,
            keys::REVIEW_STATUS,
            keys::DETECTION_STATUS,
            keys::SEVERITY,
            BugPathLengthFacet::ID,
            keys::FILEPATH,
            keys::SOURCE_COMPONENT,
            keys::CHECKER_NAME,
            keys::CHECKER_MSG,
            keys::REPORT_HASH,
        ],
    ))?;
    manager.register_group(FilterToggle::new(
        GROUP_DATES,
        &[keys::DETECTION_DATE, keys::FIX_DATE],
    ))?;
    Ok(manager)
}
