//! End-to-end panel scenarios over the fixture report store.

use std::path::Path;
use std::sync::Arc;

use bugview_core::{CompareData, Config, DetectionStatus, DiffType, ReportFilter, Severity};
use bugview_filter::panel::GROUP_COMPARE;
use bugview_filter::{
    ActivationOrigin, ClientContext, FilterError, FilterStateManager, HistoryState,
    InMemoryGateway, ItemMeta, ItemsOptions, Page, ReportQuery, ReportQueryGateway, ReportStore,
    UNMATCHED_ID, keys, standard_panel,
};

fn store() -> ReportStore {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/reports.json");
    ReportStore::load(Path::new(path)).expect("fixture loads")
}

fn panel() -> (Arc<InMemoryGateway>, FilterStateManager) {
    let gateway = Arc::new(InMemoryGateway::new(store()));
    let context = ClientContext::new(Arc::clone(&gateway) as Arc<dyn ReportQueryGateway>, Config::default());
    let panel = standard_panel(context, "reports").expect("standard panel registers");
    (gateway, panel)
}

fn shown(origin: ActivationOrigin) -> (Arc<InMemoryGateway>, FilterStateManager) {
    let (gateway, mut panel) = panel();
    panel.on_show(&HistoryState::new(), origin);
    (gateway, panel)
}

#[test]
fn severity_selection_builds_predicate_and_history() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::SEVERITY, "High", ItemMeta::default()).unwrap();
    panel.select(keys::SEVERITY, "medium", ItemMeta::default()).unwrap();

    assert_eq!(
        panel.report_filter(),
        ReportFilter {
            severity: vec![Severity::High, Severity::Medium],
            ..ReportFilter::default()
        }
    );
    assert!(panel.run_ids().is_empty());
    assert!(panel.cmp_data().is_none());
    assert_eq!(panel.query_string(), "tab=reports&severity=High&severity=Medium");

    let counts: Vec<Option<u64>> = panel
        .widget(keys::SEVERITY)
        .unwrap()
        .selection()
        .items()
        .iter()
        .map(|item| item.meta.count)
        .collect();
    assert_eq!(counts, vec![Some(2), Some(2)]);
}

#[test]
fn compare_tag_alone_yields_cmp_data() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    panel
        .select(keys::RUN_TAG_NEWCHECK, "nightly:v2", ItemMeta::default())
        .unwrap();
    assert_eq!(
        panel.cmp_data(),
        Some(CompareData {
            run_ids: None,
            run_tag: Some(vec![11]),
            diff_type: DiffType::New,
        })
    );
    assert_eq!(panel.query_string(), "tab=reports&run-tag-newcheck=nightly%3Av2");

    panel.select(keys::NEWCHECK, "release", ItemMeta::default()).unwrap();
    panel.clear_facet(keys::RUN_TAG_NEWCHECK).unwrap();
    assert_eq!(
        panel.cmp_data(),
        Some(CompareData {
            run_ids: Some(vec![2]),
            run_tag: None,
            diff_type: DiffType::New,
        })
    );

    panel.clear_facet(keys::NEWCHECK).unwrap();
    assert!(panel.cmp_data().is_none());
}

#[test]
fn diff_type_selects_comparison_side() {
    let (gateway, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::RUN, "nightly", ItemMeta::default()).unwrap();
    panel.select(keys::NEWCHECK, "release", ItemMeta::default()).unwrap();
    let count = |panel: &FilterStateManager| {
        gateway
            .get_run_result_count(&panel.query().scope())
            .unwrap()
    };
    assert_eq!(count(&panel), 2);

    panel.select(keys::DIFF_TYPE, "Resolved", ItemMeta::default()).unwrap();
    assert_eq!(panel.cmp_data().unwrap().diff_type, DiffType::Resolved);
    assert_eq!(count(&panel), 2);

    panel.select(keys::DIFF_TYPE, "unresolved", ItemMeta::default()).unwrap();
    assert_eq!(count(&panel), 1);

    let items = panel.get_items(keys::DIFF_TYPE, ItemsOptions::default()).unwrap();
    let counts: Vec<(String, Option<u64>)> =
        items.into_iter().map(|c| (c.value, c.count)).collect();
    assert_eq!(
        counts,
        vec![
            ("New".to_string(), Some(2)),
            ("Resolved".to_string(), Some(2)),
            ("Unresolved".to_string(), Some(1)),
        ]
    );
}

#[test]
fn user_navigation_applies_defaults_once() {
    let (_, mut panel) = shown(ActivationOrigin::UserNavigation);
    let filter = panel.report_filter();
    assert_eq!(
        filter.detection_status,
        vec![
            DetectionStatus::New,
            DetectionStatus::Reopened,
            DetectionStatus::Unresolved
        ]
    );
    assert!(filter.is_unique);
    assert_eq!(
        panel.query_string(),
        "tab=reports&is-unique=on&detection-status=New&detection-status=Reopened&detection-status=Unresolved"
    );

    // Re-entering from history never re-applies defaults.
    panel.on_history_change(&HistoryState::parse("tab=reports"));
    assert_eq!(panel.report_filter(), ReportFilter::default());
}

#[test]
fn explicit_url_values_override_defaults() {
    let (_, mut panel) = panel();
    panel.on_show(
        &HistoryState::parse("detection-status=Resolved&is-unique=off"),
        ActivationOrigin::UserNavigation,
    );
    let filter = panel.report_filter();
    assert_eq!(filter.detection_status, vec![DetectionStatus::Resolved]);
    assert!(!filter.is_unique);
    assert_eq!(
        panel.history_state().first(keys::IS_UNIQUE),
        Some("off")
    );
}

#[test]
fn deep_links_get_no_defaults_and_resolve_names() {
    let (_, mut panel) = panel();
    let params = HistoryState::parse("tab=reports&run=release&newcheck=nightly&run-tag=nightly%3Av1");
    assert!(panel.on_construct(&params).is_some());

    let query = panel.query();
    assert_eq!(query.run_ids, vec![2]);
    assert_eq!(query.report_filter.run_tag, vec![10]);
    assert!(query.report_filter.detection_status.is_empty());
    assert!(!query.report_filter.is_unique);
    assert_eq!(query.cmp_data().unwrap().run_ids, Some(vec![1]));

    let compare = panel
        .groups()
        .iter()
        .find(|g| g.name == GROUP_COMPARE)
        .unwrap();
    assert!(compare.expanded);
}

#[test]
fn unknown_run_matches_nothing_and_malformed_values_are_dropped() {
    let (gateway, mut panel) = panel();
    panel.on_construct(&HistoryState::parse(
        "tab=reports&run=ghost&severity=Bogus&detection-date=yesterday&min-bug-path-length=x",
    ));
    assert_eq!(
        panel.query(),
        ReportQuery {
            run_ids: vec![UNMATCHED_ID],
            ..ReportQuery::default()
        }
    );
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 0);
    // The unresolved run name survives in history; malformed values do not.
    assert_eq!(panel.query_string(), "tab=reports&run=ghost");
    let ghost = &panel.widget(keys::RUN).unwrap().selection().items()[0];
    assert_eq!(ghost.meta, ItemMeta::with_count(0));
}

#[test]
fn typed_run_name_without_exact_match_selects_nothing() {
    let (gateway, mut panel) = shown(ActivationOrigin::DeepLink);
    let items = panel
        .get_items(keys::RUN, ItemsOptions::search("night", Page::first(10)))
        .unwrap();
    let typed = items.iter().find(|c| c.synthetic).unwrap().clone();
    assert_eq!(typed.value, "night");
    assert!(items.iter().any(|c| c.value == "nightly" && !c.synthetic));

    panel.select(keys::RUN, &typed.value, typed.meta()).unwrap();
    assert_eq!(panel.run_ids(), vec![UNMATCHED_ID]);
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 0);
    let meta = &panel.widget(keys::RUN).unwrap().selection().items()[0].meta;
    assert_eq!(meta.count, Some(0));
    assert!(meta.ids.is_empty());

    panel.deselect(keys::RUN, "night").unwrap();
    panel.select(keys::RUN, "nightly", ItemMeta::default()).unwrap();
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 3);
}

#[test]
fn wildcard_run_name_resolves_to_every_matching_run() {
    let (gateway, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::RUN, "night*", ItemMeta::default()).unwrap();
    assert_eq!(panel.run_ids(), vec![1]);
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 3);

    panel.clear_facet(keys::RUN).unwrap();
    panel.select(keys::RUN, "*e*", ItemMeta::default()).unwrap();
    assert_eq!(panel.run_ids(), vec![2]);
    let meta = &panel.widget(keys::RUN).unwrap().selection().items()[0].meta;
    assert_eq!(meta.count, Some(3));
    assert_eq!(panel.query_string(), "tab=reports&run=*e*");
}

#[test]
fn wildcard_file_path_counts_every_matching_file() {
    let (gateway, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::FILEPATH, "*/lib/*", ItemMeta::default()).unwrap();
    let count = panel.widget(keys::FILEPATH).unwrap().selection().items()[0].meta.count;
    assert_eq!(count, Some(3));
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 3);

    panel.select(keys::SEVERITY, "High", ItemMeta::default()).unwrap();
    let count = panel.widget(keys::FILEPATH).unwrap().selection().items()[0].meta.count;
    assert_eq!(count, Some(2));
}

#[test]
fn ranges_and_dates_round_trip_through_history() {
    let (_, mut panel) = panel();
    panel.on_construct(&HistoryState::parse(
        "tab=reports&detection-date=1970-01-01T00%3A10%3A00..&min-bug-path-length=3&max-bug-path-length=8",
    ));
    let filter = panel.report_filter();
    assert_eq!(filter.date.detected.unwrap().after, Some(600));
    let range = filter.bug_path_length.unwrap();
    assert_eq!((range.min, range.max), (Some(3), Some(8)));
    assert_eq!(
        panel.history_state().first(keys::DETECTION_DATE),
        Some("1970-01-01T00:10:00..")
    );
    assert_eq!(panel.history_state().first(keys::MAX_BUG_PATH_LENGTH), Some("8"));
}

#[test]
fn clear_all_then_notify_restores_default_predicate() {
    let (gateway, mut panel) = shown(ActivationOrigin::UserNavigation);
    panel.select(keys::SEVERITY, "High", ItemMeta::default()).unwrap();
    panel.select(keys::RUN, "nightly", ItemMeta::default()).unwrap();
    panel.select(keys::CHECKER_NAME, "core.*", ItemMeta::default()).unwrap();

    let calls = gateway.call_count();
    panel.clear_all();
    assert_eq!(gateway.call_count(), calls);
    panel.notify_all(&[]);
    assert_eq!(panel.query(), ReportQuery::default());
    assert_eq!(panel.query_string(), "tab=reports");
}

#[test]
fn enum_candidates_cover_every_value() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    let items = panel
        .get_items(keys::SEVERITY, ItemsOptions::default())
        .unwrap();
    let counts: Vec<(&str, u64)> = items
        .iter()
        .map(|c| (c.value.as_str(), c.count.unwrap_or_default()))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Unspecified", 0),
            ("Style", 0),
            ("Low", 1),
            ("Medium", 2),
            ("High", 2),
            ("Critical", 1),
        ]
    );
}

#[test]
fn text_candidates_exclude_own_selection() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    panel
        .select(keys::CHECKER_NAME, "core.DivideZero", ItemMeta::default())
        .unwrap();
    panel.select(keys::SEVERITY, "Medium", ItemMeta::default()).unwrap();

    let items = panel
        .get_items(keys::CHECKER_NAME, ItemsOptions::search("core", Page::first(10)))
        .unwrap();
    let values: Vec<&str> = items.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["core", "core.DivideZero", "core.NullDereference"]);
    assert!(items[0].synthetic);
    assert_eq!(items[1].count, Some(1));
}

#[test]
fn source_components_list_all_matching() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::SOURCE_COMPONENT, "lib", ItemMeta::default()).unwrap();
    assert_eq!(panel.report_filter().component_names, vec!["lib"]);
    let items = panel
        .get_items(keys::SOURCE_COMPONENT, ItemsOptions::default())
        .unwrap();
    let counts: Vec<(&str, Option<u64>)> = items
        .iter()
        .map(|c| (c.value.as_str(), c.count))
        .collect();
    assert_eq!(counts, vec![("lib", Some(3)), ("tests", Some(1))]);
}

#[test]
fn stale_item_fetches_are_rejected() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    let slow = panel
        .begin_items(keys::FILEPATH, ItemsOptions::search("lib", Page::all()))
        .unwrap();
    let fast = panel
        .begin_items(keys::FILEPATH, ItemsOptions::search("main", Page::all()))
        .unwrap();
    let fast_result = panel.execute(&fast).unwrap();
    let slow_result = panel.execute(&slow).unwrap();

    let applied = panel.complete_items(fast, fast_result).unwrap();
    let err = panel.complete_items(slow, slow_result).unwrap_err();
    assert_eq!(err.error_type(), "STALE_FETCH");
    assert!(matches!(err, FilterError::StaleFetch { .. }));
    assert_eq!(panel.widget(keys::FILEPATH).unwrap().candidates(), applied.as_slice());
    assert_eq!(applied[1].value, "/src/main.c");
}

#[test]
fn unique_mode_folds_duplicate_hashes() {
    let (gateway, mut panel) = shown(ActivationOrigin::DeepLink);
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 6);
    panel.select(keys::IS_UNIQUE, "on", ItemMeta::default()).unwrap();
    assert_eq!(gateway.get_run_result_count(&panel.query().scope()).unwrap(), 5);
}

#[test]
fn snapshot_serializes_panel() {
    let (_, mut panel) = shown(ActivationOrigin::DeepLink);
    panel.select(keys::SEVERITY, "High", ItemMeta::default()).unwrap();
    let value = serde_json::to_value(panel.snapshot()).unwrap();
    assert_eq!(value["state"], "ready");
    assert_eq!(value["queryString"], "tab=reports&severity=High");
    assert_eq!(value["query"]["reportFilter"]["severity"][0], 40);
    assert_eq!(value["facets"].as_array().unwrap().len(), 17);
}
