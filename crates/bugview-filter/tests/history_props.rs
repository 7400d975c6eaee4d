//! Property tests for selection and history state.

use std::sync::Arc;

use bugview_core::Config;
use bugview_filter::{
    ActivationOrigin, ClientContext, FilterStateManager, HistoryState, InMemoryGateway, ItemMeta,
    ReportQueryGateway, ReportStore, keys, standard_panel,
};
use proptest::prelude::*;

const SEVERITIES: [&str; 6] = ["Unspecified", "Style", "Low", "Medium", "High", "Critical"];
const REVIEW: [&str; 4] = ["Unreviewed", "Confirmed bug", "False positive", "Intentional"];
const CHECKERS: [&str; 4] = [
    "core.DivideZero",
    "core.NullDereference",
    "deadcode.DeadStores",
    "unix.*",
];

fn panel() -> FilterStateManager {
    let gateway: Arc<dyn ReportQueryGateway> = Arc::new(InMemoryGateway::new(ReportStore::default()));
    let mut panel = standard_panel(ClientContext::new(gateway, Config::default()), "reports")
        .expect("standard panel registers");
    panel.on_show(&HistoryState::new(), ActivationOrigin::DeepLink);
    panel
}

fn picks(domain: &'static [&'static str]) -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(domain), 0..8)
}

fn first_occurrences(values: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|o| o == v) {
            out.push((*v).to_string());
        }
    }
    out
}

fn pt_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(pt_config())]

    /// History lists selected values in selection order and omits empty facets.
    #[test]
    fn prop_history_follows_selection_order(severities in picks(&SEVERITIES)) {
        let mut panel = panel();
        for value in &severities {
            panel.select(keys::SEVERITY, value, ItemMeta::default()).unwrap();
        }
        let expected = first_occurrences(&severities);
        let actual = panel.history_state().get(keys::SEVERITY).map(<[String]>::to_vec);
        prop_assert_eq!(actual, (!expected.is_empty()).then_some(expected));
        prop_assert!(!panel.history_state().contains_key(keys::REVIEW_STATUS));
    }

    /// Selecting and then deselecting a fresh value restores the query and history.
    #[test]
    fn prop_select_deselect_restores(
        severities in picks(&SEVERITIES),
        extra in prop::sample::select(&CHECKERS[..]),
    ) {
        let mut panel = panel();
        let params: HistoryState = severities.iter().map(|s| (keys::SEVERITY, *s)).collect();
        panel.on_history_change(&params);
        let query_before = panel.query();
        let history_before = panel.history_state().clone();

        panel.select(keys::CHECKER_NAME, extra, ItemMeta::default()).unwrap();
        prop_assert_ne!(panel.query(), query_before.clone());
        panel.deselect(keys::CHECKER_NAME, extra).unwrap();

        prop_assert_eq!(panel.query(), query_before);
        prop_assert_eq!(panel.history_state(), &history_before);
    }

    /// Re-applying the panel's own history changes nothing.
    #[test]
    fn prop_init_from_own_history_is_idempotent(
        severities in picks(&SEVERITIES),
        review in picks(&REVIEW),
        checkers in picks(&CHECKERS),
        unique in prop::option::of(any::<bool>()),
    ) {
        let mut params: HistoryState = severities
            .iter()
            .map(|s| (keys::SEVERITY, *s))
            .chain(review.iter().map(|r| (keys::REVIEW_STATUS, *r)))
            .chain(checkers.iter().map(|c| (keys::CHECKER_NAME, *c)))
            .collect();
        if let Some(unique) = unique {
            params.insert_one(keys::IS_UNIQUE, if unique { "on" } else { "off" });
        }

        let mut panel = panel();
        panel.on_history_change(&params);
        let query = panel.query();
        let history = panel.history_state().clone();

        panel.on_history_change(&history);
        prop_assert_eq!(panel.query(), query);
        prop_assert_eq!(panel.history_state(), &history);
        prop_assert_eq!(
            panel.report_filter().severity.len(),
            first_occurrences(&severities).len()
        );
    }
}
