//! Navigation-history state
//!
//! [`HistoryState`] is the flat key → values mapping kept in the URL hash.
//! Arrays are written as repeated keys (`severity=High&severity=Medium`) and
//! a key with no values is never written.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Reserved history keys.
pub mod keys {
    pub const RUN: &str = "run";
    pub const RUN_TAG: &str = "run-tag";
    pub const NEWCHECK: &str = "newcheck";
    pub const RUN_TAG_NEWCHECK: &str = "run-tag-newcheck";
    pub const DIFF_TYPE: &str = "difftype";
    pub const REVIEW_STATUS: &str = "review-status";
    pub const DETECTION_STATUS: &str = "detection-status";
    pub const SEVERITY: &str = "severity";
    pub const DETECTION_DATE: &str = "detection-date";
    pub const FIX_DATE: &str = "fix-date";
    pub const FILEPATH: &str = "filepath";
    pub const SOURCE_COMPONENT: &str = "source-component";
    pub const CHECKER_NAME: &str = "checker-name";
    pub const CHECKER_MSG: &str = "checker-msg";
    pub const REPORT_HASH: &str = "report-hash";
    pub const MIN_BUG_PATH_LENGTH: &str = "min-bug-path-length";
    pub const MAX_BUG_PATH_LENGTH: &str = "max-bug-path-length";
    pub const IS_UNIQUE: &str = "is-unique";
    pub const TAB: &str = "tab";
}

/// One facet's contribution to history: `None` means "omit the key".
pub type UrlEntry = (&'static str, Option<Vec<String>>);

/// Ordered flat mapping from history key to one or more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryState {
    entries: IndexMap<String, Vec<String>>,
}

impl HistoryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string or URL hash. A leading `#` or `?` is ignored,
    /// empty values are dropped, repeated keys accumulate in order.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix('?'))
            .unwrap_or(trimmed);
        let mut state = Self::new();
        for (key, value) in form_urlencoded::parse(body.as_bytes()) {
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            state
                .entries
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        state
    }

    /// Serialize as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set `key`, or remove it when `values` is `None` or empty.
    pub fn set(&mut self, key: &str, values: Option<Vec<String>>) {
        match values {
            Some(values) if !values.is_empty() => {
                self.entries.insert(key.to_string(), values);
            }
            _ => {
                self.entries.shift_remove(key);
            }
        }
    }

    pub fn insert_one(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HistoryState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (key, value) in iter {
            state
                .entries
                .entry(key.into())
                .or_default()
                .push(value.into());
        }
        state
    }
}

impl std::fmt::Display for HistoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accumulates_repeated_keys() {
        let state = HistoryState::parse("#severity=High&severity=Medium&run=nightly");
        assert_eq!(
            state.get("severity"),
            Some(&["High".to_string(), "Medium".to_string()][..])
        );
        assert_eq!(state.first("run"), Some("nightly"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn parse_drops_empty_values_and_keys() {
        let state = HistoryState::parse("?run=&=x&severity=Low&&checker-name=%20");
        assert!(!state.contains_key("run"));
        assert!(!state.contains_key("checker-name"));
        assert_eq!(state.first("severity"), Some("Low"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn encoding_escapes_reserved_characters() {
        let mut state = HistoryState::new();
        state.insert_one("review-status", "False positive");
        state.insert_one("filepath", "src/a&b.c");
        let qs = state.to_query_string();
        assert_eq!(qs, "review-status=False+positive&filepath=src%2Fa%26b.c");
        assert_eq!(HistoryState::parse(&qs), state);
    }

    #[test]
    fn set_none_or_empty_removes_key() {
        let mut state: HistoryState = [("a", "1"), ("b", "2")].into_iter().collect();
        state.set("a", None);
        state.set("b", Some(Vec::new()));
        assert!(state.is_empty());
        assert_eq!(state.to_query_string(), "");
    }

    #[test]
    fn serde_is_a_plain_map() {
        let state: HistoryState = [("severity", "High"), ("severity", "Low")].into_iter().collect();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"severity":["High","Low"]}"#);
    }
}
