//! Report predicate and comparison descriptor
//!
//! [`ReportFilter`] is the conjunction of every filter facet's selection. An
//! empty list in any field means "no constraint" for that facet. [`CompareData`]
//! describes an optional diff against another set of runs or run tags.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{DetectionStatus, DiffType, ReviewStatus, Severity};
use crate::error::{Error, Result};

/// Inclusive timestamp interval in seconds since epoch. Open on a side when
/// that side is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub after: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub before: Option<i64>,
}

impl DateInterval {
    /// Returns `true` when neither bound is set.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }

    #[must_use]
    pub fn contains(&self, ts: i64) -> bool {
        self.after.is_none_or(|a| ts >= a) && self.before.is_none_or(|b| ts <= b)
    }

    /// Parse the history encoding `after..before`. Either side may be empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some((after, before)) = raw.split_once("..") else {
            return Err(Error::InvalidRange(raw.to_string()));
        };
        let parse_side = |s: &str| -> Result<Option<i64>> {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                parse_timestamp(s).map(Some)
            }
        };
        let interval = Self {
            after: parse_side(after)?,
            before: parse_side(before)?,
        };
        if let (Some(a), Some(b)) = (interval.after, interval.before) {
            if a > b {
                return Err(Error::InvalidRange(raw.to_string()));
            }
        }
        Ok(interval)
    }

    /// Canonical history encoding (inverse of [`DateInterval::parse`]).
    #[must_use]
    pub fn encode(&self) -> String {
        let side = |v: Option<i64>| v.map(format_timestamp).unwrap_or_default();
        format!("{}..{}", side(self.after), side(self.before))
    }
}

/// Date constraints on first detection and fix time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detected: Option<DateInterval>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fixed: Option<DateInterval>,
}

impl ReportDate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.detected.is_none() && self.fixed.is_none()
    }
}

/// Inclusive bug-path length bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugPathLengthRange {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<u32>,
}

impl BugPathLengthRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(Error::InvalidRange(format!("{lo}:{hi}")));
            }
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn contains(&self, len: u32) -> bool {
        self.min.is_none_or(|m| len >= m) && self.max.is_none_or(|m| len <= m)
    }
}

/// Conjunction of all facet selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub filepath: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub checker_msg: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub checker_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub report_hash: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub severity: Vec<Severity>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub review_status: Vec<ReviewStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub detection_status: Vec<DetectionStatus>,
    /// Baseline run-tag ids
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub run_tag: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub component_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bug_path_length: Option<BugPathLengthRange>,
    #[serde(skip_serializing_if = "ReportDate::is_empty", default)]
    pub date: ReportDate,
    #[serde(default)]
    pub is_unique: bool,
}

impl ReportFilter {
    /// Number of facets carrying a constraint.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        [
            !self.filepath.is_empty(),
            !self.checker_msg.is_empty(),
            !self.checker_name.is_empty(),
            !self.report_hash.is_empty(),
            !self.severity.is_empty(),
            !self.review_status.is_empty(),
            !self.detection_status.is_empty(),
            !self.run_tag.is_empty(),
            !self.component_names.is_empty(),
            self.bug_path_length.is_some(),
            self.date.detected.is_some(),
            self.date.fixed.is_some(),
            self.is_unique,
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        self.active_filter_count() > 0
    }
}

/// Optional comparison against other runs or run tags.
///
/// At least one of `run_ids` / `run_tag` is set whenever a `CompareData`
/// exists; the aggregate query yields `None` instead of an empty descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_tag: Option<Vec<i64>>,
    #[serde(default)]
    pub diff_type: DiffType,
}

impl CompareData {
    /// Build a descriptor, or `None` when neither side selects anything.
    #[must_use]
    pub fn from_sides(run_ids: Vec<i64>, run_tag: Vec<i64>, diff_type: DiffType) -> Option<Self> {
        if run_ids.is_empty() && run_tag.is_empty() {
            return None;
        }
        Some(Self {
            run_ids: (!run_ids.is_empty()).then_some(run_ids),
            run_tag: (!run_tag.is_empty()).then_some(run_tag),
            diff_type,
        })
    }
}

/// Parse a history timestamp into seconds since epoch (UTC).
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
        .ok_or_else(|| Error::InvalidTimestamp(raw.to_string()))
}

/// Canonical timestamp rendering used in history state.
#[must_use]
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )
}

/// Glob-style match where `*` matches any run of characters. Matching is
/// case-sensitive, like the report service's path filters.
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = parts.split_first().map_or((pattern, &[][..]), |(f, r)| (*f, r));
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}
