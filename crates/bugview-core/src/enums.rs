//! Report enumerations with bidirectional code/label lookup.
//!
//! Every enum here has three spellings:
//! - the numeric wire code used by the report-query service (`code`)
//! - the human label written into the navigation history (`label`)
//! - the upper-snake constant name (`name`)
//!
//! `from_label` accepts the label or the constant name, case-insensitively,
//! with `_` and spaces treated alike, so `false positive`, `False positive`
//! and `FALSE_POSITIVE` all resolve to [`ReviewStatus::FalsePositive`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shared lookup surface for coded enums.
pub trait CodedEnum: Sized + Copy + Ord + 'static {
    /// Human-readable kind name used in error messages.
    const KIND: &'static str;
    /// Every variant in display order.
    const ALL: &'static [Self];

    fn code(self) -> i32;
    fn label(self) -> &'static str;
    fn name(self) -> &'static str;

    #[must_use]
    fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.code() == code)
    }

    #[must_use]
    fn from_label(raw: &str) -> Option<Self> {
        let wanted = normalize_label(raw);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|v| {
            normalize_label(v.label()) == wanted || normalize_label(v.name()) == wanted
        })
    }

    /// Like [`CodedEnum::from_label`] but reports the failure.
    fn parse_label(raw: &str) -> Result<Self> {
        Self::from_label(raw).ok_or_else(|| Error::UnknownLabel {
            kind: Self::KIND,
            label: raw.to_string(),
        })
    }

    /// Like [`CodedEnum::from_code`] but reports the failure.
    fn parse_code(code: i32) -> Result<Self> {
        Self::from_code(code).ok_or(Error::UnknownCode {
            kind: Self::KIND,
            code,
        })
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == '_' { ' ' } else { c.to_ascii_lowercase() })
        .collect()
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $variant:ident = $code:literal, $label:literal, $const_name:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "i32", try_from = "i32")]
        pub enum $name {
            $( $variant, )+
        }

        impl CodedEnum for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            fn code(self) -> i32 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $const_name, )+
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl TryFrom<i32> for $name {
            type Error = Error;

            fn try_from(code: i32) -> Result<Self> {
                Self::parse_code(code)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_label(s)
            }
        }
    };
}

coded_enum! {
    /// Checker severity, ordered from least to most severe.
    Severity, "severity" {
        Unspecified = 0, "Unspecified", "UNSPECIFIED";
        Style = 10, "Style", "STYLE";
        Low = 20, "Low", "LOW";
        Medium = 30, "Medium", "MEDIUM";
        High = 40, "High", "HIGH";
        Critical = 50, "Critical", "CRITICAL";
    }
}

coded_enum! {
    /// Human review verdict attached to a report.
    ReviewStatus, "review status" {
        Unreviewed = 0, "Unreviewed", "UNREVIEWED";
        Confirmed = 1, "Confirmed bug", "CONFIRMED";
        FalsePositive = 2, "False positive", "FALSE_POSITIVE";
        Intentional = 3, "Intentional", "INTENTIONAL";
    }
}

coded_enum! {
    /// Lifecycle of a report across analysis runs.
    DetectionStatus, "detection status" {
        New = 0, "New", "NEW";
        Resolved = 1, "Resolved", "RESOLVED";
        Unresolved = 2, "Unresolved", "UNRESOLVED";
        Reopened = 3, "Reopened", "REOPENED";
        Off = 4, "Off", "OFF";
        Unavailable = 5, "Unavailable", "UNAVAILABLE";
    }
}

coded_enum! {
    /// Which side of a run comparison to return.
    DiffType, "diff type" {
        New = 0, "New", "NEW";
        Resolved = 1, "Resolved", "RESOLVED";
        Unresolved = 2, "Unresolved", "UNRESOLVED";
    }
}

impl Default for DiffType {
    fn default() -> Self {
        Self::New
    }
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::Unreviewed
    }
}

impl Default for DetectionStatus {
    fn default() -> Self {
        Self::New
    }
}

impl DetectionStatus {
    /// Statuses a report counts as "outstanding" under.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::New | Self::Unresolved | Self::Reopened)
    }
}
