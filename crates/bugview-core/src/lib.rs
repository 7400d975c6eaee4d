//! Core types and configuration for Bugview
//!
//! This crate provides:
//! - Report enumerations with bidirectional code/label lookup (`Severity`, `ReviewStatus`, ...)
//! - The report predicate (`ReportFilter`) and comparison descriptor (`CompareData`)
//! - Configuration management (`Config`, environment parsing)
//! - Common error types

#![forbid(unsafe_code)]

pub mod config;
pub mod enums;
pub mod error;
pub mod report_filter;

pub use config::Config;
pub use enums::{CodedEnum, DetectionStatus, DiffType, ReviewStatus, Severity};
pub use error::{Error as CoreError, Result as CoreResult};
pub use report_filter::{
    BugPathLengthRange, CompareData, DateInterval, ReportDate, ReportFilter, format_timestamp,
    parse_timestamp, wildcard_match,
};
