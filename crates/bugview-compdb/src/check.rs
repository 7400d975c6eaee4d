//! Compilation database validation.
//!
//! Works on raw JSON so structurally broken entries are reported instead of
//! aborting deserialization.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::entry::split_command;
use crate::error::CompdbResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Entry position, absent for database-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub severity: FindingSeverity,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub entries: usize,
    pub errors: usize,
    pub warnings: usize,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.errors > 0
    }

    fn push(
        &mut self,
        index: Option<usize>,
        severity: FindingSeverity,
        code: &'static str,
        message: String,
    ) {
        match severity {
            FindingSeverity::Error => self.errors += 1,
            FindingSeverity::Warning => self.warnings += 1,
        }
        self.findings.push(Finding {
            index,
            severity,
            code,
            message,
        });
    }

    fn error(&mut self, index: usize, code: &'static str, message: String) {
        self.push(Some(index), FindingSeverity::Error, code, message);
    }

    fn warning(&mut self, index: usize, code: &'static str, message: String) {
        self.push(Some(index), FindingSeverity::Warning, code, message);
    }
}

/// Parse `raw` and validate it. Only malformed JSON is an `Err`.
pub fn check_str(raw: &str) -> CompdbResult<CheckReport> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(check_database(&value))
}

/// Validate a parsed compilation database.
#[must_use]
pub fn check_database(value: &Value) -> CheckReport {
    let mut report = CheckReport::default();
    let Some(items) = value.as_array() else {
        report.push(
            None,
            FindingSeverity::Error,
            "not-an-array",
            "compilation database must be a JSON array".to_string(),
        );
        return report;
    };
    report.entries = items.len();

    // (directory, file, argv) -> first index
    let mut seen: HashMap<(String, String, Vec<String>), usize> = HashMap::new();
    // resolved source path -> (first index, argv)
    let mut by_source: HashMap<String, (usize, Vec<String>)> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            report.error(index, "not-an-object", "entry is not a JSON object".to_string());
            continue;
        };

        let file = non_empty_str(obj.get("file"));
        if file.is_none() {
            report.error(index, "missing-file", "'file' is missing or empty".to_string());
        }
        let directory = non_empty_str(obj.get("directory"));
        match directory {
            None => report.error(
                index,
                "missing-directory",
                "'directory' is missing or empty".to_string(),
            ),
            Some(dir) if !Path::new(dir).is_absolute() => report.warning(
                index,
                "relative-directory",
                format!("'directory' is not absolute: {dir}"),
            ),
            Some(_) => {}
        }

        let argv = match (obj.get("arguments"), obj.get("command")) {
            (Some(_), Some(_)) => {
                report.error(
                    index,
                    "ambiguous-command",
                    "both 'arguments' and 'command' are set".to_string(),
                );
                None
            }
            (None, None) => {
                report.error(
                    index,
                    "missing-command",
                    "neither 'arguments' nor 'command' is set".to_string(),
                );
                None
            }
            (Some(arguments), None) => {
                let argv = string_array(arguments);
                if argv.is_none() {
                    report.error(
                        index,
                        "invalid-arguments",
                        "'arguments' must be a non-empty array of strings".to_string(),
                    );
                }
                argv
            }
            (None, Some(command)) => {
                let argv = command.as_str().and_then(split_command).filter(|a| !a.is_empty());
                if argv.is_none() {
                    report.error(
                        index,
                        "unparseable-command",
                        format!("'command' cannot be split: {command}"),
                    );
                }
                argv
            }
        };

        let (Some(file), Some(directory), Some(argv)) = (file, directory, argv) else {
            continue;
        };

        let key = (directory.to_string(), file.to_string(), argv.clone());
        if let Some(first) = seen.get(&key) {
            report.warning(index, "duplicate-entry", format!("duplicate of entry {first}"));
            continue;
        }
        seen.insert(key, index);

        let source = Path::new(directory).join(file).to_string_lossy().into_owned();
        match by_source.get(&source) {
            Some((first, first_argv)) if *first_argv != argv => report.warning(
                index,
                "conflicting-arguments",
                format!("{source} is also compiled by entry {first} with different arguments"),
            ),
            Some(_) => {}
            None => {
                by_source.insert(source, (index, argv));
            }
        }
    }

    debug!(
        entries = report.entries,
        errors = report.errors,
        warnings = report.warnings,
        "checked compilation database"
    );
    report
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array().filter(|a| !a.is_empty())?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
