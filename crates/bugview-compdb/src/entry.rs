//! Compilation database entries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompdbError, CompdbResult};

/// One `compile_commands.json` entry. Exactly one of `arguments` and
/// `command` is expected to be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileEntry {
    pub directory: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arguments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<String>,
}

impl CompileEntry {
    /// The argument vector, splitting `command` with shell quoting rules
    /// when `arguments` is absent.
    pub fn argv(&self, index: usize) -> CompdbResult<Vec<String>> {
        if let Some(args) = &self.arguments {
            return Ok(args.clone());
        }
        let command = self.command.as_deref().ok_or_else(|| CompdbError::InvalidEntry {
            index,
            reason: "neither 'arguments' nor 'command' is set".to_string(),
        })?;
        split_command(command).ok_or_else(|| CompdbError::UnparseableCommand {
            index,
            command: command.to_string(),
        })
    }

    /// `file` resolved against `directory`.
    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.file)
    }
}

/// Shell-split a command line; `None` on unbalanced quotes.
#[must_use]
pub fn split_command(command: &str) -> Option<Vec<String>> {
    shlex::split(command)
}

/// Parse a compilation database.
pub fn parse_database(raw: &str) -> CompdbResult<Vec<CompileEntry>> {
    Ok(serde_json::from_str(raw)?)
}

/// Pretty-printed JSON array.
pub fn to_json(entries: &[CompileEntry]) -> CompdbResult<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
