//! Compilation database tooling for Bugview
//!
//! - `clangify`: rewrite gcc build commands into clang-compatible ones
//! - `check`: validate a `compile_commands.json` and report findings
//! - `@file` response-file expansion shared by both

#![forbid(unsafe_code)]

pub mod check;
pub mod clangify;
pub mod entry;
pub mod error;
pub mod response;

pub use check::{CheckReport, Finding, FindingSeverity, check_database, check_str};
pub use clangify::{Clangifier, ClangifyReport};
pub use entry::{CompileEntry, parse_database, split_command, to_json};
pub use error::{CompdbError, CompdbResult};
pub use response::{MAX_DEPTH, expand_response_files};
