//! `@file` response-file expansion.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::entry::split_command;
use crate::error::{CompdbError, CompdbResult};

/// Maximum nesting of response files.
pub const MAX_DEPTH: usize = 8;

/// Replace every `@path` argument with the shell-split contents of `path`,
/// resolved against `directory`. Nested response files are expanded too.
pub fn expand_response_files(args: &[String], directory: &Path) -> CompdbResult<Vec<String>> {
    expand(args, directory, 0)
}

fn expand(args: &[String], directory: &Path, depth: usize) -> CompdbResult<Vec<String>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        let Some(rel) = arg.strip_prefix('@').filter(|r| !r.is_empty()) else {
            out.push(arg.clone());
            continue;
        };
        let path = directory.join(rel);
        if depth >= MAX_DEPTH {
            return Err(CompdbError::ResponseDepth {
                path,
                limit: MAX_DEPTH,
            });
        }
        let contents = fs::read_to_string(&path).map_err(|err| CompdbError::ResponseFile {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let inner = split_command(&contents).ok_or_else(|| CompdbError::ResponseFile {
            path: path.clone(),
            reason: "unbalanced quotes".to_string(),
        })?;
        debug!(path = %path.display(), args = inner.len(), "expanded response file");
        out.extend(expand(&inner, directory, depth + 1)?);
    }
    Ok(out)
}
