//! Rewrite a gcc-oriented compilation database so clang-based analyzers
//! can replay it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use bugview_core::Config;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::entry::CompileEntry;
use crate::error::{CompdbError, CompdbResult};
use crate::response::expand_response_files;

/// Build launchers that wrap the real compiler.
const WRAPPERS: &[&str] = &["ccache", "distcc", "sccache"];

/// Flags that only gcc understands.
const GCC_ONLY_FLAGS: &[&str] = &[
    "-fconserve-stack",
    "-fno-var-tracking-assignments",
    "-fmerge-constants",
    "-fno-ipa-sra",
    "-fno-delete-null-pointer-checks",
    "-fno-allow-store-data-races",
    "-fno-reorder-blocks",
    "-fstack-usage",
    "-mno-fp-ret-in-387",
    "-mskip-rax-setup",
    "-mindirect-branch-register",
    "-Wno-maybe-uninitialized",
    "-Wno-unused-but-set-variable",
    "-Wno-format-truncation",
    "-Wno-stringop-overflow",
    "-Wno-packed-not-aligned",
];

/// Compile-action flags; an entry without any of them is not a compilation.
const ACTION_FLAGS: &[&str] = &["-c", "-S", "-E"];

const SOURCE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cp", "cpp", "cxx", "c++", "C", "CC", "CPP", "m", "mm", "i", "ii", "s", "S", "cu",
];

static COMPILER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w.]+(?:-[\w.]+)*-)?(gcc|cc|g\+\+|c\+\+|clang|clang\+\+)(?:-[\d.]+)?$")
        .expect("compiler regex")
});

static GCC_ONLY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:-fno-tree-|-ftree-|-fipa-|-fvar-tracking|-fsched-|-falign-(?:jumps|loops|labels)=|-mpreferred-stack-boundary=|-mindirect-branch=|-mfunction-return=|-mrecord-mcount|--param=)",
    )
    .expect("gcc-only flag regex")
});

/// Outcome of a clangify pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClangifyReport {
    pub entries: Vec<CompileEntry>,
    /// Entries that were not compile actions.
    pub skipped: usize,
    /// Entries identical to an earlier one after rewriting.
    pub duplicates: usize,
}

/// Maps compiler drivers to clang and strips what clang rejects.
#[derive(Debug, Clone)]
pub struct Clangifier {
    clang: String,
    clangxx: String,
}

impl Default for Clangifier {
    fn default() -> Self {
        Self::new("clang", "clang++")
    }
}

impl Clangifier {
    #[must_use]
    pub fn new(clang: impl Into<String>, clangxx: impl Into<String>) -> Self {
        Self {
            clang: clang.into(),
            clangxx: clangxx.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.clang_binary, &config.clangxx_binary)
    }

    /// Rewrite every entry, dropping non-compile actions and duplicates.
    pub fn run(&self, entries: &[CompileEntry]) -> CompdbResult<ClangifyReport> {
        let mut report = ClangifyReport::default();
        let mut seen: HashSet<(String, String, Vec<String>)> = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let argv = entry.argv(index)?;
            let argv = expand_response_files(&argv, Path::new(&entry.directory))?;
            if argv.is_empty() {
                return Err(CompdbError::InvalidEntry {
                    index,
                    reason: "empty argument list".to_string(),
                });
            }
            if !is_compile_action(&argv, &entry.file) {
                debug!(index, file = %entry.file, "skipping non-compile entry");
                report.skipped += 1;
                continue;
            }
            let arguments = self.rewrite_arguments(&argv);
            let key = (entry.directory.clone(), entry.file.clone(), arguments.clone());
            if !seen.insert(key) {
                report.duplicates += 1;
                continue;
            }
            report.entries.push(CompileEntry {
                directory: entry.directory.clone(),
                file: entry.file.clone(),
                arguments: Some(arguments),
                command: None,
                output: entry.output.clone(),
            });
        }

        info!(
            kept = report.entries.len(),
            skipped = report.skipped,
            duplicates = report.duplicates,
            "clangified compilation database"
        );
        Ok(report)
    }

    /// Rewrite an already expanded argument vector.
    #[must_use]
    pub fn rewrite_arguments(&self, argv: &[String]) -> Vec<String> {
        let start = argv
            .iter()
            .take_while(|arg| WRAPPERS.contains(&program_name(arg)))
            .count();
        let Some((compiler, rest)) = argv[start..].split_first() else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(rest.len() + 1);
        out.push(self.map_compiler(compiler));

        let mut iter = rest.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                // These take the next argument as their value.
                "-MF" | "-MT" | "-MQ" | "--param" => {
                    iter.next();
                }
                a if is_dependency_flag(a) || is_gcc_only(a) => {}
                _ => out.push(arg.clone()),
            }
        }
        out
    }

    fn map_compiler(&self, compiler: &str) -> String {
        let Some(caps) = COMPILER_RE.captures(program_name(compiler)) else {
            debug!(compiler, "unrecognized compiler kept");
            return compiler.to_string();
        };
        match caps.get(1).map_or("", |m| m.as_str()) {
            "clang" | "clang++" => compiler.to_string(),
            "g++" | "c++" => self.clangxx.clone(),
            _ => self.clang.clone(),
        }
    }
}

fn program_name(arg: &str) -> &str {
    Path::new(arg)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(arg)
}

fn is_dependency_flag(arg: &str) -> bool {
    matches!(arg, "-MD" | "-MMD" | "-MP" | "-MG")
        || ["-MF", "-MT", "-MQ"]
            .iter()
            .any(|flag| arg.len() > flag.len() && arg.starts_with(flag))
        || arg.starts_with("-Wp,-MD,")
        || arg.starts_with("-Wp,-MMD,")
}

fn is_gcc_only(arg: &str) -> bool {
    GCC_ONLY_FLAGS.contains(&arg) || GCC_ONLY_PREFIX_RE.is_match(arg)
}

fn is_compile_action(argv: &[String], file: &str) -> bool {
    let has_action = argv.iter().any(|arg| ACTION_FLAGS.contains(&arg.as_str()));
    let has_source = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
    has_action && has_source
}
