//! Configuration management for Bugview
//!
//! Configuration is loaded from environment variables, falling back to a
//! `.env` file in the working directory.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::enums::{CodedEnum, DetectionStatus};

/// Main configuration struct for Bugview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Filter panel
    /// Quiet period before a typed search is sent (default: 300ms).
    pub search_debounce_ms: u64,
    /// Detection statuses preselected on first user-driven activation.
    pub default_detection_statuses: Vec<DetectionStatus>,
    /// Whether "unique reports" is preselected on first user-driven activation.
    pub default_unique: bool,
    /// Candidate page size for server-enumerated facets.
    pub items_page_size: usize,

    // Logging
    pub log_level: String,

    // Compilation database
    pub clang_binary: String,
    pub clangxx_binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            default_detection_statuses: vec![
                DetectionStatus::New,
                DetectionStatus::Reopened,
                DetectionStatus::Unresolved,
            ],
            default_unique: true,
            items_page_size: 10,
            log_level: "info".to_string(),
            clang_binary: "clang".to_string(),
            clangxx_binary: "clang++".to_string(),
        }
    }
}

/// Module-level shared config cache (used by `Config::get` and `Config::reset_cached`).
static CONFIG_CACHE: std::sync::RwLock<Option<Config>> = std::sync::RwLock::new(None);

impl Config {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Filter panel
        config.search_debounce_ms = env_u64("BUGVIEW_SEARCH_DEBOUNCE_MS", config.search_debounce_ms);
        if let Some(v) = env_value("BUGVIEW_DEFAULT_DETECTION_STATUS") {
            config.default_detection_statuses = parse_detection_statuses(&v);
        }
        config.default_unique = env_bool("BUGVIEW_DEFAULT_UNIQUE", config.default_unique);
        config.items_page_size = env_usize("BUGVIEW_ITEMS_PAGE_SIZE", config.items_page_size).max(1);

        // Logging
        if let Some(v) = env_value("BUGVIEW_LOG_LEVEL") {
            let v = v.trim().to_ascii_lowercase();
            if !v.is_empty() {
                config.log_level = v;
            }
        }

        // Compilation database
        if let Some(v) = env_value("BUGVIEW_CLANG_BINARY").filter(|s| !s.trim().is_empty()) {
            config.clangxx_binary = derive_cxx_binary(&v);
            config.clang_binary = v;
        }
        if let Some(v) = env_value("BUGVIEW_CLANGXX_BINARY").filter(|s| !s.trim().is_empty()) {
            config.clangxx_binary = v;
        }

        config
    }

    /// Cached process-wide configuration.
    #[must_use]
    pub fn get() -> Self {
        {
            let guard = CONFIG_CACHE
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(ref c) = *guard {
                return c.clone();
            }
        }
        let mut guard = CONFIG_CACHE
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.get_or_insert_with(Self::from_env).clone()
    }

    /// Drop the cached configuration so the next `get` re-reads the environment.
    pub fn reset_cached() {
        let mut guard = CONFIG_CACHE
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }

    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// `clang-17` -> `clang++-17`, `/opt/llvm/bin/clang` -> `/opt/llvm/bin/clang++`.
fn derive_cxx_binary(clang: &str) -> String {
    let (dir, file) = clang
        .rsplit_once('/')
        .map_or(("", clang), |(d, f)| (d, f));
    let cxx = file.strip_prefix("clang").map_or_else(
        || file.to_string(),
        |suffix| format!("clang++{suffix}"),
    );
    if dir.is_empty() {
        cxx
    } else {
        format!("{dir}/{cxx}")
    }
}

fn parse_detection_statuses(raw: &str) -> Vec<DetectionStatus> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = DetectionStatus::from_label(s);
            if parsed.is_none() {
                tracing::warn!(value = s, "ignoring unknown default detection status");
            }
            parsed
        })
        .collect()
}

static DOTENV_VALUES: OnceLock<HashMap<String, String>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: std::cell::RefCell<HashMap<String, String>> =
        std::cell::RefCell::new(HashMap::new());
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

fn dotenv_values() -> &'static HashMap<String, String> {
    DOTENV_VALUES.get_or_init(|| load_dotenv_file(Path::new(".env")))
}

/// Read a value from the .env file (if present).
#[must_use]
pub fn dotenv_value(key: &str) -> Option<String> {
    dotenv_values().get(key).cloned()
}

/// Read a value from the real environment first, falling back to .env.
#[must_use]
pub fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key).ok().or_else(|| dotenv_value(key))
}

fn load_dotenv_file(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    parse_dotenv_contents(&contents)
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped; an
/// optional `export ` prefix and matching surrounding quotes are stripped.
#[must_use]
pub fn parse_dotenv_contents(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    map
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Parse a boolean flag spelling (`1/true/yes/on`, `0/false/no/off`).
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    parse_flag(value).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_value(key).map_or(default, |v| parse_bool(&v, default))
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
