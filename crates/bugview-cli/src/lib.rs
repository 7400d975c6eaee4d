#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bugview_compdb::{Clangifier, CompdbError, check_str, parse_database, to_json};
use bugview_core::{CodedEnum, Config};
use bugview_filter::{
    ActivationOrigin, ClientContext, FilterError, HistoryState, InMemoryGateway, ItemsOptions,
    Page, ReportQueryGateway, ReportStore, standard_panel,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("exit code {0}")]
    ExitCode(i32),
    #[error(transparent)]
    Compdb(#[from] CompdbError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Core(#[from] bugview_core::CoreError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "bv", version, about = "Bugview report filtering and build database tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite a gcc compilation database for clang-based analysis.
    Clangify {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Validate a compilation database and print a JSON report.
    Check {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Initialize the report filter panel from a URL and print its state.
    Filter {
        /// Report store JSON (runs, tags, reports, components).
        #[arg(long)]
        reports: PathBuf,
        /// Navigation query string, e.g. `severity=High&run=nightly`.
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long, value_enum, default_value_t = OriginArg::DeepLink)]
        origin: OriginArg,
        #[arg(long, default_value = "reports")]
        tab: String,
    },
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,
}

#[derive(clap::Args, Debug)]
pub struct IoArgs {
    /// Input file (stdin when omitted).
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Output file (stdout when omitted).
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    User,
    DeepLink,
}

impl From<OriginArg> for ActivationOrigin {
    fn from(value: OriginArg) -> Self {
        match value {
            OriginArg::User => Self::UserNavigation,
            OriginArg::DeepLink => Self::DeepLink,
        }
    }
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    let config = Config::get();
    init_tracing(&config);
    match execute(cli, &config) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            err_exit_code(&err)
        }
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

const fn err_exit_code(err: &CliError) -> i32 {
    match err {
        CliError::ExitCode(code) => *code,
        CliError::InvalidArgument(_) => 2,
        _ => 1,
    }
}

fn emit_error(err: &CliError) {
    if matches!(err, CliError::ExitCode(_)) {
        return;
    }
    eprintln!("error: {err}");
}

fn execute(cli: Cli, config: &Config) -> CliResult<()> {
    match cli.command {
        Commands::Clangify { io } => handle_clangify(&io, config),
        Commands::Check { io } => handle_check(&io),
        Commands::Filter {
            reports,
            url,
            origin,
            tab,
        } => handle_filter(&reports, &url, origin.into(), &tab, config),
        Commands::Config {
            action: ConfigCommand::Show,
        } => handle_config_show(config),
    }
}

fn handle_clangify(io: &IoArgs, config: &Config) -> CliResult<()> {
    let raw = read_input(io.input.as_deref())?;
    let entries = parse_database(&raw)?;
    let report = Clangifier::from_config(config).run(&entries)?;
    if report.skipped > 0 || report.duplicates > 0 {
        info!(
            skipped = report.skipped,
            duplicates = report.duplicates,
            "entries removed"
        );
    }
    write_output(io.output.as_deref(), &to_json(&report.entries)?)
}

fn handle_check(io: &IoArgs) -> CliResult<()> {
    let raw = read_input(io.input.as_deref())?;
    let report = check_str(&raw)?;
    write_output(io.output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
    if report.has_errors() {
        return Err(CliError::ExitCode(1));
    }
    Ok(())
}

fn handle_filter(
    reports: &Path,
    url: &str,
    origin: ActivationOrigin,
    tab: &str,
    config: &Config,
) -> CliResult<()> {
    if tab.trim().is_empty() {
        return Err(CliError::InvalidArgument("--tab must not be empty".to_string()));
    }
    let store = ReportStore::load(reports)?;
    let gateway: Arc<dyn ReportQueryGateway> = Arc::new(InMemoryGateway::new(store));
    let mut panel = standard_panel(ClientContext::new(gateway, config.clone()), tab)?;

    let params = HistoryState::parse(url);
    let summary = panel.init_all(&params, origin);
    debug!(?summary, "panel initialized from url");

    let ids: Vec<&'static str> = panel.widgets().map(|w| w.id()).collect();
    for id in ids {
        let options = ItemsOptions {
            page: Page::first(config.items_page_size),
            ..Default::default()
        };
        if let Err(err) = panel.get_items(id, options) {
            warn!(facet = id, error = %err, "candidate fetch failed");
        }
    }

    write_output(None, &serde_json::to_string_pretty(&panel.snapshot())?)
}

#[derive(Serialize)]
struct ConfigView<'a> {
    search_debounce_ms: u64,
    default_detection_statuses: Vec<&'static str>,
    default_unique: bool,
    items_page_size: usize,
    log_level: &'a str,
    clang_binary: &'a str,
    clangxx_binary: &'a str,
}

fn handle_config_show(config: &Config) -> CliResult<()> {
    let view = ConfigView {
        search_debounce_ms: config.search_debounce_ms,
        default_detection_statuses: config
            .default_detection_statuses
            .iter()
            .map(|s| s.label())
            .collect(),
        default_unique: config.default_unique,
        items_page_size: config.items_page_size,
        log_level: &config.log_level,
        clang_binary: &config.clang_binary,
        clangxx_binary: &config.clangxx_binary,
    };
    write_output(None, &serde_json::to_string_pretty(&view)?)
}

fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, body: &str) -> CliResult<()> {
    match path {
        Some(path) => {
            fs::write(path, format!("{body}\n"))?;
            Ok(())
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{body}")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_arguments() {
        let cli = Cli::try_parse_from([
            "bv",
            "filter",
            "--reports",
            "r.json",
            "--url",
            "severity=High",
            "--origin",
            "user",
        ])
        .unwrap();
        match cli.command {
            Commands::Filter {
                reports,
                url,
                origin,
                tab,
            } => {
                assert_eq!(reports, PathBuf::from("r.json"));
                assert_eq!(url, "severity=High");
                assert_eq!(ActivationOrigin::from(origin), ActivationOrigin::UserNavigation);
                assert_eq!(tab, "reports");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn io_flags_are_optional() {
        let cli = Cli::try_parse_from(["bv", "check", "-i", "cc.json"]).unwrap();
        let Commands::Check { io } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(io.input, Some(PathBuf::from("cc.json")));
        assert!(io.output.is_none());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(err_exit_code(&CliError::ExitCode(1)), 1);
        assert_eq!(err_exit_code(&CliError::InvalidArgument("x".into())), 2);
        assert_eq!(
            err_exit_code(&CliError::Io(std::io::Error::other("boom"))),
            1
        );
    }
}
