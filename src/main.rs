mod app;
mod config;
mod filter;
mod model;
mod runner;
mod state;
mod taskfile;
mod view;

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::SessionOutcome;
use config::{CONFIG_ENV, LogConfig};
use model::TaskRegistry;
use runner::Runner;

const LOG_ENV: &str = "GT_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "gt",
    about = "Interactive fuzzy picker for Go Task",
    long_about = "Interactive fuzzy picker for Go Task.\n\n\
        Without arguments gt opens a searchable list of the tasks in the nearest Taskfile.\n\
        With arguments everything is passed straight to task, e.g. `gt clean test` or `gt -l`.",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Arguments forwarded verbatim to task
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

impl Cli {
    /// clap consumes a leading `--` as its own separator, so the forwarded
    /// arguments are taken from the raw argv instead of the parsed values.
    fn from_argv<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let mut cli = Cli::parse_from(&argv);
        cli.args = argv.into_iter().skip(1).collect();
        cli
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::from_argv(env::args_os());
    let cwd = env::current_dir().context("failed to resolve working directory")?;
    let explicit_config = env::var_os(CONFIG_ENV).map(PathBuf::from);
    let loaded = config::load(&cwd, explicit_config.as_deref())?;
    init_tracing(&loaded.config.log)?;
    info!(config = ?loaded.path, args = cli.args.len(), "starting gt");

    let runner = Runner::locate(&loaded.config.runner)?;
    info!(program = runner.program(), prefix = ?runner.prefix(), "located task runner");

    if !cli.args.is_empty() {
        return Ok(runner.run_direct(&cli.args)?);
    }

    let taskfile = taskfile::load(&cwd, &loaded.config.taskfile)?;
    let registry = TaskRegistry::new(taskfile.tasks)
        .with_context(|| format!("invalid tasks in {}", taskfile.path.display()))?;

    match app::run_tui(&registry, &loaded.config.ui)? {
        SessionOutcome::Quit => {
            info!("session closed without running a task");
            Ok(0)
        }
        SessionOutcome::Run(name) => Ok(runner.run_selected(&name)?),
    }
}

fn init_tracing(config: &LogConfig) -> Result<()> {
    let Some(level) = env::var(LOG_ENV).ok().or_else(|| config.level.clone()) else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(&level).with_context(|| format!("invalid log level: {level}"))?;

    let path = match &config.file {
        Some(path) => path.clone(),
        None => default_log_path().context("unable to resolve OS cache directory for logs")?,
    };
    let (dir, file_name) = split_log_path(&path)?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(tracing_appender::rolling::never(dir, file_name))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    let cache_root = dirs::cache_dir()?;
    Some(cache_root.join("gt").join("gt.log"))
}

fn split_log_path(path: &Path) -> Result<(&Path, &OsStr)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}
