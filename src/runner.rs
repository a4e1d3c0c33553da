use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;

const TASK_PROGRAM: &str = "task";
const INSTALL_HINT: &str = "see https://taskfile.dev/installation/";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("task is not installed ({INSTALL_HINT})")]
    NotFound,
    #[error("failed to start {program}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// The executable that runs tasks, plus any arguments that must precede task names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    program: String,
    prefix: Vec<String>,
}

impl Runner {
    pub fn new(program: impl Into<String>, prefix: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix,
        }
    }

    pub fn locate(config: &RunnerConfig) -> Result<Self, RunnerError> {
        if let Some(command) = &config.command {
            debug!(program = %command, "using configured runner");
            return Ok(Self::new(command.clone(), config.args.clone()));
        }

        if find_on_path(TASK_PROGRAM).is_some() {
            return Ok(Self::new(TASK_PROGRAM, Vec::new()));
        }

        if go_tool_task_available() {
            return Ok(Self::new("go", vec!["tool".to_string(), "task".to_string()]));
        }

        warn!("no task runner found on PATH or via `go tool task`");
        Err(RunnerError::NotFound)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Runs a task picked in the interactive session and waits for it to finish.
    pub fn run_selected(&self, task_name: &str) -> Result<i32, RunnerError> {
        self.run_inherit(&[task_name])
    }

    /// Forwards `args` verbatim and returns the runner's own exit code.
    pub fn run_direct<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<i32, RunnerError> {
        self.run_inherit(args)
    }

    fn command<S: AsRef<OsStr>>(&self, args: &[S]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.prefix)
            .args(args.iter().map(|arg| arg.as_ref()));
        command
    }

    fn run_inherit<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<i32, RunnerError> {
        let forwarded: Vec<_> = args.iter().map(|arg| arg.as_ref().to_string_lossy()).collect();
        info!(program = %self.program, prefix = ?self.prefix, args = ?forwarded, "starting runner");

        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| RunnerError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let code = exit_code(status);
        info!(program = %self.program, exit_code = code, "runner finished");
        Ok(code)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

fn go_tool_task_available() -> bool {
    Command::new("go")
        .args(["tool", "task", "--help"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .flat_map(|dir| executable_candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let mut candidates = vec![dir.join(program)];
        let extensions = env::var_os("PATHEXT").unwrap_or_else(|| ".EXE;.CMD;.BAT".into());
        for ext in extensions.to_string_lossy().split(';').filter(|ext| !ext.is_empty()) {
            candidates.push(dir.join(format!("{program}{}", ext.to_ascii_lowercase())));
        }
        return candidates;
    }

    #[cfg(not(windows))]
    vec![dir.join(program)]
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        return metadata.permissions().mode() & 0o111 != 0;
    }

    #[cfg(not(unix))]
    true
}
