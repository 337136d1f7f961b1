//! Resolving and running scripts
//!
//! A script is run in two steps. [`resolve`] picks a [`Launcher`] for the file
//! based on the host platform, its extension, its execute bit and its shebang
//! line. [`run`] then spawns the child with the terminal's stdio and races its
//! exit against a timer; on timeout the child is killed and reaped.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::catalog::{self, CatalogError};
use crate::settings::Settings;

/// `errno` for "Exec format error" on Linux and the BSDs
const ENOEXEC: i32 = 8;

/// Longest shebang line inspected when picking an interpreter
const MAX_FIRST_LINE: u64 = 4096;

/// Timeout used when neither `--timeout` nor `scripts.timeout` is set
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

/// Facts about a script file that decide how it is launched
#[derive(Debug, Clone, Copy)]
pub struct FileInfo<'a> {
    pub name: &'a str,
    pub executable: bool,
}

/// How a script is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Execute the file itself
    Direct,
    /// `<program> <leading_args...> <script> <args...>`
    Interpreter {
        program: String,
        leading_args: Vec<String>,
    },
    /// `sh <script> <args...>`
    Shell,
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Pick a launcher for a script.
///
/// `first_line` is only consulted on POSIX hosts for files without the execute bit.
#[must_use]
pub fn classify(platform: Platform, file: &FileInfo<'_>, first_line: Option<&str>) -> Launcher {
    match platform {
        Platform::Windows => {
            if has_extension(file.name, "ps1") {
                Launcher::Interpreter {
                    program: "powershell".to_string(),
                    leading_args: vec!["-File".to_string()],
                }
            } else if has_extension(file.name, "bat") || has_extension(file.name, "cmd") {
                Launcher::Interpreter {
                    program: "cmd".to_string(),
                    leading_args: vec!["/C".to_string()],
                }
            } else {
                Launcher::Direct
            }
        }
        Platform::Posix => {
            if file.executable {
                return Launcher::Direct;
            }
            match first_line.and_then(parse_shebang) {
                Some(program) => Launcher::Interpreter {
                    program,
                    leading_args: Vec::new(),
                },
                None => Launcher::Shell,
            }
        }
    }
}

/// Extract the interpreter from a `#!` line.
///
/// `#!/usr/bin/env python3` names `python3`; options given to `env` are skipped.
#[must_use]
pub fn parse_shebang(line: &str) -> Option<String> {
    let mut tokens = line.strip_prefix("#!")?.split_whitespace();
    let first = tokens.next()?;
    if Path::new(first).file_name() == Some(OsStr::new("env")) {
        return tokens
            .find(|t| !t.starts_with('-') && !t.contains('='))
            .map(str::to_string);
    }
    Some(first.to_string())
}

fn read_first_line(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(std::fs::File::open(path)?).take(MAX_FIRST_LINE);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// A resolved script and the way to start it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePlan {
    pub script: PathBuf,
    pub launcher: Launcher,
}

impl ExecutablePlan {
    /// The program that is actually spawned
    #[must_use]
    pub fn program(&self) -> &OsStr {
        match &self.launcher {
            Launcher::Direct => self.script.as_os_str(),
            Launcher::Interpreter { program, .. } => OsStr::new(program),
            Launcher::Shell => OsStr::new("sh"),
        }
    }

    /// Full argument list passed to [`ExecutablePlan::program`]
    #[must_use]
    pub fn args<'a>(&'a self, extra: &'a [String]) -> Vec<&'a OsStr> {
        let prefix: Vec<&OsStr> = match &self.launcher {
            Launcher::Direct => Vec::new(),
            Launcher::Interpreter { leading_args, .. } => leading_args
                .iter()
                .map(OsStr::new)
                .chain([self.script.as_os_str()])
                .collect(),
            Launcher::Shell => vec![self.script.as_os_str()],
        };
        prefix
            .into_iter()
            .chain(extra.iter().map(OsStr::new))
            .collect()
    }

    fn command(&self, extra: &[String]) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(self.program());
        command
            .args(self.args(extra))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }

    /// Spawn the child. An executable file without a shebang makes `execve`
    /// fail with `ENOEXEC`; like a POSIX shell, retry it through `sh`.
    fn spawn(&self, extra: &[String]) -> io::Result<tokio::process::Child> {
        match self.command(extra).spawn() {
            Err(e) if self.launcher == Launcher::Direct && is_exec_format_error(&e) => {
                debug!(
                    "{} is not a binary or shebang script, running it with sh",
                    self.script.display()
                );
                let shell = ExecutablePlan {
                    script: self.script.clone(),
                    launcher: Launcher::Shell,
                };
                shell.command(extra).spawn()
            }
            result => result,
        }
    }
}

fn is_exec_format_error(e: &io::Error) -> bool {
    cfg!(unix) && e.raw_os_error() == Some(ENOEXEC)
}

/// Resolve a script in `scripts_dir` for the current platform.
///
/// # Errors
///
/// Returns `RunnerError::NotFound` if no file of that exact name exists.
pub fn resolve(scripts_dir: &Path, name: &str) -> Result<ExecutablePlan, RunnerError> {
    resolve_for(Platform::current(), scripts_dir, name)
}

/// Resolve a script as if running on `platform`.
///
/// # Errors
///
/// Returns `RunnerError::NotFound` if no file of that exact name exists.
pub fn resolve_for(
    platform: Platform,
    scripts_dir: &Path,
    name: &str,
) -> Result<ExecutablePlan, RunnerError> {
    let script = catalog::find_script(scripts_dir, name)?;
    let executable = std::fs::metadata(&script)
        .map(|metadata| catalog::is_executable(&script, &metadata))
        .unwrap_or(false);

    let first_line = if platform == Platform::Posix && !executable {
        match read_first_line(&script) {
            Ok(line) => Some(line),
            Err(e) => {
                debug!("Unable to read first line of {}: {e}", script.display());
                None
            }
        }
    } else {
        None
    };

    let launcher = classify(
        platform,
        &FileInfo { name, executable },
        first_line.as_deref(),
    );
    debug!("Resolved '{name}' to {launcher:?}");
    Ok(ExecutablePlan { script, launcher })
}

/// One requested execution
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub script_name: String,
    pub arguments: Vec<String>,
    pub timeout: Duration,
}

impl RunRequest {
    /// Pick the timeout: explicit flag, then `scripts.timeout` (when positive), then the default.
    #[must_use]
    pub fn timeout_from(flag_secs: Option<u64>, settings: &Settings) -> Duration {
        flag_secs
            .or_else(|| {
                settings
                    .get_int("scripts.timeout")
                    .and_then(|secs| u64::try_from(secs).ok())
                    .filter(|secs| *secs > 0)
            })
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }
}

/// Why a finished run did not succeed
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for process: {0}")]
    Wait(io::Error),
    #[error("{0}")]
    Exit(ExitStatus),
}

/// Result of a single run
#[derive(Debug)]
pub enum RunOutcome {
    Success,
    Failure { detail: ExecutionFailure },
    TimedOut { elapsed: Duration },
}

impl RunOutcome {
    /// Convert into the error surfaced to the user.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Execution` or `RunnerError::TimedOut` for unsuccessful outcomes.
    pub fn into_result(self) -> Result<(), RunnerError> {
        match self {
            RunOutcome::Success => Ok(()),
            RunOutcome::Failure { detail } => Err(RunnerError::Execution(detail)),
            RunOutcome::TimedOut { elapsed } => Err(RunnerError::TimedOut { elapsed }),
        }
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    NotFound(#[from] CatalogError),
    #[error("script execution failed: {0}")]
    Execution(ExecutionFailure),
    #[error("script execution timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },
}

/// Run a resolved script, killing it if it outlives `timeout`.
///
/// The child shares this process's stdin, stdout and stderr.
pub async fn run(plan: &ExecutablePlan, args: &[String], timeout: Duration) -> RunOutcome {
    let mut child = match plan.spawn(args) {
        Ok(child) => child,
        Err(e) => {
            return RunOutcome::Failure {
                detail: ExecutionFailure::Spawn {
                    program: plan.program().to_string_lossy().into_owned(),
                    source: e,
                },
            };
        }
    };
    debug!(
        "Started {} (pid {:?}) with timeout {timeout:?}",
        plan.script.display(),
        child.id()
    );

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => RunOutcome::Success,
            Ok(status) => RunOutcome::Failure { detail: ExecutionFailure::Exit(status) },
            Err(e) => RunOutcome::Failure { detail: ExecutionFailure::Wait(e) },
        },
        () = tokio::time::sleep(timeout) => {
            info!("Timeout of {timeout:?} reached, killing {}", plan.script.display());
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out process: {e}");
            }
            RunOutcome::TimedOut { elapsed: timeout }
        }
    }
}

/// Resolve `request.script_name` in `scripts_dir` and run it.
///
/// # Errors
///
/// Returns `RunnerError::NotFound` before anything is spawned if the script does not exist.
pub async fn run_script(
    scripts_dir: &Path,
    request: &RunRequest,
) -> Result<RunOutcome, RunnerError> {
    let plan = resolve(scripts_dir, &request.script_name)?;
    Ok(run(&plan, &request.arguments, request.timeout).await)
}
