//! Launch sequence for the child program.
//!
//! The steps run strictly in order:
//!
//! 1. Resolve the launcher's own directory and make it the working directory.
//! 2. Export `APP_ENV` to the launcher process (and so to every child).
//! 3. Print `[<tag>] APP_ENV=<value>` on stdout and flush it.
//! 4. Run the child program through its interpreter with unbuffered stdio.
//! 5. Wait for it and hand back how it exited.
//!
//! Any failure before step 4 aborts without spawning anything. A non-zero
//! child exit is not an error; it comes back as a [`ChildOutcome`].

use crate::config::{check_env_assignment, LauncherConfig};
use crate::interpreter::Interpreter;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Exit code when the launcher fails before the child starts.
pub const SETUP_FAILURE_EXIT_CODE: i32 = 125;
/// Exit code when the interpreter exists but cannot be executed.
pub const NOT_EXECUTABLE_EXIT_CODE: i32 = 126;
/// Exit code when no interpreter can be found.
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

/// Variable exported to the child so its output is not block-buffered.
pub const UNBUFFERED_ENV_VAR: &str = "PYTHONUNBUFFERED";
/// Settings file the child programs load from their working directory.
pub const DOTENV_FILE: &str = ".env";

/// Launch errors. Variants up to `InvalidEnvironment` are setup failures.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Configuration rejected before anything was touched
    #[error("Invalid launcher configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The launcher's own directory could not be determined
    #[error("Cannot resolve the launcher directory: {reason}")]
    LauncherDirUnresolved { reason: String },

    /// Changing into the launcher directory failed
    #[error("Failed to change working directory to '{path}': {reason}")]
    WorkingDirFailed { path: String, reason: String },

    /// The child program is not next to the launcher
    #[error("Child program '{path}' not found. It must live in the launcher directory.")]
    ChildProgramMissing { path: String },

    /// The environment assignment was rejected
    #[error("Cannot set {name}: {reason}")]
    InvalidEnvironment { name: String, reason: String },

    /// Neither python3 nor python is on PATH and no override is set
    #[error("No Python interpreter available. Install python3 or set CPB_PYTHON to an interpreter path.")]
    NoInterpreterAvailable,

    /// The interpreter could not be started
    #[error("Failed to start '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the child failed
    #[error("Failed waiting for child process: {0}")]
    WaitFailed(#[source] io::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LaunchError {
    /// True for failures that happen before the child is spawned
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            LaunchError::InvalidConfig { .. }
                | LaunchError::LauncherDirUnresolved { .. }
                | LaunchError::WorkingDirFailed { .. }
                | LaunchError::ChildProgramMissing { .. }
                | LaunchError::InvalidEnvironment { .. }
        )
    }

    /// Process exit code the launcher reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_setup() => SETUP_FAILURE_EXIT_CODE,
            LaunchError::NoInterpreterAvailable => NOT_FOUND_EXIT_CODE,
            LaunchError::SpawnFailed { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                NOT_FOUND_EXIT_CODE
            }
            LaunchError::SpawnFailed { .. } => NOT_EXECUTABLE_EXIT_CODE,
            _ => 1,
        }
    }
}

pub type LaunchResult<T> = Result<T, LaunchError>;

/// How the child process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildOutcome {
    /// Exit code, if the child exited normally
    pub code: Option<i32>,
    /// Terminating signal (Unix only)
    pub signal: Option<i32>,
}

impl ChildOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code to hand back to our own caller. Signals map to `128 + n`
    /// like a POSIX shell reports them.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Directory holding the running executable
pub fn resolve_launcher_dir() -> LaunchResult<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| LaunchError::LauncherDirUnresolved {
        reason: e.to_string(),
    })?;
    launcher_dir_of(&exe)
}

/// Canonical directory containing `exe`. Only the directory has to exist:
/// Linux reports a binary replaced on disk as `<path> (deleted)`.
pub fn launcher_dir_of(exe: &Path) -> LaunchResult<PathBuf> {
    let parent = exe
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| LaunchError::LauncherDirUnresolved {
            reason: format!("{} has no parent directory", exe.display()),
        })?;

    parent
        .canonicalize()
        .map_err(|e| LaunchError::LauncherDirUnresolved {
            reason: format!("{}: {}", parent.display(), e),
        })
}

/// Make `dir` the working directory of this process
pub fn enter_dir(dir: &Path) -> LaunchResult<()> {
    std::env::set_current_dir(dir).map_err(|e| LaunchError::WorkingDirFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;
    debug!(dir = %dir.display(), "Entered launcher directory");
    Ok(())
}

/// Check that the child program exists in `dir`
pub fn verify_child_program(dir: &Path, config: &LauncherConfig) -> LaunchResult<PathBuf> {
    let path = dir.join(&config.child_program);
    if !path.is_file() {
        return Err(LaunchError::ChildProgramMissing {
            path: path.display().to_string(),
        });
    }

    if !dir.join(DOTENV_FILE).exists() {
        warn!(
            dir = %dir.display(),
            "No {} file in launcher directory; the child program may lack its settings",
            DOTENV_FILE
        );
    }

    Ok(path)
}

/// Set the configured variable for this process and everything it spawns
pub fn export_app_env(config: &LauncherConfig) -> LaunchResult<()> {
    check_env_assignment(&config.env_var, &config.env_value).map_err(|reason| {
        LaunchError::InvalidEnvironment {
            name: config.env_var.clone(),
            reason,
        }
    })?;

    std::env::set_var(&config.env_var, &config.env_value);
    debug!(name = %config.env_var, value = %config.env_value, "Exported environment variable");
    Ok(())
}

pub fn diagnostic_line(tag: &str, name: &str, value: &str) -> String {
    format!("[{}] {}={}", tag, name, value)
}

/// Write the diagnostic line, reading the value back from the environment
pub fn emit_diagnostic<W: Write>(out: &mut W, config: &LauncherConfig) -> LaunchResult<()> {
    let value = std::env::var_os(&config.env_var)
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();

    writeln!(out, "{}", diagnostic_line(&config.tag, &config.env_var, &value))?;
    // Must reach the terminal before the child writes anything
    out.flush()?;
    Ok(())
}

/// Command line that runs the child program. The working directory and
/// environment are inherited from this process.
pub fn build_command(config: &LauncherConfig, interpreter: &Interpreter) -> LaunchResult<Command> {
    if !interpreter.is_available() {
        return Err(LaunchError::NoInterpreterAvailable);
    }

    let mut cmd = Command::new(interpreter.command());

    if config.unbuffered {
        cmd.args(interpreter.unbuffered_args());
        cmd.env(UNBUFFERED_ENV_VAR, "1");
    }

    cmd.arg(&config.child_program);
    Ok(cmd)
}

pub fn describe_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawn `cmd` and block until it exits
pub fn run_child(mut cmd: Command) -> LaunchResult<ChildOutcome> {
    let command = describe_command(&cmd);
    debug!(%command, "Spawning child program");

    let mut child = cmd
        .spawn()
        .map_err(|source| LaunchError::SpawnFailed { command, source })?;
    let status = child.wait().map_err(LaunchError::WaitFailed)?;

    let outcome = ChildOutcome::from_status(status);
    if outcome.success() {
        info!("Child program finished");
    } else {
        // The exit code is the report; nothing on stderr by default
        debug!(
            code = ?outcome.code,
            signal = ?outcome.signal,
            "Child program exited unsuccessfully"
        );
    }
    Ok(outcome)
}

/// Full launch sequence from the directory of the running executable
pub fn launch(config: &LauncherConfig) -> LaunchResult<ChildOutcome> {
    let dir = resolve_launcher_dir()?;
    launch_from(&dir, config, &mut io::stdout())
}

/// Full launch sequence with an explicit launcher directory
pub fn launch_from<W: Write>(
    dir: &Path,
    config: &LauncherConfig,
    out: &mut W,
) -> LaunchResult<ChildOutcome> {
    config
        .validate()
        .map_err(|reason| LaunchError::InvalidConfig { reason })?;

    enter_dir(dir)?;
    verify_child_program(dir, config)?;
    export_app_env(config)?;
    emit_diagnostic(out, config)?;

    let interpreter = Interpreter::from_config(config);
    let cmd = build_command(config, &interpreter)?;
    run_child(cmd)
}
