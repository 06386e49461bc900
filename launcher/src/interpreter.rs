use crate::config::LauncherConfig;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Interpreter used to run the child program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreter {
    /// `python3` found on PATH
    Python3,
    /// `python` found on PATH
    Python,
    /// Explicit interpreter from configuration
    Custom(String),
    /// No interpreter available
    None,
}

impl Interpreter {
    /// Get the command name for this interpreter
    pub fn command(&self) -> &str {
        match self {
            Interpreter::Python3 => "python3",
            Interpreter::Python => "python",
            Interpreter::Custom(command) => command.as_str(),
            Interpreter::None => "",
        }
    }

    /// Check if this interpreter can be invoked
    pub fn is_available(&self) -> bool {
        !matches!(self, Interpreter::None)
    }

    /// Whether the interpreter understands Python's `-u` flag
    pub fn is_python(&self) -> bool {
        match self {
            Interpreter::Python3 | Interpreter::Python => true,
            Interpreter::Custom(command) => Path::new(command)
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("python") || name.starts_with("pypy"))
                .unwrap_or(false),
            Interpreter::None => false,
        }
    }

    /// Flags that make the child's stdio unbuffered
    pub fn unbuffered_args(&self) -> &'static [&'static str] {
        if self.is_python() {
            &["-u"]
        } else {
            &[]
        }
    }

    /// Use the configured override, falling back to detection
    pub fn from_config(config: &LauncherConfig) -> Self {
        match &config.interpreter {
            Some(command) => Interpreter::Custom(command.clone()),
            None => detect_interpreter(),
        }
    }
}

fn probe(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Detect an available interpreter in order of preference
pub fn detect_interpreter() -> Interpreter {
    // Prefer python3; bare `python` may still be Python 2 on older hosts
    if probe(Interpreter::Python3.command()) {
        debug!("Detected interpreter: python3");
        return Interpreter::Python3;
    }

    if probe(Interpreter::Python.command()) {
        debug!("Detected interpreter: python");
        return Interpreter::Python;
    }

    debug!("No Python interpreter found on PATH");
    Interpreter::None
}
