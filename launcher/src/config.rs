use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides interpreter detection.
pub const INTERPRETER_OVERRIDE_VAR: &str = "CPB_PYTHON";

/// Reject assignments `std::env::set_var` would panic on.
pub fn check_env_assignment(name: &str, value: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Environment variable name cannot be empty".to_string());
    }

    if name.contains('=') || name.contains('\0') {
        return Err(format!(
            "Environment variable name '{}' must not contain '=' or NUL",
            name.escape_debug()
        ));
    }

    if value.contains('\0') {
        return Err(format!("Value of {} must not contain NUL", name));
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub env_var: String,
    pub env_value: String,
    pub tag: String,
    pub child_program: PathBuf,
    pub interpreter: Option<String>,
    pub unbuffered: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            env_var: "APP_ENV".to_string(),
            env_value: "PROD".to_string(),
            tag: "cpb".to_string(),
            child_program: PathBuf::from("cpb.py"),
            interpreter: None,
            unbuffered: true,
        }
    }
}

impl LauncherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus the interpreter override from `CPB_PYTHON`, if set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(INTERPRETER_OVERRIDE_VAR) {
            Ok(value) if !value.trim().is_empty() => config.with_interpreter(value.trim()),
            _ => config,
        }
    }

    pub fn with_env_value(mut self, env_value: impl Into<String>) -> Self {
        self.env_value = env_value.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_child_program(mut self, child_program: impl Into<PathBuf>) -> Self {
        self.child_program = child_program.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_unbuffered(mut self, unbuffered: bool) -> Self {
        self.unbuffered = unbuffered;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        check_env_assignment(&self.env_var, &self.env_value)?;

        if self.tag.trim().is_empty() {
            return Err("Diagnostic tag cannot be empty".to_string());
        }

        if self.child_program.as_os_str().is_empty() {
            return Err("Child program path cannot be empty".to_string());
        }

        if let Some(interpreter) = &self.interpreter {
            if interpreter.trim().is_empty() {
                return Err("Interpreter override cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
