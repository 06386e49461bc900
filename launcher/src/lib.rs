pub mod config;
pub mod interpreter;
pub mod launch;
pub mod telemetry;

pub use config::{check_env_assignment, LauncherConfig, INTERPRETER_OVERRIDE_VAR};
pub use interpreter::{detect_interpreter, Interpreter};
pub use launch::{
    build_command, diagnostic_line, emit_diagnostic, enter_dir, export_app_env, launch,
    launch_from, launcher_dir_of, resolve_launcher_dir, run_child, verify_child_program,
    ChildOutcome, LaunchError, LaunchResult, NOT_EXECUTABLE_EXIT_CODE, NOT_FOUND_EXIT_CODE,
    SETUP_FAILURE_EXIT_CODE,
};
pub use telemetry::init_tracing;
