#![cfg(unix)]

use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CHILD_SCRIPT: &str = "echo \"child saw APP_ENV=$APP_ENV\"\npwd -P\nexit 3\n";

/// Copy the built launcher into `dir`, next to where `cpb.py` goes.
fn install_launcher(dir: &Path) -> PathBuf {
    let dest = dir.join("cpb-launcher");
    fs::copy(env!("CARGO_BIN_EXE_cpb-launcher"), &dest).unwrap();
    dest
}

fn run_launcher(launcher: &Path, cwd: &Path, args: &[&str]) -> Output {
    Command::new(launcher)
        .args(args)
        .current_dir(cwd)
        .env("CPB_PYTHON", "sh")
        .env_remove("APP_ENV")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
#[serial]
fn test_launcher_runs_child_from_its_own_dir() {
    let install = tempfile::tempdir().unwrap();
    let caller = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), CHILD_SCRIPT).unwrap();
    fs::write(install.path().join(".env"), "SERVER=db\n").unwrap();

    let output = run_launcher(&launcher, caller.path(), &[]);

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[cpb] APP_ENV=PROD".to_string(),
            "child saw APP_ENV=PROD".to_string(),
            install.path().canonicalize().unwrap().display().to_string(),
        ]
    );
}

#[test]
#[serial]
fn test_launcher_diagnostic_appears_once_per_run() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), CHILD_SCRIPT).unwrap();
    fs::write(install.path().join(".env"), "").unwrap();

    for _ in 0..2 {
        let output = run_launcher(&launcher, install.path(), &[]);
        let stdout = String::from_utf8(output.stdout).unwrap();

        assert!(stdout.starts_with("[cpb] APP_ENV=PROD\n"));
        assert_eq!(stdout.matches("[cpb] APP_ENV=").count(), 1);
        assert!(stdout.contains("child saw APP_ENV=PROD"));
    }
}

#[test]
#[serial]
fn test_launcher_failing_child_leaves_stderr_empty() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), "exit 3\n").unwrap();
    fs::write(install.path().join(".env"), "SERVER=db\n").unwrap();

    let output = run_launcher(&launcher, install.path(), &[]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(String::from_utf8(output.stderr).unwrap(), "");
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "[cpb] APP_ENV=PROD\n"
    );
}

#[test]
#[serial]
fn test_launcher_missing_child_program() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());

    let output = run_launcher(&launcher, install.path(), &[]);

    assert_eq!(output.status.code(), Some(125));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[cpb] launch failed"));
    assert!(stderr.contains("cpb.py"));
}

#[test]
#[serial]
fn test_launcher_warns_without_dotenv() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), "exit 0\n").unwrap();

    let output = run_launcher(&launcher, install.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains(".env"));
    assert!(!stderr.contains('\x1b'), "piped stderr must not carry ANSI codes");
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "[cpb] APP_ENV=PROD\n"
    );
}

#[test]
#[serial]
fn test_launcher_rejects_arguments() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), "touch spawned\n").unwrap();

    let output = run_launcher(&launcher, install.path(), &["--report", "monthly"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!install.path().join("spawned").exists());
}

#[test]
#[serial]
fn test_launcher_rejects_help_and_version_flags() {
    let install = tempfile::tempdir().unwrap();
    let launcher = install_launcher(install.path());
    fs::write(install.path().join("cpb.py"), "touch spawned\n").unwrap();

    for flag in ["--help", "-h", "--version", "-V"] {
        let output = run_launcher(&launcher, install.path(), &[flag]);

        assert_eq!(output.status.code(), Some(2), "{flag} should be rejected");
        assert!(output.stdout.is_empty());
    }
    assert!(!install.path().join("spawned").exists());
}
