use clap::Parser;
use cpb_launcher::{launch, telemetry, LauncherConfig};
use tracing::debug;

/// Runs cpb.py from the launcher's directory with APP_ENV=PROD.
/// Takes no arguments at all, not even `--help` or `--version`.
#[derive(Parser)]
#[command(name = "cpb-launcher")]
#[command(about = "Run cpb.py from this directory with APP_ENV=PROD")]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {}

fn main() {
    telemetry::init_tracing();

    let _cli = Cli::parse();
    let config = LauncherConfig::from_env();
    debug!(?config, "Starting launcher");

    let code = match launch(&config) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("[{}] launch failed: {}", config.tag, e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}
