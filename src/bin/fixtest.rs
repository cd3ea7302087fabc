//! CLI entry point: `fixtest <test_name> [-c CONFIG] [-v] [-d]`.
//!
//! `test_name` is resolved against a small static registry of known
//! `TestCaseController` constructors rather than imported dynamically.

use clap::Parser as ClapParser;
use fixtest::{ControllerRunner, TestCaseController};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "fixtest", version)]
struct Cli {
    /// Name of the registered test case to run.
    test_name: String,

    /// Path to a JSON controller configuration file.
    #[arg(short = 'c', long = "config-file")]
    config_file: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Print version and exit.
    #[arg(short = 'v', long)]
    version: bool,
}

/// Look up a test case constructor by name. Real deployments register
/// their own cases here; this harness ships none built in.
fn find_controller(name: &str) -> Option<Box<dyn TestCaseController>> {
    let _ = name;
    None
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if cli.version {
        println!("fixtest {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if let Some(path) = &cli.config_file {
        if !path.exists() {
            eprintln!("Cannot find the config file: {}", path.display());
            return ExitCode::from(2);
        }
    }

    let mut controller = match find_controller(&cli.test_name) {
        Some(c) => c,
        None => {
            eprintln!("Cannot find the TestCaseController named '{}'", cli.test_name);
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        testcase = controller.testcase_id(),
        description = controller.description(),
        "starting test"
    );

    // A multi-thread runtime's worker threads start polling as soon as it's
    // built, so connections spawned during `setup` run while the test body
    // below drives its own assertions on this, the main, OS thread.
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Cannot start the network runtime: {e}");
            return ExitCode::from(2);
        }
    };
    let _guard = runtime.enter();

    let runner = Arc::new(ControllerRunner::new());
    fixtest::install_signal_handlers(runner.clone(), controller.clients(), controller.servers());

    let (status, exit_value) = runner.execute_test(controller.as_mut());
    tracing::info!(status = %status, "test finished");

    ExitCode::from(exit_value as u8)
}
