mod cli;
mod config;
mod error;
mod model;
mod providers;
mod state;
mod sync;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Command, SyncArgs};
use providers::HttpConnectors;
use state::ItemStore;
use sync::{SyncOptions, SyncRun};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let sync_args = match cli::parse_args(&args) {
        Ok(Command::Help) => {
            cli::print_help();
            return ExitCode::SUCCESS;
        }
        Ok(Command::Sync(sync_args)) => sync_args,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    init_tracing(sync_args.verbose);

    match run(&sync_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Returns the exit code on failure.
async fn run(args: &SyncArgs) -> Result<(), u8> {
    let config = config::load_config(&args.env_file).map_err(|e| {
        error!(error = %e, "could not load config");
        e.exit_code()
    })?;
    let connectors = HttpConnectors::new(&config).map_err(|e| {
        error!(error = %e, "could not set up HTTP client");
        e.exit_code()
    })?;
    let store = ItemStore::new(&args.state_file);
    let options = SyncOptions {
        today: chrono::Local::now().date_naive(),
        diagnostics: args.diagnostics,
        dry_run: args.dry_run,
    };

    match SyncRun::new(&config, &connectors, &store, options).run().await {
        Ok(report) => {
            info!(
                deleted = report.deleted,
                already_gone = report.already_gone,
                created = report.created.len(),
                diagnostics_ok = ?report.diagnostics_ok,
                "board is up to date"
            );
            Ok(())
        }
        Err(failure) => {
            error!(
                phase = %failure.phase,
                recorded = failure.created.len(),
                "{failure}"
            );
            Err(failure.exit_code())
        }
    }
}
