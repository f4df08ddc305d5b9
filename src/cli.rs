use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sync(SyncArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    pub env_file: PathBuf,
    pub state_file: PathBuf,
    pub diagnostics: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Default for SyncArgs {
    fn default() -> Self {
        Self {
            env_file: config::default_env_path(),
            state_file: config::default_state_path(),
            diagnostics: true,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Parse arguments (without the program name).
///
/// Supported forms:
///   timeoff-sync
///   timeoff-sync --env-file prod.env --state-file /var/lib/timeoff/item-ids.txt
///   timeoff-sync --no-diagnostics --dry-run -v
///   timeoff-sync help
pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut parsed = SyncArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "help" | "-h" | "--help" => return Ok(Command::Help),
            "--env-file" => {
                i += 1;
                parsed.env_file = PathBuf::from(value_for(args, i, "--env-file")?);
            }
            "--state-file" => {
                i += 1;
                parsed.state_file = PathBuf::from(value_for(args, i, "--state-file")?);
            }
            "--no-diagnostics" => parsed.diagnostics = false,
            "--dry-run" => parsed.dry_run = true,
            "-v" | "--verbose" => parsed.verbose = true,
            other => bail!("Unknown argument: {other}\n\nRun `timeoff-sync help` for usage."),
        }
        i += 1;
    }

    Ok(Command::Sync(parsed))
}

fn value_for<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    match args.get(i) {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => bail!("Missing value for {flag} flag"),
    }
}

pub fn print_help() {
    println!("timeoff-sync — mirror BambooHR time-off requests onto a Monday board\n");
    println!("USAGE:");
    println!("  timeoff-sync [OPTIONS]   Delete last run's items and create fresh ones");
    println!("  timeoff-sync help        Show this message");
    println!();
    println!("OPTIONS:");
    println!("  --env-file <path>    KEY=value settings file (default: env-vars.txt)");
    println!("  --state-file <path>  Item id list from the last run (default: item-ids.txt)");
    println!("  --no-diagnostics     Skip the account and board lookups");
    println!("  --dry-run            Fetch and log what would change without touching the board");
    println!("  -v, --verbose        Debug logging (RUST_LOG overrides)");
    println!();
    println!("EXIT CODES:");
    println!("  0 ok, 1 usage, 2 config, 3 credentials, 4 network/HTTP, 5 bad response, 6 state file");
}
