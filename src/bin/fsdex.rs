//! fsdex CLI Binary
//!
//! Command-line interface for the fsdex filesystem indexer.

use anyhow::Context;
use clap::Parser;
use fsdex::logging::init_logging;
use fsdex::tooling::{Cli, CliContext};
use std::process;

// Deep trees recurse once per directory level.
const STACK_SIZE: usize = 256 * 1024 * 1024;

fn run(cli: Cli) -> anyhow::Result<()> {
    let context = CliContext::new(cli.config.clone()).context("Error loading configuration")?;
    init_logging(&context.logging_config(&cli), cli.log_file.clone())
        .context("Error initializing logging")?;

    let output = context.execute(&cli.command)?;
    if output.to_stderr {
        eprintln!("{}", output.text);
    } else {
        println!("{}", output.text);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let handle = std::thread::Builder::new()
        .name("fsdex-main".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || run(cli));

    let result = match handle {
        Ok(handle) => handle.join(),
        Err(e) => {
            eprintln!("Error: failed to start worker thread: {}", e);
            process::exit(1);
        }
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
        Err(_) => process::exit(2),
    }
}
