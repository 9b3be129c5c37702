// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prunewerk — command-line PDF shrinker
//
// Entry point. Initialises logging, parses the command line, and shrinks each
// file named on it.

mod cli;
mod config_dir;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "shrink failed");
            eprintln!("prunewerk: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> prunewerk_core::error::Result<()> {
    match cli.command {
        Command::Shrink(args) => {
            let config = config_dir::resolve_config(args.config.as_deref())?;
            tracing::info!(files = args.files.len(), "Prunewerk starting");
            cli::shrink(&args, &config)?;
        }
    }
    Ok(())
}
