// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line parsing and the `shrink` command.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use prunewerk_core::error::{PrunewerkError, Result};
use prunewerk_core::{PruneReport, ShrinkConfig};
use prunewerk_document::pdf::ShrinkOutcome;
use prunewerk_document::shrink_file;
use tracing::{info, warn};

/// Shrink PDF files by removing resources their content never uses.
#[derive(Debug, Parser)]
#[command(name = "prunewerk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write <name>_shrink.pdf next to each input with unused resources removed.
    Shrink(ShrinkArgs),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct ShrinkArgs {
    /// JSON shrink configuration (default: ~/.config/prunewerk/shrink.json).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print one JSON report per file instead of a summary line.
    #[arg(long)]
    pub json: bool,

    /// PDF files to shrink, in order.
    #[arg(required = true, value_name = "PDF")]
    pub files: Vec<PathBuf>,
}

/// Shrink every file in order, stopping at the first failure.
pub fn shrink(args: &ShrinkArgs, config: &ShrinkConfig) -> Result<Vec<ShrinkOutcome>> {
    let mut outcomes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        if !file.is_file() {
            return Err(PrunewerkError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", file.display()),
            )));
        }
        let outcome = shrink_file(file, config)?;
        if !outcome.report.is_clean() {
            warn!(
                input = %file.display(),
                malformed = outcome.report.malformed.len(),
                "some content streams were left unpruned"
            );
        }
        print_outcome(&outcome, args.json)?;
        outcomes.push(outcome);
    }
    let total = combined_report(&outcomes);
    info!(
        files = outcomes.len(),
        pages = total.pages,
        fonts_removed = total.fonts_removed(),
        fonts_canonicalized = total.fonts_canonicalized,
        "shrink finished"
    );
    Ok(outcomes)
}

/// All per-file reports folded into one.
pub fn combined_report(outcomes: &[ShrinkOutcome]) -> PruneReport {
    outcomes.iter().fold(PruneReport::default(), |mut total, outcome| {
        total.absorb(outcome.report.clone());
        total
    })
}

fn print_outcome(outcome: &ShrinkOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
    } else {
        println!("{}", summary_line(outcome));
    }
    Ok(())
}

/// `in.pdf -> in_shrink.pdf: 120.0 KiB -> 48.3 KiB (-59.8%), 7 fonts removed, 2 canonicalized`
pub fn summary_line(outcome: &ShrinkOutcome) -> String {
    let change = if outcome.input_bytes == 0 {
        0.0
    } else {
        100.0 * (outcome.output_bytes as f64 - outcome.input_bytes as f64)
            / outcome.input_bytes as f64
    };
    let mut line = format!(
        "{} -> {}: {} -> {} ({:+.1}%), {} fonts removed, {} canonicalized",
        display_name(&outcome.input),
        display_name(&outcome.output),
        human_size(outcome.input_bytes),
        human_size(outcome.output_bytes),
        change,
        outcome.report.fonts_removed(),
        outcome.report.fonts_canonicalized,
    );
    if !outcome.report.is_clean() {
        line.push_str(&format!(", {} unanalysable", outcome.report.malformed.len()));
    }
    line
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
