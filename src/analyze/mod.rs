//! Summarize a finished diffsel chain into per-site convergence scores.
//!
//! Runs `readdiffsel` over the chain with a 20% burn-in, then reduces its
//! per-site amino-acid probability table to the maximum probability per site.

use crate::{utils, Table};
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Number of amino-acid probability columns in a meandiffsel table.
pub const AMINO_ACID_COLUMNS: usize = 20;

// ----------------------------------------------------------------------------
// Args
// ----------------------------------------------------------------------------

/// Summarize a finished diffsel chain into per-site convergence scores.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
pub struct Args {
    /// Name of the diffsel chain to analyze (without extension).
    pub chainname: PathBuf,

    /// Location of the readdiffsel executable.
    #[clap(short = 'r', long, default_value = "_build/readdiffsel")]
    pub readdiffsel: PathBuf,

    /// Output file. Defaults to <chainname>.out.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,
}

// ----------------------------------------------------------------------------
// Analyze
// ----------------------------------------------------------------------------

/// Run `readdiffsel` on the chain and write the per-site score table.
pub fn analyze(args: &Args) -> Result<(), Report> {
    // the chain trace tells us how many iterations completed
    let trace = utils::append_extension(&args.chainname, "trace");
    let iterations = count_iterations(&trace)?;
    let burnin = iterations / 5;
    info!("Found trace with {iterations} iterations, burn-in set to {burnin}");

    run_readdiffsel(&args.readdiffsel, burnin, iterations, &args.chainname)?;

    // readdiffsel writes its per-site table next to the chain
    let meandiffsel = PathBuf::from(format!("{}_1.meandiffsel", args.chainname.display()));
    let maxes = read_site_maxes(&meandiffsel)?;
    info!("Computed maximum probability for {} sites", maxes.len());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| utils::append_extension(&args.chainname, "out"));
    utils::create_parent_dir(&output)?;
    let table = site_table(&maxes)?;
    debug!("Per-site scores:\n{}", table.to_markdown());
    table.write(&output, Some('\t'))?;
    info!("Wrote per-site scores: {output:?}");

    Ok(())
}

/// Count chain iterations in a diffsel trace file.
///
/// The trace has one header line followed by one line per iteration.
pub fn count_iterations<P>(path: &P) -> Result<usize, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path).wrap_err(format!("Failed to read chain trace: {path:?}"))?;
    let lines = BufReader::new(file).lines().count();
    if lines < 2 {
        Err(eyre!("Chain trace has no iterations: {path:?}")
            .suggestion("Has the diffsel chain run long enough?"))?
    }
    Ok(lines - 1)
}

/// Invoke `readdiffsel -x <burnin> 1 <iterations> <chainname>`.
fn run_readdiffsel(
    readdiffsel: &Path,
    burnin: usize,
    iterations: usize,
    chainname: &Path,
) -> Result<(), Report> {
    info!("Running: {} -x {burnin} 1 {iterations} {}", readdiffsel.display(), chainname.display());
    let output = Command::new(readdiffsel)
        .arg("-x")
        .arg(burnin.to_string())
        .arg("1")
        .arg(iterations.to_string())
        .arg(chainname)
        .output()
        .wrap_err(format!("Failed to run readdiffsel: {readdiffsel:?}"))
        .suggestion("Is the path to the readdiffsel executable correct? See --readdiffsel.")?;

    if !output.status.success() {
        String::from_utf8_lossy(&output.stderr)
            .lines()
            .for_each(|line| warn!("readdiffsel: {line}"));
        Err(eyre!("readdiffsel exited with {} for chain: {chainname:?}", output.status))?
    }

    Ok(())
}

/// Read a meandiffsel table and reduce each site to its maximum probability.
///
/// Each line holds a site index followed by one probability per amino acid.
pub fn read_site_maxes<P>(path: &P) -> Result<Vec<f64>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path).wrap_err(format!("Failed to read meandiffsel: {path:?}"))?;

    let mut maxes = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.wrap_err(format!("Failed to read line in meandiffsel: {path:?}"))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < AMINO_ACID_COLUMNS + 1 {
            Err(eyre!(
                "Line {} of meandiffsel has {} columns, expected at least {}: {path:?}",
                i + 1,
                fields.len(),
                AMINO_ACID_COLUMNS + 1,
            ))?
        }
        let max = fields[1..=AMINO_ACID_COLUMNS]
            .iter()
            .map(|field| {
                field.parse::<f64>().wrap_err(format!(
                    "Failed to parse probability {field:?} on line {} of: {path:?}",
                    i + 1
                ))
            })
            .try_fold(f64::NEG_INFINITY, |acc, p| p.map(|p| f64::max(acc, p)))?;
        maxes.push(max);
    }

    if maxes.is_empty() {
        Err(eyre!("No sites were found in meandiffsel: {path:?}"))?
    }

    Ok(maxes)
}

/// Build the Sites/Diffsel table from per-site maxima. Site indices are 0-based.
pub fn site_table(maxes: &[f64]) -> Result<Table, Report> {
    let mut table = Table::new();
    table.headers = vec!["Sites".to_string(), "Diffsel".to_string()];
    for (site, max) in maxes.iter().enumerate() {
        table.add_row(vec![site.to_string(), max.to_string()])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests;
