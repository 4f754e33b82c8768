use clap::Parser;
use color_eyre::eyre::{Report, Result};
use convsel::cli::{Cli, Command};
use log::debug;

fn main() -> Result<(), Report> {
    // ------------------------------------------------------------------------
    // CLI Setup

    // Parse CLI parameters
    let args = Cli::parse();

    // initialize color_eyre crate for colorized logs
    color_eyre::install()?;

    // Set logging/verbosity level via RUST_LOG
    std::env::set_var("RUST_LOG", args.verbosity.to_string());

    // initialize env_logger crate for logging/verbosity level
    env_logger::init();

    debug!("CLI parameters:\n{}", serde_json::to_string_pretty(&args)?);

    // check which CLI command we're running (annotate, analyze, plot)
    match args.command {
        // Interactively tag condition subtrees in a Newick tree
        Command::Annotate(args) => convsel::annotate::annotate(&args)?,
        // Summarize a finished diffsel chain into per-site scores
        Command::Analyze(args) => convsel::analyze::analyze(&args)?,
        // Draw convergent sites against the tree and alignment
        Command::Plot(args) => convsel::plot::plot(&args)?,
    }

    Ok(())
}
