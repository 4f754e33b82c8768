//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::{analyze, annotate, plot};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = convsel::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// # use clap::Parser;
/// let input = ["convsel", "analyze", "chains/myrun", "--readdiffsel", "_build/readdiffsel"];
/// let args = convsel::Cli::parse_from(input);
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "convsel", author, version)]
#[clap(about = "convsel annotates condition trees and summarizes diffsel convergence scans.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to [annotate](annotate::annotate).
    /// ## Examples
    /// ```rust
    /// use convsel::{Cli, cli::Command};
    /// use clap::Parser;
    /// let input = ["convsel", "annotate", "tree.nwk", "--sister-branch-cond"];
    /// let args = Cli::parse_from(input);
    /// assert!(matches!(args.command, Command::Annotate(_)));
    /// ```
    #[clap(about = "Interactively tag condition subtrees in a Newick tree.")]
    Annotate(annotate::Args),
    #[clap(about = "Summarize a finished diffsel chain into per-site convergence scores.")]
    Analyze(analyze::Args),
    #[clap(about = "Draw convergent sites against the annotated tree and alignment.")]
    Plot(plot::Args),
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
