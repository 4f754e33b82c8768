//! Interactively tag condition subtrees in a Newick tree.
//!
//! The operator is shown the tree with one numbered badge per node, picks the
//! root of a convergent subtree by number, and repeats until saving. The
//! annotated tree is written back out as NHX-tagged Newick, which is what
//! `diffsel` expects as its condition tree.

use crate::{plot::svg, utils};
use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use convsel_phylo::{FromNewick, Phylogeny, ToNewick};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Condition assigned to the selected subtree.
pub const CONVERGENT_CONDITION: u32 = 1;
/// Condition assigned to sister subtrees of the selection.
pub const SISTER_CONDITION: u32 = 2;

// ----------------------------------------------------------------------------
// Args
// ----------------------------------------------------------------------------

/// Interactively tag condition subtrees in a Newick tree.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
pub struct Args {
    /// Input tree file (newick format).
    pub input: PathBuf,

    /// Also assign a separate condition to the sister branches of each
    /// convergent subtree.
    #[clap(short = 's', long = "sister-branch-cond")]
    pub sister_branches: bool,

    /// Record a Transition tag at the root of each relabeled subtree.
    #[clap(long)]
    pub transition: bool,

    /// Write an SVG snapshot of the annotated tree to <input>.svg.
    #[clap(long)]
    pub svg: bool,

    /// Output file. Defaults to <input>.annotated.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,
}

// ----------------------------------------------------------------------------
// Annotate
// ----------------------------------------------------------------------------

/// Run the interactive selection loop on stdin/stdout and write the
/// annotated tree.
pub fn annotate(args: &Args) -> Result<(), Report> {
    let newick = utils::read_to_string(&args.input)?;
    let mut phylogeny = Phylogeny::from_newick(&newick)?;
    info!("Read {} nodes from tree: {:?}", phylogeny.graph.node_count(), args.input);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    select_subtrees(&mut phylogeny, args, &mut stdin.lock(), &mut stdout.lock())?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| utils::append_extension(&args.input, "annotated"));
    utils::create_parent_dir(&output)?;
    std::fs::write(&output, format!("{}\n", phylogeny.to_newick()?))
        .wrap_err(format!("Failed to write annotated tree: {output:?}"))?;
    info!("Wrote annotated tree: {output:?}");

    Ok(())
}

/// The interactive selection loop.
///
/// Reads one node index per line from `input` and marks that subtree as
/// convergent, until the operator types `s` to save. Unknown indices and
/// non-integer input are reported and the prompt repeats. Running out of
/// input behaves like a save, so piped input never hangs.
///
/// With `--svg`, each round also refreshes an SVG snapshot of the current
/// labeling next to the input tree.
pub fn select_subtrees<R, W>(
    phylogeny: &mut Phylogeny,
    args: &Args,
    input: &mut R,
    output: &mut W,
) -> Result<(), Report>
where
    R: BufRead,
    W: Write,
{
    let sister_condition = args.sister_branches.then_some(SISTER_CONDITION);
    let svg_path = args.svg.then(|| utils::append_extension(&args.input, "svg"));

    loop {
        if let Some(svg_path) = &svg_path {
            std::fs::write(svg_path, svg::render_tree(phylogeny)?)
                .wrap_err(format!("Failed to write tree snapshot: {svg_path:?}"))?;
            writeln!(output, "-- Tree snapshot written to {svg_path:?}")?;
        }
        writeln!(output, "{}", phylogeny.to_display()?)?;
        writeln!(output, "(to save and quit type 's')")?;
        write!(output, "Please enter start of convergent subtree: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            warn!("Reached the end of input without a save command, saving.");
            break;
        }
        let choice = line.trim();

        if choice == "s" {
            break;
        }
        match choice.parse::<usize>() {
            Ok(index) => {
                let marked = phylogeny.mark_subtree(
                    index,
                    CONVERGENT_CONDITION,
                    sister_condition,
                    args.transition,
                );
                match marked {
                    Ok(()) => writeln!(output, "-- Selected subtree rooted at node {index}")?,
                    Err(e) => writeln!(output, "-- {e}; try again")?,
                }
            }
            Err(_) => writeln!(output, "-- Input was not an integer; try again")?,
        }
    }

    Ok(())
}
