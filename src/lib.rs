//! `convsel` prepares and summarizes convergence detection runs with `diffsel`.
//!
//! The workflow has three stages, one subcommand each:
//!
//! 1. [`annotate`](crate::annotate): interactively tag condition subtrees in a
//!    Newick tree, so that branches of interest carry a convergent condition.
//! 1. [`analyze`](crate::analyze): run `readdiffsel` on a finished chain and
//!    reduce the per-site amino-acid probabilities to one convergence score
//!    per site.
//! 1. [`plot`](crate::plot): draw the convergent sites against the annotated
//!    tree and the protein alignment.

pub mod analyze;
pub mod annotate;
pub mod cli;
pub mod plot;
pub mod sequence;
pub mod table;
pub mod utils;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::table::Table;
