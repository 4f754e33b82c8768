//! Rooted phylogenetic trees for convergence-detection workflows.
//!
//! A [`Phylogeny`] is parsed from a [Newick](https://en.wikipedia.org/wiki/Newick_format)
//! string, optionally carrying [NHX](http://www.phylosoft.org/NHX/) comment tags.
//! Every [`Node`] holds an integer experimental `condition` (default 0) and a
//! stable operator-facing `index` assigned by a fixed preorder traversal, so a
//! human can point at any subtree by number. The central operation is
//! [`Phylogeny::mark_subtree`]: assign a new condition to a node and all of its
//! descendants, optionally relabeling the sibling subtrees as well.

use color_eyre::eyre::{Report, Result};

mod branch;
pub mod newick;
mod node;
mod phylogeny;

#[doc(inline)]
pub use branch::Branch;
#[doc(inline)]
pub use node::Node;
#[doc(inline)]
pub use phylogeny::Phylogeny;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Returns an object created from a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`].
pub trait FromNewick {
    fn from_newick(newick: &str) -> Result<Self, Report>
    where
        Self: Sized;
}

/// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`String`] created from an object.
pub trait ToNewick {
    fn to_newick(&self) -> Result<String, Report>;
}
