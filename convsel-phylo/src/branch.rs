use crate::{newick, FromNewick};

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A [`Branch`] in the [`Phylogeny`](crate::Phylogeny).
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Branch {
    /// [`Branch`] length (ex. 1.0).
    pub length: f32,
}

#[rustfmt::skip]
impl Default for Branch { fn default() -> Self { Self::new() } }
#[rustfmt::skip]
impl Display for Branch { fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.length) } }
#[rustfmt::skip]
impl Branch { pub fn new() -> Self { Branch { length: 0.0 } } }

impl FromNewick for Branch {
    /// Returns a [`Branch`] created from a Newick node [`str`].
    ///
    /// # Examples
    ///
    /// Just a node name.
    ///
    /// ```rust
    /// use convsel_phylo::{Branch, FromNewick};
    /// let branch = Branch::from_newick("A")?;
    /// assert_eq!(branch, Branch { length: 0.0 });
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// Branch attributes, with an NHX comment.
    ///
    /// ```rust
    /// # use convsel_phylo::{Branch, FromNewick};
    /// let branch = Branch::from_newick(":2[&&NHX:Condition=1]")?;
    /// assert_eq!(branch, Branch { length: 2.0 });
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Branch, Report> {
        let (bare, _tags) = newick::split_nhx(newick)?;
        let attributes: Vec<_> = bare.replace(';', "").split(':').map(String::from).collect();
        let length = match attributes.len() >= 2 && !attributes[1].is_empty() {
            true => attributes[1]
                .parse()
                .wrap_err_with(|| eyre!("Failed to parse branch length from newick: {newick}"))?,
            false => 0.0,
        };
        Ok(Branch { length })
    }
}
