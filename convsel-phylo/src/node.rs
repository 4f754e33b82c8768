use crate::{newick, FromNewick};

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A [`Node`] in the [`Phylogeny`](crate::Phylogeny).
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Node {
    /// Taxon or internal node name. Anonymous internal nodes receive a
    /// generated label during parsing (ex. `NODE_0`).
    pub label: String,
    /// Stable operator-facing index, assigned by one fixed preorder traversal.
    pub index: usize,
    /// Experimental condition (ex. 1 for convergent branches).
    pub condition: u32,
    /// Condition recorded at the root of a marked subtree, when transition
    /// tagging is enabled.
    pub transition: Option<u32>,
    /// True if the node had no name in the source Newick string. Anonymous
    /// nodes serialize back to an empty name.
    pub anonymous: bool,
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl Node {
    /// The per-node NHX comment tag (ex. `[&&NHX:Condition=1]`).
    pub fn nhx(&self) -> String {
        let mut tags = format!("[&&NHX:Condition={}", self.condition);
        if let Some(transition) = self.transition {
            tags.push_str(&format!(":Transition={transition}"));
        }
        tags.push(']');
        tags
    }
}

impl FromNewick for Node {
    /// Returns a [`Node`] created from a Newick node [`str`].
    ///
    /// ## Examples
    ///
    /// Just a node name.
    ///
    /// ```rust
    /// use convsel_phylo::{Node, FromNewick};
    /// let node = Node::from_newick("A;")?;
    /// assert_eq!(node.label, "A");
    /// assert_eq!(node.condition, 0);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// A node name, branch attributes, and an NHX comment.
    ///
    /// ```rust
    /// use convsel_phylo::{Node, FromNewick};
    /// let node = Node::from_newick("A:0.5[&&NHX:Condition=2:Transition=2]")?;
    /// assert_eq!(node.label, "A");
    /// assert_eq!(node.condition, 2);
    /// assert_eq!(node.transition, Some(2));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Self, Report> {
        let (bare, tags) = newick::split_nhx(newick)?;
        let bare = bare.replace(';', "");
        let label = bare.split(':').next().unwrap_or("").trim().to_string();

        let mut node = Node { label, ..Default::default() };
        for (key, value) in tags {
            match key.as_str() {
                "Condition" => {
                    node.condition = value.parse().wrap_err_with(|| {
                        eyre!("Failed to parse NHX Condition from newick: {newick}")
                    })?;
                }
                "Transition" => {
                    node.transition = Some(value.parse().wrap_err_with(|| {
                        eyre!("Failed to parse NHX Transition from newick: {newick}")
                    })?);
                }
                // other NHX tags (ex. ete3's name/dist duplicates) are ignored
                _ => (),
            }
        }

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name() -> Result<(), Report> {
        let node = Node::from_newick("Gorilla:1.5")?;
        assert_eq!(node.label, "Gorilla");
        assert_eq!(node.condition, 0);
        assert_eq!(node.transition, None);
        Ok(())
    }

    #[test]
    fn nhx_tags() -> Result<(), Report> {
        let node = Node::from_newick("x:2[&&NHX:Condition=1:Transition=1]")?;
        assert_eq!(node.condition, 1);
        assert_eq!(node.transition, Some(1));
        assert_eq!(node.nhx(), "[&&NHX:Condition=1:Transition=1]");
        Ok(())
    }

    #[test]
    fn unknown_nhx_tags_are_ignored() -> Result<(), Report> {
        let node = Node::from_newick("x[&&NHX:S=human:Condition=2]")?;
        assert_eq!(node.label, "x");
        assert_eq!(node.condition, 2);
        Ok(())
    }

    #[test]
    fn invalid_condition() {
        let result = Node::from_newick("x[&&NHX:Condition=high]");
        assert!(result.is_err());
    }
}
