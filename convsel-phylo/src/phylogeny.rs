use crate::{newick, Branch, FromNewick, Node, ToNewick};

use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::IntoNodeReferences;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rooted [`Phylogeny`] of [`Node`]s connected by [`Branch`]es.
///
/// The tree is stored as a directed graph of parents and children. Every node
/// carries an operator-facing index assigned by [`assign_indices`](Phylogeny::assign_indices)
/// and an experimental condition that [`mark_subtree`](Phylogeny::mark_subtree)
/// propagates to descendants.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Phylogeny {
    /// Directed graph of parents and children.
    pub graph: Graph<Node, Branch>,
}

impl Default for Phylogeny {
    fn default() -> Self {
        Self::new()
    }
}

impl Phylogeny {
    /// Returns a new empty [`Phylogeny`].
    pub fn new() -> Self {
        Phylogeny { graph: Graph::new() }
    }

    /// Returns true if the [`Phylogeny`] has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Adds a node to the [`Phylogeny`] and returns the [`NodeIndex`].
    ///
    /// If an equal node already exists, returns the existing [`NodeIndex`].
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        match self.get_node_index(&node) {
            Ok(node_index) => node_index,
            Err(_) => self.graph.add_node(node),
        }
    }

    /// Creates a branch between the parent and child nodes and returns the [`EdgeIndex`].
    ///
    /// - If the parent and child nodes don't exist yet in the phylogeny, they are created.
    /// - If the new branch would create a cycle, returns an Error.
    pub fn add_branch(&mut self, parent: Node, child: Node, branch: Branch) -> Result<EdgeIndex, Report> {
        let parent_label = parent.label.clone();
        let child_label = child.label.clone();

        let parent_node_index = self.add_node(parent);
        let child_node_index = self.add_node(child);
        let edge_index = self.graph.update_edge(parent_node_index, child_node_index, branch);

        if is_cyclic_directed(&self.graph) {
            Err(eyre!("New branch between {parent_label} and {child_label} introduced a cycle."))?
        }

        Ok(edge_index)
    }

    /// Returns the node that corresponds to the [`NodeIndex`].
    pub fn get_node(&self, node_index: &NodeIndex) -> Result<&Node, Report> {
        self.graph
            .node_weight(*node_index)
            .ok_or_else(|| eyre!("Failed to get node data for node index {node_index:?}"))
    }

    /// Returns the branch that corresponds to the [`EdgeIndex`].
    pub fn get_branch(&self, edge_index: &EdgeIndex) -> Result<&Branch, Report> {
        self.graph
            .edge_weight(*edge_index)
            .ok_or_else(|| eyre!("Failed to get branch of edge index: {edge_index:?}"))
    }

    /// Returns the [`NodeIndex`] of a node equal to the query.
    pub fn get_node_index(&self, node: &Node) -> Result<NodeIndex, Report> {
        self.graph
            .node_references()
            .filter_map(|(i, n)| (*n == *node).then_some(i))
            .next()
            .ok_or_else(|| eyre!("Failed to get node index of node {node}"))
    }

    /// Returns the [`NodeIndex`] of the node with the requested operator index.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    /// let b = phylo.locate(3)?;
    /// assert_eq!(phylo.get_node(&b)?.label, "B");
    /// assert!(phylo.locate(42).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn locate(&self, index: usize) -> Result<NodeIndex, Report> {
        self.graph
            .node_references()
            .filter_map(|(i, n)| (n.index == index).then_some(i))
            .next()
            .ok_or_else(|| eyre!("Node index {index} is not in the tree"))
    }

    /// Returns the node with the requested operator index.
    pub fn get(&self, index: usize) -> Result<&Node, Report> {
        let node_index = self.locate(index)?;
        self.get_node(&node_index)
    }

    /// Returns the [`NodeIndex`] of the root.
    ///
    /// If no root or multiple roots are found, returns an Error.
    pub fn get_root_index(&self) -> Result<NodeIndex, Report> {
        if self.is_empty() {
            Err(eyre!("Failed to locate a root in the phylogeny, the graph is empty."))?
        }
        // the root is the only node with no incoming branches
        let root_indices: Vec<_> = self
            .graph
            .node_indices()
            .filter(|i| 0 == self.graph.edges_directed(*i, Direction::Incoming).count())
            .collect();

        match root_indices.len() {
            0 => Err(eyre!("Failed to locate a root in the phylogeny."))?,
            1 => Ok(root_indices[0]),
            _ => Err(eyre!(
                "Failed to locate a root in the phylogeny, multiple roots found: {root_indices:?}"
            ))?,
        }
    }

    /// Returns the root node.
    pub fn get_root(&self) -> Result<&Node, Report> {
        let root_index = self.get_root_index()?;
        self.get_node(&root_index)
    }

    /// Returns immediate children of the requested node, in insertion order.
    pub fn get_children(&self, node_index: &NodeIndex) -> Result<Vec<NodeIndex>, Report> {
        let mut children: Vec<_> = self.graph.neighbors(*node_index).collect();
        // neighbor order is last added to first added, reverse this
        children.reverse();
        Ok(children)
    }

    /// Returns the immediate parent of the requested node, [`None`] for the root.
    pub fn get_parent(&self, node_index: &NodeIndex) -> Result<Option<NodeIndex>, Report> {
        let parents: Vec<_> =
            self.graph.neighbors_directed(*node_index, Direction::Incoming).collect();
        match parents.len() {
            0 => Ok(None),
            1 => Ok(Some(parents[0])),
            _ => {
                let node = self.get_node(node_index)?;
                Err(eyre!("Node {node} has multiple parents, the phylogeny is not a tree."))?
            }
        }
    }

    /// Returns the sibling subtree roots of the requested node.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    /// let ab = phylo.locate(1)?;
    /// let sisters = phylo.get_sisters(&ab)?;
    /// assert_eq!(sisters.len(), 1);
    /// assert_eq!(phylo.get_node(&sisters[0])?.label, "C");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_sisters(&self, node_index: &NodeIndex) -> Result<Vec<NodeIndex>, Report> {
        let Some(parent) = self.get_parent(node_index)? else {
            return Ok(Vec::new());
        };
        let sisters =
            self.get_children(&parent)?.into_iter().filter(|i| i != node_index).collect();
        Ok(sisters)
    }

    /// Returns all descendants of the requested node in preorder, excluding itself.
    pub fn get_descendants(&self, node_index: &NodeIndex) -> Result<Vec<NodeIndex>, Report> {
        let mut order = self.preorder_from(node_index)?;
        order.remove(0);
        Ok(order)
    }

    /// Returns the tips (leaves) of the tree in preorder.
    pub fn get_tips(&self) -> Result<Vec<NodeIndex>, Report> {
        let tips = self
            .preorder()?
            .into_iter()
            .filter(|i| self.graph.neighbors(*i).count() == 0)
            .collect();
        Ok(tips)
    }

    /// Returns all nodes in a depth-first preorder from the root.
    ///
    /// This is the fixed traversal order behind every operator-facing index.
    pub fn preorder(&self) -> Result<Vec<NodeIndex>, Report> {
        let root_index = self.get_root_index()?;
        self.preorder_from(&root_index)
    }

    fn preorder_from(&self, node_index: &NodeIndex) -> Result<Vec<NodeIndex>, Report> {
        let mut order = vec![*node_index];
        for child in self.get_children(node_index)? {
            order.extend(self.preorder_from(&child)?);
        }
        Ok(order)
    }

    /// Numbers all nodes 0..n by the fixed preorder traversal.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    /// // indices are assigned during parsing: root=0, AB=1, A=2, B=3, C=4
    /// assert_eq!(phylo.get(0)?.label, "root");
    /// assert_eq!(phylo.get(2)?.label, "A");
    /// assert_eq!(phylo.get(4)?.label, "C");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn assign_indices(&mut self) -> Result<(), Report> {
        let order = self.preorder()?;
        order.into_iter().enumerate().for_each(|(i, node_index)| {
            if let Some(node) = self.graph.node_weight_mut(node_index) {
                node.index = i;
            }
        });
        Ok(())
    }

    /// Sets every node back to condition 0 with no transition.
    pub fn reset_conditions(&mut self) {
        self.graph.node_weights_mut().for_each(|node| {
            node.condition = 0;
            node.transition = None;
        });
    }

    /// Returns the distinct conditions present in the tree, sorted.
    pub fn conditions(&self) -> Vec<u32> {
        self.graph.node_references().map(|(_, n)| n.condition).unique().sorted().collect()
    }

    /// Assigns a condition to the node with the requested operator index and
    /// to all of its descendants.
    ///
    /// ## Arguments
    ///
    /// - `index` - Operator index of the subtree root.
    /// - `condition` - The condition to assign to the subtree.
    /// - `sister_condition` - If [`Some`], also assign this condition to every
    ///   sibling subtree whose root is not already at `condition`.
    /// - `transition` - If true, record the new condition as a transition tag
    ///   at the root of each relabeled subtree.
    ///
    /// An unknown `index` returns an Error and leaves the tree untouched, so
    /// the caller can report it and prompt again.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let mut phylo = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    /// phylo.mark_subtree(1, 1, Some(2), false)?;
    /// assert_eq!(phylo.get(1)?.condition, 1); // AB
    /// assert_eq!(phylo.get(2)?.condition, 1); // A
    /// assert_eq!(phylo.get(3)?.condition, 1); // B
    /// assert_eq!(phylo.get(4)?.condition, 2); // C, the sister subtree
    /// assert_eq!(phylo.get(0)?.condition, 0); // root is untouched
    ///
    /// assert!(phylo.mark_subtree(42, 1, None, false).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn mark_subtree(
        &mut self,
        index: usize,
        condition: u32,
        sister_condition: Option<u32>,
        transition: bool,
    ) -> Result<(), Report> {
        let node_index = self.locate(index)?;
        self.set_subtree_condition(&node_index, condition, transition)?;

        if let Some(sister_condition) = sister_condition {
            for sister in self.get_sisters(&node_index)? {
                if self.get_node(&sister)?.condition == condition {
                    continue;
                }
                self.set_subtree_condition(&sister, sister_condition, transition)?;
            }
        }

        Ok(())
    }

    fn set_subtree_condition(
        &mut self,
        node_index: &NodeIndex,
        condition: u32,
        transition: bool,
    ) -> Result<(), Report> {
        let mut targets = vec![*node_index];
        targets.extend(self.get_descendants(node_index)?);
        for target in targets {
            if let Some(node) = self.graph.node_weight_mut(target) {
                node.condition = condition;
            }
        }
        if transition {
            if let Some(node) = self.graph.node_weight_mut(*node_index) {
                node.transition = Some(condition);
            }
        }
        Ok(())
    }

    /// Returns a plain-text rendering of the tree with `[index|condition]`
    /// badges, for the interactive selection prompt.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    /// let expected = "\
    /// [0|0] root
    /// ├── [1|0] AB
    /// │   ├── [2|0] A
    /// │   └── [3|0] B
    /// └── [4|0] C
    /// ";
    /// assert_eq!(phylo.to_display()?, expected);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_display(&self) -> Result<String, Report> {
        let root_index = self.get_root_index()?;
        let mut out = String::new();
        self.display_node(&root_index, "", "", &mut out)?;
        Ok(out)
    }

    fn display_node(
        &self,
        node_index: &NodeIndex,
        line_prefix: &str,
        descent_prefix: &str,
        out: &mut String,
    ) -> Result<(), Report> {
        let node = self.get_node(node_index)?;
        let marker = match node.transition.is_some() {
            true => "*",
            false => "",
        };
        out.push_str(&format!(
            "{line_prefix}[{}|{}]{marker} {node}\n",
            node.index, node.condition
        ));

        let children = self.get_children(node_index)?;
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let (connector, extension) = match i + 1 == count {
                true => ("└── ", "    "),
                false => ("├── ", "│   "),
            };
            self.display_node(
                &child,
                &format!("{descent_prefix}{connector}"),
                &format!("{descent_prefix}{extension}"),
                out,
            )?;
        }
        Ok(())
    }

    fn newick_of(&self, node_index: &NodeIndex) -> Result<String, Report> {
        let node = self.get_node(node_index)?;
        let label = match node.anonymous {
            true => "",
            false => node.label.as_str(),
        };
        let children = self.get_children(node_index)?;
        if children.is_empty() {
            return Ok(label.to_string());
        }
        let inner = children
            .iter()
            .map(|child| {
                let edge_index = self.graph.find_edge(*node_index, *child).ok_or_else(|| {
                    eyre!("Failed to find the branch between nodes {node_index:?} and {child:?}")
                })?;
                let branch = self.get_branch(&edge_index)?;
                let child_node = self.get_node(child)?;
                Ok(format!("{}:{}{}", self.newick_of(child)?, branch.length, child_node.nhx()))
            })
            .collect::<Result<Vec<_>, Report>>()?
            .join(",");
        Ok(format!("({inner}){label}"))
    }
}

impl FromNewick for Phylogeny {
    /// Returns a [`Phylogeny`] created from a Newick string, with NHX
    /// condition tags restored and operator indices assigned.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, Phylogeny};
    /// let phylo = Phylogeny::from_newick("((A:1,B:1):0.5,C:2);")?;
    /// assert_eq!(phylo.get_root()?.label, "NODE_0");
    /// assert_eq!(phylo.get_tips()?.len(), 3);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Phylogeny, Report> {
        let newick = newick.trim().trim_end_matches(';').trim();
        if newick.is_empty() {
            Err(eyre!("Newick string is empty."))?
        }
        let elements = newick::split_top_level(newick);
        if elements.len() != 1 {
            Err(eyre!("Newick string has multiple root elements: {newick}"))?
        }

        let element = elements[0].trim();
        let mut node_i = 0;
        let mut phylogeny = Phylogeny::new();

        match newick::matching_paren(element)? {
            Some(inner_end) => {
                let inner = &element[1..inner_end];
                let rest = &element[inner_end + 1..];
                let root = newick::node_from_fragment(rest, &mut node_i)?;

                // every parsed node gets a fresh graph node, keyed by its
                // parse index, so duplicate labels stay distinct
                let mut node_indices = HashMap::new();
                node_indices.insert(root.index, phylogeny.graph.add_node(root.clone()));
                for (parent, child, branch) in newick::str_to_vec(inner, &root, &mut node_i)? {
                    let parent_index = *node_indices.get(&parent.index).ok_or_else(|| {
                        eyre!("Parent node {parent} was parsed out of order.")
                    })?;
                    let child_index = phylogeny.graph.add_node(child.clone());
                    node_indices.insert(child.index, child_index);
                    phylogeny.graph.add_edge(parent_index, child_index, branch);
                }
            }
            // no parentheses at all, a single-node tree
            None => {
                phylogeny.graph.add_node(newick::node_from_fragment(element, &mut node_i)?);
            }
        }

        phylogeny.assign_indices()?;
        Ok(phylogeny)
    }
}

impl ToNewick for Phylogeny {
    /// Returns the NHX-tagged Newick string of the [`Phylogeny`].
    ///
    /// Every node carries a `Condition` tag, plus a `Transition` tag when one
    /// was recorded. Anonymous internal nodes serialize back to empty names.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel_phylo::{FromNewick, ToNewick, Phylogeny};
    /// let mut phylo = Phylogeny::from_newick("(A:1,B:2)root;")?;
    /// phylo.mark_subtree(1, 1, None, false)?;
    /// let expected =
    ///     "(A:1[&&NHX:Condition=1],B:2[&&NHX:Condition=0])root[&&NHX:Condition=0];";
    /// assert_eq!(phylo.to_newick()?, expected);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn to_newick(&self) -> Result<String, Report> {
        let root_index = self.get_root_index()?;
        let root = self.get_node(&root_index)?;
        Ok(format!("{}{};", self.newick_of(&root_index)?, root.nhx()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEWICK: &str = "((A:1,B:1)AB:0.5,C:2)root;";

    #[test]
    fn preorder_indices() -> Result<(), Report> {
        let phylo = Phylogeny::from_newick(NEWICK)?;
        let labels: Vec<_> = phylo
            .preorder()?
            .iter()
            .map(|i| phylo.get_node(i).map(|n| n.label.clone()))
            .collect::<Result<_, Report>>()?;
        assert_eq!(labels, ["root", "AB", "A", "B", "C"]);
        Ok(())
    }

    #[test]
    fn anonymous_internal_nodes() -> Result<(), Report> {
        let phylo = Phylogeny::from_newick("((A,B),(C,D));")?;
        assert_eq!(phylo.graph.node_count(), 7);
        let root = phylo.get_root()?;
        assert!(root.anonymous);
        // anonymous nodes serialize back to empty names
        let newick = phylo.to_newick()?;
        assert!(newick.starts_with("((A"));
        assert!(!newick.contains("NODE_"));
        Ok(())
    }

    #[test]
    fn duplicate_tip_labels() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick("((A,B)X,(A,C)Y)root;")?;
        assert_eq!(phylo.graph.node_count(), 7);
        let preorder = phylo.preorder()?;
        assert_eq!(preorder.len(), 7);
        let mut indices: Vec<_> = preorder
            .iter()
            .map(|i| phylo.get_node(i).map(|n| n.index))
            .collect::<Result<_, Report>>()?;
        indices.sort();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
        // marking one duplicate-labeled tip leaves the other alone
        phylo.mark_subtree(2, 1, None, false)?;
        assert_eq!(phylo.get(2)?.condition, 1);
        assert_eq!(phylo.get(5)?.condition, 0);
        Ok(())
    }

    #[test]
    fn mark_subtree_propagates() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick(NEWICK)?;
        phylo.mark_subtree(1, 1, None, false)?;
        assert_eq!(phylo.get(1)?.condition, 1);
        assert_eq!(phylo.get(2)?.condition, 1);
        assert_eq!(phylo.get(3)?.condition, 1);
        assert_eq!(phylo.get(0)?.condition, 0);
        assert_eq!(phylo.get(4)?.condition, 0);
        Ok(())
    }

    #[test]
    fn mark_subtree_sisters_and_transitions() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick(NEWICK)?;
        phylo.mark_subtree(1, 1, Some(2), true)?;
        assert_eq!(phylo.get(1)?.transition, Some(1));
        assert_eq!(phylo.get(4)?.condition, 2);
        assert_eq!(phylo.get(4)?.transition, Some(2));
        assert_eq!(phylo.get(0)?.transition, None);
        Ok(())
    }

    #[test]
    fn mark_subtree_unknown_index() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick(NEWICK)?;
        let result = phylo.mark_subtree(99, 1, None, false);
        assert!(result.is_err());
        // the tree is untouched
        assert_eq!(phylo.conditions(), [0]);
        Ok(())
    }

    #[test]
    fn nhx_round_trip() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick(NEWICK)?;
        phylo.mark_subtree(1, 1, Some(2), true)?;
        let newick = phylo.to_newick()?;

        let restored = Phylogeny::from_newick(&newick)?;
        assert_eq!(restored.get(1)?.condition, 1);
        assert_eq!(restored.get(1)?.transition, Some(1));
        assert_eq!(restored.get(4)?.condition, 2);
        assert_eq!(restored.to_newick()?, newick);
        Ok(())
    }

    #[test]
    fn reset_conditions() -> Result<(), Report> {
        let mut phylo = Phylogeny::from_newick(NEWICK)?;
        phylo.mark_subtree(1, 1, Some(2), true)?;
        phylo.reset_conditions();
        assert_eq!(phylo.conditions(), [0]);
        assert_eq!(phylo.get(1)?.transition, None);
        Ok(())
    }

    #[test]
    fn multiple_roots() {
        assert!(Phylogeny::from_newick("A,B;").is_err());
    }

    #[test]
    fn cycle_rejected() -> Result<(), Report> {
        let mut phylo = Phylogeny::new();
        let a = Node { label: "A".to_string(), ..Default::default() };
        let b = Node { label: "B".to_string(), ..Default::default() };
        phylo.add_branch(a.clone(), b.clone(), Branch::new())?;
        assert!(phylo.add_branch(b, a, Branch::new()).is_err());
        Ok(())
    }

    #[test]
    fn single_node_tree() -> Result<(), Report> {
        let phylo = Phylogeny::from_newick("A;")?;
        assert_eq!(phylo.get_root()?.label, "A");
        assert_eq!(phylo.get_tips()?.len(), 1);
        Ok(())
    }
}
