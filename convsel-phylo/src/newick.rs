//! Newick and NHX string parsing.

use crate::{Branch, FromNewick, Node};

use color_eyre::eyre::{eyre, Report, Result};

/// Returns a vector of `(parent, child, branch)` links from the content of a
/// Newick subtree, recursing into nested parentheses.
///
/// # Arguments
///
/// - `newick` - The content of a subtree, without its outer parentheses
///   (ex. `"A:1,(B:1,C:1):0.5"`).
/// - `parent` - The parent [`Node`] of every top-level element in `newick`.
/// - `node_i` - Counter for labeling anonymous internal nodes. Threaded as a
///   mutable reference so that nested anonymous nodes receive unique labels.
///
/// # Examples
///
/// ```rust
/// use convsel_phylo::{newick, FromNewick, Node};
/// let root = Node::from_newick("R")?;
/// let mut node_i = 0;
/// let links = newick::str_to_vec("A:1,B:2", &root, &mut node_i)?;
/// assert_eq!(links.len(), 2);
/// assert_eq!(links[0].0.label, "R");
/// assert_eq!(links[0].1.label, "A");
/// assert_eq!(links[1].2.length, 2.0);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn str_to_vec(
    newick: &str,
    parent: &Node,
    node_i: &mut usize,
) -> Result<Vec<(Node, Node, Branch)>, Report> {
    let mut links = Vec::new();

    for element in split_top_level(newick) {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }
        match matching_paren(element)? {
            // Nested subtree: "(...)name:length[&&NHX:...]"
            Some(inner_end) => {
                let inner = &element[1..inner_end];
                let rest = &element[inner_end + 1..];
                let node = node_from_fragment(rest, node_i)?;
                let branch = Branch::from_newick(rest)?;
                links.push((parent.clone(), node.clone(), branch));
                links.extend(str_to_vec(inner, &node, node_i)?);
            }
            // Tip: "name:length[&&NHX:...]"
            None => {
                let node = node_from_fragment(element, node_i)?;
                let branch = Branch::from_newick(element)?;
                links.push((parent.clone(), node, branch));
            }
        }
    }

    Ok(links)
}

/// Parse a node fragment, assigning the node its parse-order index.
///
/// The counter is bumped for every node, so each parsed node is uniquely
/// identified by its index even when tip labels repeat. Anonymous nodes are
/// labeled from the same counter (ex. `NODE_3`).
pub(crate) fn node_from_fragment(fragment: &str, node_i: &mut usize) -> Result<Node, Report> {
    let mut node = Node::from_newick(fragment)?;
    node.index = *node_i;
    if node.label.is_empty() {
        node.label = format!("NODE_{node_i}");
        node.anonymous = true;
    }
    *node_i += 1;
    Ok(node)
}

/// Split a Newick fragment into its bare part and NHX `(key, value)` tags.
///
/// ```rust
/// use convsel_phylo::newick::split_nhx;
/// let (bare, tags) = split_nhx("A:0.5[&&NHX:Condition=1]")?;
/// assert_eq!(bare, "A:0.5");
/// assert_eq!(tags, vec![("Condition".to_string(), "1".to_string())]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn split_nhx(fragment: &str) -> Result<(String, Vec<(String, String)>), Report> {
    let Some(start) = fragment.find('[') else {
        return Ok((fragment.to_string(), Vec::new()));
    };
    let end = fragment
        .find(']')
        .ok_or_else(|| eyre!("Unterminated comment in newick fragment: {fragment}"))?;
    let bare = format!("{}{}", &fragment[..start], &fragment[end + 1..]);
    let comment = &fragment[start + 1..end];

    // comments other than NHX are stripped and ignored
    let Some(comment) = comment.strip_prefix("&&NHX") else {
        return Ok((bare, Vec::new()));
    };

    let tags = comment
        .split(':')
        .filter(|t| !t.is_empty())
        .map(|tag| {
            let (key, value) = tag
                .split_once('=')
                .ok_or_else(|| eyre!("Invalid NHX tag {tag:?} in newick fragment: {fragment}"))?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect::<Result<Vec<_>, Report>>()?;

    Ok((bare, tags))
}

/// Split Newick content on commas at parenthesis depth zero.
pub(crate) fn split_top_level(newick: &str) -> Vec<&str> {
    let mut elements = Vec::new();
    let (mut depth, mut in_comment, mut start) = (0usize, false, 0usize);

    for (i, c) in newick.char_indices() {
        match c {
            '[' => in_comment = true,
            ']' => in_comment = false,
            '(' if !in_comment => depth += 1,
            ')' if !in_comment => depth = depth.saturating_sub(1),
            ',' if !in_comment && depth == 0 => {
                elements.push(&newick[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }
    elements.push(&newick[start..]);
    elements
}

/// If the element begins with `(`, return the index of its matching `)`.
pub(crate) fn matching_paren(element: &str) -> Result<Option<usize>, Report> {
    if !element.starts_with('(') {
        return Ok(None);
    }
    let mut depth = 0;
    for (i, c) in element.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(i));
                }
            }
            _ => (),
        }
    }
    Err(eyre!("Failed to find matching outer parentheses in newick: {element}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FromNewick;

    #[test]
    fn top_level_split_ignores_nested_commas() {
        let elements = split_top_level("A:1,(B,C):0.5,D");
        assert_eq!(elements, ["A:1", "(B,C):0.5", "D"]);
    }

    #[test]
    fn top_level_split_ignores_comments() {
        let elements = split_top_level("A[&&NHX:Condition=1],B");
        assert_eq!(elements, ["A[&&NHX:Condition=1]", "B"]);
    }

    #[test]
    fn nested_anonymous_nodes_are_unique() -> Result<(), Report> {
        let root = Node::from_newick("R")?;
        let mut node_i = 0;
        // ((A,B),(C,D)) relative to root R: two anonymous internal nodes
        let links = str_to_vec("(A,B),(C,D)", &root, &mut node_i)?;
        assert_eq!(links.len(), 6);
        assert_eq!(links[0].1.label, "NODE_0");
        assert_eq!(links[3].1.label, "NODE_3");
        assert!(links[0].1.anonymous);
        Ok(())
    }

    #[test]
    fn duplicate_labels_get_distinct_indices() -> Result<(), Report> {
        let root = Node::from_newick("R")?;
        let mut node_i = 0;
        // the same tip label under two different parents
        let links = str_to_vec("(A,B)X,(A,C)Y", &root, &mut node_i)?;
        assert_eq!(links.len(), 6);
        let first_a = &links[1].1;
        let second_a = &links[4].1;
        assert_eq!(first_a.label, "A");
        assert_eq!(second_a.label, "A");
        assert_ne!(first_a.index, second_a.index);
        Ok(())
    }

    #[test]
    fn anonymous_node_with_branch_length() -> Result<(), Report> {
        let root = Node::from_newick("R")?;
        let mut node_i = 0;
        let links = str_to_vec("(A:1,B:1):0.5,C:2", &root, &mut node_i)?;
        // R->NODE_0 (0.5), NODE_0->A, NODE_0->B, R->C
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].1.label, "NODE_0");
        assert_eq!(links[0].2.length, 0.5);
        assert_eq!(links[1].0.label, "NODE_0");
        assert_eq!(links[3].2.length, 2.0);
        Ok(())
    }

    #[test]
    fn unbalanced_parentheses() {
        assert!(matching_paren("((A,B)").is_err());
    }
}
