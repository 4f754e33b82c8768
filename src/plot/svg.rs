//! Hand-rolled SVG output for tree and site plots.

use crate::sequence::Alignment;
use color_eyre::eyre::{eyre, Report, Result};
use convsel_phylo::Phylogeny;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Background colors keyed by condition, matching the legend diffsel users
/// know from the ete3 era.
pub const CONDITION_COLORS: [(u32, &str); 3] =
    [(0, "#E6E6FA"), (1, "#ADD8E6"), (2, "#90EE90")];
const FALLBACK_COLOR: &str = "#D3D3D3";

const ROW_HEIGHT: f32 = 18.0;
const DEPTH_STEP: f32 = 40.0;
const CELL_WIDTH: f32 = 16.0;
const FONT_SIZE: u32 = 12;
const MARGIN: f32 = 10.0;

/// Returns the display color for a condition.
pub fn condition_color(condition: u32) -> &'static str {
    CONDITION_COLORS
        .iter()
        .find_map(|(c, color)| (*c == condition).then_some(*color))
        .unwrap_or(FALLBACK_COLOR)
}

// ----------------------------------------------------------------------------
// Generator
// ----------------------------------------------------------------------------

/// Accumulates SVG elements and renders the final document.
struct Generator {
    width: f32,
    height: f32,
    elements: Vec<String>,
}

impl Generator {
    fn new() -> Self {
        Generator { width: 0.0, height: 0.0, elements: Vec::new() }
    }

    /// Grow the canvas to contain the point (x, y).
    fn cover(&mut self, x: f32, y: f32) {
        self.width = self.width.max(x + MARGIN);
        self.height = self.height.max(y + MARGIN);
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: &str, stroke: &str) {
        self.cover(x + width, y + height);
        self.elements.push(format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" \
             fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1\" />"
        ));
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.cover(x1.max(x2), y1.max(y2));
        self.elements.push(format!(
            "<line x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\" \
             stroke=\"black\" stroke-width=\"1\" />"
        ));
    }

    fn text(&mut self, x: f32, y: f32, value: &str) {
        // rough width estimate, enough to size the canvas
        self.cover(x + value.len() as f32 * FONT_SIZE as f32 * 0.6, y);
        let value = value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
        self.elements.push(format!(
            "<text x=\"{x}\" y=\"{y}\" font-family=\"monospace\" \
             font-size=\"{FONT_SIZE}\">{value}</text>"
        ));
    }

    fn render(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" \
             width=\"{}\" height=\"{}\">\n",
            self.width.ceil(),
            self.height.ceil()
        );
        for element in &self.elements {
            svg.push_str("  ");
            svg.push_str(element);
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }
}

// ----------------------------------------------------------------------------
// Tree layout
// ----------------------------------------------------------------------------

/// (x, y) canvas position of each node, as a cladogram. Tips get one row
/// each in preorder, internal nodes sit at the mean of their children.
fn layout(phylogeny: &Phylogeny) -> Result<HashMap<NodeIndex, (f32, f32)>, Report> {
    let mut positions = HashMap::new();
    let mut next_row = 0_usize;
    let root_index = phylogeny.get_root_index()?;
    layout_node(phylogeny, &root_index, 0, &mut next_row, &mut positions)?;
    Ok(positions)
}

fn layout_node(
    phylogeny: &Phylogeny,
    node_index: &NodeIndex,
    depth: usize,
    next_row: &mut usize,
    positions: &mut HashMap<NodeIndex, (f32, f32)>,
) -> Result<f32, Report> {
    let children = phylogeny.get_children(node_index)?;
    let x = MARGIN + depth as f32 * DEPTH_STEP;
    let y = if children.is_empty() {
        let y = MARGIN + ROW_HEIGHT * (*next_row as f32 + 0.5);
        *next_row += 1;
        y
    } else {
        let mut child_ys = Vec::new();
        for child in &children {
            child_ys.push(layout_node(phylogeny, child, depth + 1, next_row, positions)?);
        }
        (child_ys.iter().sum::<f32>()) / child_ys.len() as f32
    };
    positions.insert(*node_index, (x, y));
    Ok(y)
}

fn draw_tree(
    generator: &mut Generator,
    phylogeny: &Phylogeny,
    positions: &HashMap<NodeIndex, (f32, f32)>,
) -> Result<(), Report> {
    let lookup = |node_index: &NodeIndex| {
        positions
            .get(node_index)
            .copied()
            .ok_or_else(|| eyre!("Node {node_index:?} is missing a layout position."))
    };

    // branches first so the badges draw on top
    for node_index in phylogeny.preorder()? {
        let (x, y) = lookup(&node_index)?;
        for child in phylogeny.get_children(&node_index)? {
            let (cx, cy) = lookup(&child)?;
            generator.line(x, y, x, cy);
            generator.line(x, cy, cx, cy);
        }
    }

    for node_index in phylogeny.preorder()? {
        let node = phylogeny.get_node(&node_index)?;
        let (x, y) = lookup(&node_index)?;

        // numbered badge colored by condition, red border on a transition
        let stroke = match node.transition.is_some() {
            true => "red",
            false => "black",
        };
        let badge = node.index.to_string();
        let badge_width = (badge.len() as f32 + 1.0) * FONT_SIZE as f32 * 0.6;
        generator.rect(
            x - badge_width / 2.0,
            y - ROW_HEIGHT / 2.0 + 2.0,
            badge_width,
            ROW_HEIGHT - 4.0,
            condition_color(node.condition),
            stroke,
        );
        generator.text(x - badge.len() as f32 * FONT_SIZE as f32 * 0.3, y + 4.0, &badge);

        if phylogeny.get_children(&node_index)?.is_empty() {
            generator.text(x + badge_width, y + 4.0, &node.label);
        }
    }

    Ok(())
}

fn draw_legend(generator: &mut Generator, phylogeny: &Phylogeny, x: f32, y: f32) {
    for (i, condition) in phylogeny.conditions().into_iter().enumerate() {
        let row_y = y + i as f32 * ROW_HEIGHT;
        generator.rect(
            x,
            row_y,
            CELL_WIDTH,
            ROW_HEIGHT - 4.0,
            condition_color(condition),
            "black",
        );
        generator.text(x + CELL_WIDTH + 4.0, row_y + ROW_HEIGHT - 6.0, &format!("Condition {condition}"));
    }
}

// ----------------------------------------------------------------------------
// Plots
// ----------------------------------------------------------------------------

/// Render the condition-annotated tree on its own, with a condition legend.
pub fn render_tree(phylogeny: &Phylogeny) -> Result<String, Report> {
    let mut generator = Generator::new();
    let positions = layout(phylogeny)?;
    draw_tree(&mut generator, phylogeny, &positions)?;

    let legend_y = generator.height + ROW_HEIGHT;
    draw_legend(&mut generator, phylogeny, MARGIN, legend_y);

    Ok(generator.render())
}

/// Render the tree next to the alignment columns of the convergent sites.
///
/// `selected` maps each detection method to its sites above threshold. Only
/// the union of selected sites is drawn, one alignment column each, with the
/// per-method hits marked above the grid.
pub fn render_sites(
    phylogeny: &Phylogeny,
    alignment: &Alignment,
    selected: &BTreeMap<String, Vec<usize>>,
) -> Result<String, Report> {
    let sites: BTreeSet<usize> = selected.values().flatten().copied().collect();

    let mut generator = Generator::new();
    let positions = layout(phylogeny)?;
    draw_tree(&mut generator, phylogeny, &positions)?;

    // grid starts right of the tree pane, below the method hit rows
    let grid_x = generator.width + CELL_WIDTH;
    let header_rows = selected.len() + 1;
    let header_height = header_rows as f32 * ROW_HEIGHT;

    // per-method hit markers, one row per method
    for (method_i, (method, method_sites)) in selected.iter().enumerate() {
        let y = MARGIN + method_i as f32 * ROW_HEIGHT;
        // long method names would otherwise push the label off-canvas
        let label_x = (grid_x - CELL_WIDTH - method.len() as f32 * FONT_SIZE as f32 * 0.6).max(MARGIN);
        generator.text(label_x, y + ROW_HEIGHT - 6.0, method);
        for (site_i, site) in sites.iter().enumerate() {
            if method_sites.contains(site) {
                let x = grid_x + site_i as f32 * CELL_WIDTH;
                generator.rect(x, y, CELL_WIDTH - 2.0, ROW_HEIGHT - 4.0, "black", "black");
            }
        }
    }

    // site numbers
    for (site_i, site) in sites.iter().enumerate() {
        let x = grid_x + site_i as f32 * CELL_WIDTH;
        let y = MARGIN + (header_rows - 1) as f32 * ROW_HEIGHT + ROW_HEIGHT - 6.0;
        generator.text(x, y, &site.to_string());
    }

    // one residue cell per tip and site, colored by the tip's condition
    for tip_index in phylogeny.get_tips()? {
        let tip = phylogeny.get_node(&tip_index)?;
        let (_x, y) = positions
            .get(&tip_index)
            .copied()
            .ok_or_else(|| eyre!("Tip {tip_index:?} is missing a layout position."))?;
        let record = alignment
            .get(&tip.label)
            .ok_or_else(|| eyre!("Tip {} is not in the alignment.", tip.label))?;

        for (site_i, site) in sites.iter().enumerate() {
            let residue = record
                .sequence
                .get(*site)
                .ok_or_else(|| eyre!("Site {site} is out of range for {}.", record.id))?;
            let x = grid_x + site_i as f32 * CELL_WIDTH;
            generator.rect(
                x,
                y + header_height - ROW_HEIGHT / 2.0 + 2.0,
                CELL_WIDTH - 2.0,
                ROW_HEIGHT - 4.0,
                condition_color(tip.condition),
                "black",
            );
            generator.text(
                x + CELL_WIDTH * 0.25,
                y + header_height + 4.0,
                &residue.to_string(),
            );
        }
    }

    let legend_y = generator.height + ROW_HEIGHT;
    draw_legend(&mut generator, phylogeny, MARGIN, legend_y);

    Ok(generator.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{Alignment, Record};
    use convsel_phylo::FromNewick;

    fn alignment() -> Alignment {
        let records = vec![
            Record { id: "A".to_string(), sequence: "MKLV".chars().collect() },
            Record { id: "B".to_string(), sequence: "MKIV".chars().collect() },
            Record { id: "C".to_string(), sequence: "MRIV".chars().collect() },
        ];
        Alignment { records, length: 4, path: None }
    }

    #[test]
    fn color_lookup() {
        assert_eq!(condition_color(1), "#ADD8E6");
        assert_eq!(condition_color(9), FALLBACK_COLOR);
    }

    #[test]
    fn tree_snapshot() -> Result<(), Report> {
        let mut phylogeny = Phylogeny::from_newick("((A:1,B:1)AB:0.5,C:2)root;")?;
        phylogeny.mark_subtree(1, 1, Some(2), false)?;
        let svg = render_tree(&phylogeny)?;

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">A</text>"));
        assert!(svg.contains("#ADD8E6"));
        assert!(svg.contains("Condition 2"));
        Ok(())
    }

    #[test]
    fn site_grid() -> Result<(), Report> {
        let phylogeny = Phylogeny::from_newick("((A:1,B:1)AB:0.5,C:2)root;")?;
        let selected = BTreeMap::from([("Diffsel".to_string(), vec![2, 3])]);
        let svg = render_sites(&phylogeny, &alignment(), &selected)?;

        assert!(svg.contains(">Diffsel</text>"));
        // residues at the two selected columns
        assert!(svg.contains(">L</text>"));
        assert!(svg.contains(">V</text>"));
        Ok(())
    }

    #[test]
    fn long_method_label_stays_on_canvas() -> Result<(), Report> {
        let phylogeny = Phylogeny::from_newick("((A:1,B:1)AB:0.5,C:2)root;")?;
        let method = "DiffselWithAVeryLongMethodName".to_string();
        let selected = BTreeMap::from([(method.clone(), vec![0])]);
        let svg = render_sites(&phylogeny, &alignment(), &selected)?;

        assert!(svg.contains(&format!(">{method}</text>")));
        assert!(!svg.contains("x=\"-"));
        Ok(())
    }

    #[test]
    fn tip_missing_from_alignment() -> Result<(), Report> {
        let phylogeny = Phylogeny::from_newick("((A:1,D:1)AD:0.5,C:2)root;")?;
        let selected = BTreeMap::from([("Diffsel".to_string(), vec![0])]);
        assert!(render_sites(&phylogeny, &alignment(), &selected).is_err());
        Ok(())
    }
}
