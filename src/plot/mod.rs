//! Draw convergent sites against the annotated tree and alignment.
//!
//! The score table has a `Sites` column plus one column per detection
//! method. A site counts as convergent for a method when its score is
//! strictly above the method's threshold.

pub mod svg;

use crate::{sequence::Alignment, utils, Table};
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use convsel_phylo::{FromNewick, Phylogeny};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Args
// ----------------------------------------------------------------------------

/// Draw convergent sites against the annotated tree and alignment.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
pub struct Args {
    /// Score table with a "Sites" column and one column per detection method.
    #[clap(long, required = true)]
    pub tsv: PathBuf,

    /// Protein alignment (fasta format).
    #[clap(long, required = true)]
    pub msa: PathBuf,

    /// Condition-annotated tree (NHX format).
    #[clap(long, required = true)]
    pub tree: PathBuf,

    /// Output file (svg format). Defaults to <tsv>.svg.
    #[clap(short = 'o', long = "out")]
    pub output: Option<PathBuf>,

    /// Restrict the plot to these method columns.
    #[clap(long, value_delimiter = ',')]
    pub methods: Option<Vec<String>>,

    /// Per-method score thresholds, as method:value pairs.
    ///
    /// Methods without a threshold default to 0.99, or 99 when their scores
    /// exceed 1.
    #[clap(short = 't', long, value_delimiter = ',')]
    pub thresholds: Option<Vec<String>>,
}

// ----------------------------------------------------------------------------
// Plot
// ----------------------------------------------------------------------------

/// Select the convergent sites per method and render the SVG plot.
pub fn plot(args: &Args) -> Result<(), Report> {
    let table = Table::read(&args.tsv, Some('\t'))?;
    let methods = detect_methods(&table, args.methods.as_deref())?;
    info!("Methods to plot: {}", methods.iter().join(", "));

    let thresholds = parse_thresholds(args.thresholds.as_deref().unwrap_or_default())?;

    let sites = table
        .get_column("Sites")?
        .into_iter()
        .map(|site| {
            site.parse::<usize>()
                .wrap_err(format!("Failed to parse site index {site:?} in: {:?}", args.tsv))
        })
        .collect::<Result<Vec<_>, Report>>()?;

    let mut selected = BTreeMap::new();
    for method in &methods {
        let values = table
            .get_column(method)?
            .into_iter()
            .map(|value| {
                value
                    .parse::<f64>()
                    .wrap_err(format!("Failed to parse {method} score {value:?} in: {:?}", args.tsv))
            })
            .collect::<Result<Vec<_>, Report>>()?;
        let threshold = thresholds.get(method).copied().unwrap_or_else(|| default_threshold(&values));
        let method_sites = select_sites(&sites, &values, threshold);
        info!("{method}: > {threshold} ({} sites)", method_sites.len());
        selected.insert(method.clone(), method_sites);
    }

    let alignment = Alignment::read(&args.msa)?;
    let phylogeny = Phylogeny::from_newick(&utils::read_to_string(&args.tree)?)?;
    check_tips(&phylogeny, &alignment)?;

    if let Some(out_of_range) = sites.iter().find(|site| **site >= alignment.length) {
        Err(eyre!(
            "Site {out_of_range} is out of range for the alignment ({} columns): {:?}",
            alignment.length,
            args.msa,
        ))?
    }

    let output =
        args.output.clone().unwrap_or_else(|| utils::append_extension(&args.tsv, "svg"));
    utils::create_parent_dir(&output)?;
    std::fs::write(&output, svg::render_sites(&phylogeny, &alignment, &selected)?)
        .wrap_err(format!("Failed to write plot: {output:?}"))?;
    info!("Wrote plot: {output:?}");

    Ok(())
}

/// Returns the method columns to plot.
///
/// Every non-`Sites` column is a method. If a restriction was requested,
/// unknown names are warned about and dropped.
pub fn detect_methods(table: &Table, requested: Option<&[String]>) -> Result<Vec<String>, Report> {
    table
        .get_header_index("Sites")
        .suggestion("The score table needs a 'Sites' column, as written by the analyze command.")?;

    let detected =
        table.headers.iter().filter(|h| *h != "Sites").cloned().collect::<Vec<_>>();

    let methods = match requested {
        Some(requested) => {
            requested.iter().for_each(|method| {
                if !detected.contains(method) {
                    warn!("Requested method {method:?} is not a column of the table.");
                }
            });
            detected.into_iter().filter(|method| requested.contains(method)).collect()
        }
        None => detected,
    };

    if methods.is_empty() {
        Err(eyre!("No method columns to plot in table: {:?}", table.path))?
    }
    Ok(methods)
}

/// Parse `method:value` threshold pairs.
pub fn parse_thresholds(thresholds: &[String]) -> Result<BTreeMap<String, f64>, Report> {
    thresholds
        .iter()
        .map(|entry| {
            let (method, value) = entry
                .split_once(':')
                .ok_or_else(|| {
                    eyre!("Invalid threshold: {entry:?}")
                        .suggestion("Use the form method:value, e.g. Diffsel:0.85")
                })?;
            let value = value
                .parse::<f64>()
                .wrap_err(format!("Failed to parse threshold value in: {entry:?}"))?;
            Ok((method.to_string(), value))
        })
        .collect()
}

/// Default threshold for a method, picked by the scale of its scores.
pub fn default_threshold(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 1.0 {
        99.0
    } else {
        0.99
    }
}

/// Sites whose score is strictly above the threshold.
pub fn select_sites(sites: &[usize], values: &[f64], threshold: f64) -> Vec<usize> {
    sites
        .iter()
        .zip(values)
        .filter_map(|(site, value)| (*value > threshold).then_some(*site))
        .collect()
}

/// The tree tips and the alignment records must name the same taxa.
fn check_tips(phylogeny: &Phylogeny, alignment: &Alignment) -> Result<(), Report> {
    let mut tips = Vec::new();
    for tip_index in phylogeny.get_tips()? {
        tips.push(phylogeny.get_node(&tip_index)?.label.clone());
    }

    let missing_from_alignment =
        tips.iter().filter(|tip| alignment.get(tip).is_none()).join(", ");
    if !missing_from_alignment.is_empty() {
        Err(eyre!(
            "Tree tips are missing from the alignment {:?}: {missing_from_alignment}",
            alignment.path,
        )
        .suggestion("Are the tree and alignment from the same dataset?"))?
    }

    let missing_from_tree =
        alignment.ids().into_iter().filter(|id| !tips.iter().any(|tip| tip == id)).join(", ");
    if !missing_from_tree.is_empty() {
        Err(eyre!("Alignment records are not tips of the tree: {missing_from_tree}")
            .suggestion("Are the tree and alignment from the same dataset?"))?
    }

    Ok(())
}

#[cfg(test)]
mod tests;
