use crate::plot;
use crate::sequence::{Alignment, Record};
use crate::Table;
use color_eyre::eyre::{Report, Result};
use convsel_phylo::{FromNewick, Phylogeny};

fn score_table() -> Result<Table, Report> {
    let mut table = Table::new();
    table.headers =
        vec!["Sites".to_string(), "Diffsel".to_string(), "Pcoc".to_string()];
    table.add_row(vec!["0".to_string(), "0.42".to_string(), "0.10".to_string()])?;
    table.add_row(vec!["1".to_string(), "0.998".to_string(), "0.995".to_string()])?;
    table.add_row(vec!["2".to_string(), "0.99".to_string(), "0.80".to_string()])?;
    Ok(table)
}

#[test]
fn detect_methods_all() -> Result<(), Report> {
    let table = score_table()?;
    let methods = plot::detect_methods(&table, None)?;
    assert_eq!(methods, ["Diffsel", "Pcoc"]);
    Ok(())
}

#[test]
fn detect_methods_filtered() -> Result<(), Report> {
    let table = score_table()?;
    // unknown names are dropped with a warning
    let requested = vec!["Pcoc".to_string(), "Tdg09".to_string()];
    let methods = plot::detect_methods(&table, Some(&requested))?;
    assert_eq!(methods, ["Pcoc"]);
    Ok(())
}

#[test]
fn detect_methods_none_left() -> Result<(), Report> {
    let table = score_table()?;
    let requested = vec!["Tdg09".to_string()];
    assert!(plot::detect_methods(&table, Some(&requested)).is_err());
    Ok(())
}

#[test]
fn detect_methods_no_sites_column() -> Result<(), Report> {
    let mut table = score_table()?;
    table.headers[0] = "Positions".to_string();
    assert!(plot::detect_methods(&table, None).is_err());
    Ok(())
}

#[test]
fn parse_thresholds() -> Result<(), Report> {
    let entries = vec!["Diffsel:0.85".to_string(), "Tdg09:70".to_string()];
    let thresholds = plot::parse_thresholds(&entries)?;
    assert_eq!(thresholds.get("Diffsel"), Some(&0.85));
    assert_eq!(thresholds.get("Tdg09"), Some(&70.0));
    Ok(())
}

#[test]
fn parse_thresholds_invalid() {
    assert!(plot::parse_thresholds(&["Diffsel=0.85".to_string()]).is_err());
    assert!(plot::parse_thresholds(&["Diffsel:high".to_string()]).is_err());
}

#[test]
fn default_threshold_by_scale() {
    // probabilities default to 0.99, percentages to 99
    assert_eq!(plot::default_threshold(&[0.1, 0.998]), 0.99);
    assert_eq!(plot::default_threshold(&[10.0, 99.8]), 99.0);
}

#[test]
fn select_sites_is_strict() {
    let sites = vec![0, 1, 2];
    let values = vec![0.42, 0.998, 0.99];
    // a score exactly at the threshold is not selected
    assert_eq!(plot::select_sites(&sites, &values, 0.99), vec![1]);
}

fn alignment(ids: &[&str]) -> Alignment {
    let records = ids
        .iter()
        .map(|id| Record { id: id.to_string(), sequence: "MKLV".chars().collect() })
        .collect::<Vec<_>>();
    Alignment { records, length: 4, path: None }
}

#[test]
fn tips_match_alignment() -> Result<(), Report> {
    let phylogeny = Phylogeny::from_newick("((A,B)AB,C)root;")?;
    assert!(plot::check_tips(&phylogeny, &alignment(&["A", "B", "C"])).is_ok());
    // a tip without a record, and a record without a tip
    assert!(plot::check_tips(&phylogeny, &alignment(&["A", "B"])).is_err());
    assert!(plot::check_tips(&phylogeny, &alignment(&["A", "B", "C", "D"])).is_err());
    Ok(())
}
